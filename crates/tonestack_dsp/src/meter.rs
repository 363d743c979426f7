//! Level Meter
//!
//! RMS of one buffer mapped onto a 50 dB display range:
//! `level = clamp((20 * log10(rms) + 50) / 50, 0, 1)`.

/// Bottom of the display range in dBFS
pub const METER_FLOOR_DB: f32 = -50.0;

/// Normalised meter position for one buffer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelReading {
    pub normalized_level: f32,
}

impl LevelReading {
    pub const SILENT: Self = Self {
        normalized_level: 0.0,
    };
}

/// Root-mean-square of `buffer`; 0.0 for an empty buffer
#[inline]
pub fn rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum: f32 = buffer.iter().map(|s| s * s).sum();
    (sum / buffer.len() as f32).sqrt()
}

/// Measure one buffer
///
/// Silence yields `-inf` dB, which clamps to 0. Non-finite samples read as
/// silence so a corrupted buffer never pins the meter.
pub fn measure(buffer: &[f32]) -> LevelReading {
    let level = rms(buffer);
    if !level.is_finite() || level <= 0.0 {
        return LevelReading::SILENT;
    }
    let db = 20.0 * level.log10();
    LevelReading {
        normalized_level: ((db - METER_FLOOR_DB) / -METER_FLOOR_DB).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_square_is_full() {
        let square: Vec<f32> = (0..1024).map(|i| if (i / 32) % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let reading = measure(&square);
        assert!((reading.normalized_level - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_silence_is_zero() {
        assert_eq!(measure(&[0.0; 512]).normalized_level, 0.0);
        assert_eq!(measure(&[]).normalized_level, 0.0);
    }

    #[test]
    fn test_mid_scale() {
        // -25 dBFS sits halfway up the 50 dB range
        let amplitude = 10f32.powf(-25.0 / 20.0);
        let dc = vec![amplitude; 256];
        assert!((measure(&dc).normalized_level - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_below_floor_clamps() {
        let dc = vec![1e-4; 256]; // -80 dBFS
        assert_eq!(measure(&dc).normalized_level, 0.0);
    }

    #[test]
    fn test_rms_of_sine() {
        let sine: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 44100.0).sin())
            .collect();
        assert!((rms(&sine) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }
}
