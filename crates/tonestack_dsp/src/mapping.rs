//! Parameter Mapper
//!
//! Pure conversions from normalized 0..1 knob positions to physical units.
//! These ranges are shared with existing user rigs, so they must not drift.
//!
//! Every function sanitizes its input first: NaN reads as 0.0 and anything
//! outside [0, 1] is clamped.

/// Clamp a control value into [0, 1], mapping NaN to 0.0
#[inline]
pub fn normalize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Convert decibels to linear amplitude
/// Formula: amplitude = 10^(dB/20)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, flooring silence at -120 dB
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 1e-6 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

/// Convert a bandwidth in octaves to the equivalent filter Q
///
/// One octave gives Q = sqrt(2) ≈ 1.414.
#[inline]
pub fn octaves_to_q(octaves: f32) -> f32 {
    let ratio = 2.0_f32.powf(octaves.max(0.01));
    ratio.sqrt() / (ratio - 1.0)
}

/// Distortion pre-gain: -6 dB .. +36 dB
#[inline]
pub fn distortion_pre_gain_db(drive: f32) -> f32 {
    -6.0 + normalize(drive) * 42.0
}

/// Distortion wet/dry mix in percent: 50 .. 100
#[inline]
pub fn distortion_wet_dry_mix(drive: f32) -> f32 {
    50.0 + normalize(drive) * 50.0
}

/// Tone EQ band gain: -12 dB .. +12 dB, flat at 0.5
#[inline]
pub fn tone_gain_db(value: f32) -> f32 {
    (normalize(value) - 0.5) * 24.0
}

/// Delay time in seconds (identity over 0..1 s)
#[inline]
pub fn delay_seconds(value: f32) -> f32 {
    normalize(value)
}

/// Delay feedback in percent
#[inline]
pub fn delay_feedback_pct(value: f32) -> f32 {
    normalize(value) * 100.0
}

/// Delay wet/dry mix in percent
#[inline]
pub fn delay_wet_dry_mix(value: f32) -> f32 {
    normalize(value) * 100.0
}

/// Reverb wet/dry mix in percent
#[inline]
pub fn reverb_wet_dry_mix(value: f32) -> f32 {
    normalize(value) * 100.0
}

/// Noise gate threshold: -80 dB .. -10 dB
#[inline]
pub fn gate_threshold_db(value: f32) -> f32 {
    -80.0 + normalize(value) * 70.0
}

/// Compressor threshold from the sustain knob: -10 dB .. -40 dB
#[inline]
pub fn compressor_threshold_db(sustain: f32) -> f32 {
    -10.0 - normalize(sustain) * 30.0
}

/// Compressor ratio from the sustain knob: 2:1 .. 10:1
#[inline]
pub fn compressor_ratio(sustain: f32) -> f32 {
    2.0 + normalize(sustain) * 8.0
}

/// Compressor makeup gain from the level knob: -10 dB .. +20 dB
#[inline]
pub fn compressor_makeup_db(level: f32) -> f32 {
    -10.0 + normalize(level) * 30.0
}

/// LFO rate: 0.1 Hz .. 5 Hz
#[inline]
pub fn lfo_rate_hz(value: f32) -> f32 {
    0.1 + normalize(value) * 4.9
}

/// Modulation depth stays normalized; each modulation type interprets it
#[inline]
pub fn modulation_depth(value: f32) -> f32 {
    normalize(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_normalize_clamps_and_rejects_nan() {
        assert_eq!(normalize(-0.3), 0.0);
        assert_eq!(normalize(1.7), 1.0);
        assert_eq!(normalize(f32::NAN), 0.0);
        assert_eq!(normalize(f32::INFINITY), 1.0);
        assert_eq!(normalize(0.25), 0.25);
    }

    #[test]
    fn test_distortion_endpoints() {
        assert!(approx(distortion_pre_gain_db(0.0), -6.0));
        assert!(approx(distortion_wet_dry_mix(0.0), 50.0));
        assert!(approx(distortion_pre_gain_db(1.0), 36.0));
        assert!(approx(distortion_wet_dry_mix(1.0), 100.0));
    }

    #[test]
    fn test_tone_centered() {
        assert!(approx(tone_gain_db(0.5), 0.0));
        assert!(approx(tone_gain_db(0.0), -12.0));
        assert!(approx(tone_gain_db(1.0), 12.0));
    }

    #[test]
    fn test_dynamics_ranges() {
        assert!(approx(gate_threshold_db(0.0), -80.0));
        assert!(approx(gate_threshold_db(1.0), -10.0));
        assert!(approx(compressor_threshold_db(0.0), -10.0));
        assert!(approx(compressor_threshold_db(1.0), -40.0));
        assert!(approx(compressor_ratio(0.0), 2.0));
        assert!(approx(compressor_ratio(1.0), 10.0));
        assert!(approx(compressor_makeup_db(0.0), -10.0));
        assert!(approx(compressor_makeup_db(1.0), 20.0));
    }

    #[test]
    fn test_time_based_ranges() {
        assert!(approx(delay_seconds(0.42), 0.42));
        assert!(approx(delay_feedback_pct(0.5), 50.0));
        assert!(approx(reverb_wet_dry_mix(1.0), 100.0));
        assert!(approx(lfo_rate_hz(0.0), 0.1));
        assert!(approx(lfo_rate_hz(1.0), 5.0));
    }

    #[test]
    fn test_mappings_are_monotonic() {
        let mut previous = f32::MIN;
        for step in 0..=100 {
            let gain = distortion_pre_gain_db(step as f32 / 100.0);
            assert!(gain > previous);
            previous = gain;
        }
    }

    #[test]
    fn test_one_octave_q() {
        assert!((octaves_to_q(1.0) - std::f32::consts::SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_db_conversions() {
        assert!(approx(db_to_linear(0.0), 1.0));
        assert!((db_to_linear(-6.0) - 0.501).abs() < 0.01);
        assert!(approx(linear_to_db(1.0), 0.0));
        assert_eq!(linear_to_db(0.0), -120.0);
    }
}
