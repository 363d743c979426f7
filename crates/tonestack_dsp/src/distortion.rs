//! Distortion / Overdrive
//!
//! Drives the signal into a tanh waveshaper and blends the result with the
//! dry signal. More drive means both more pre-gain and a wetter mix, so the
//! tone saturates monotonically as the knob turns up.
//!
//! # Algorithm
//!
//! ```text
//! wet = tanh(x * preGain)
//! out = clamp(dry * (1 - mix) + wet * mix, -1, 1)
//! ```

use crate::mapping::db_to_linear;
use crate::processor::{ProcessContext, Stage};

/// Tanh waveshaping distortion with wet/dry blend
pub struct Distortion {
    pre_gain: f32,
    /// Wet share (0.5 .. 1.0)
    mix: f32,
}

impl Distortion {
    pub fn new() -> Self {
        Self {
            pre_gain: 1.0,
            mix: 0.5,
        }
    }

    /// Set pre-gain (dB) and wet/dry mix (percent)
    pub fn set_params(&mut self, pre_gain_db: f32, wet_dry_pct: f32) {
        self.pre_gain = db_to_linear(pre_gain_db);
        self.mix = (wet_dry_pct / 100.0).clamp(0.0, 1.0);
    }

    /// Process a single sample
    ///
    /// # Real-time Safety
    /// No allocations, no syscalls, O(1) time.
    #[inline]
    pub fn process_sample(&self, sample: f32) -> f32 {
        let wet = (sample * self.pre_gain).tanh();
        let out = sample * (1.0 - self.mix) + wet * self.mix;
        out.clamp(-1.0, 1.0)
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Distortion {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    // Memoryless
    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "Distortion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{distortion_pre_gain_db, distortion_wet_dry_mix};

    fn driven(drive: f32) -> Distortion {
        let mut dist = Distortion::new();
        dist.set_params(distortion_pre_gain_db(drive), distortion_wet_dry_mix(drive));
        dist
    }

    /// Peak-to-RMS ratio; a squarer wave has a lower crest factor
    fn crest_factor(buffer: &[f32]) -> f32 {
        let peak = buffer.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        let rms = (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt();
        peak / rms
    }

    fn sine(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_more_drive_saturates_more() {
        let ctx = ProcessContext::new(44100.0, 4410);
        let mut previous = f32::MAX;

        for drive in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let mut buffer = sine(4410);
            driven(drive).process(&mut buffer, &ctx);
            let crest = crest_factor(&buffer);
            assert!(crest < previous, "drive {} crest {}", drive, crest);
            previous = crest;
        }
    }

    #[test]
    fn test_output_never_exceeds_one() {
        let dist = driven(1.0);
        for input in [10.0, 100.0, 1000.0, -10.0, -100.0, -1000.0] {
            let output = dist.process_sample(input);
            assert!(
                output.abs() <= 1.0,
                "Output {} exceeds ±1.0 for input {}",
                output,
                input
            );
        }
    }

    #[test]
    fn test_preserves_polarity() {
        let dist = driven(0.6);
        let out_pos = dist.process_sample(0.4);
        let out_neg = dist.process_sample(-0.4);
        assert!(out_pos > 0.0);
        assert!(out_neg < 0.0);
        assert!((out_pos + out_neg).abs() < 1e-6);
    }

    #[test]
    fn test_silence_stays_silent() {
        let dist = driven(1.0);
        assert_eq!(dist.process_sample(0.0), 0.0);
    }
}
