//! Dynamics: Noise Gate and Compressor
//!
//! Both stages run a peak envelope follower and derive a per-sample gain
//! from the envelope level in dB.

use crate::mapping::{db_to_linear, linear_to_db};
use crate::processor::{ProcessContext, Stage};
use crate::smoothing::EnvelopeFollower;

/// Gate envelope attack (ms)
const GATE_ATTACK_MS: f32 = 1.0;
/// Gate envelope release (ms)
const GATE_RELEASE_MS: f32 = 100.0;
/// Downward expansion ratio below the gate threshold
const GATE_EXPANSION_RATIO: f32 = 4.0;
/// Deepest attenuation the gate applies
const GATE_FLOOR_DB: f32 = -90.0;

const COMPRESSOR_ATTACK_MS: f32 = 10.0;
const COMPRESSOR_RELEASE_MS: f32 = 100.0;

/// Expansion-style noise gate
///
/// Above the threshold the signal passes at unity. Below it, gain drops by
/// `(ratio - 1)` dB for every dB under the threshold, so hiss fades out
/// progressively instead of chopping.
pub struct NoiseGate {
    envelope: EnvelopeFollower,
    threshold_db: f32,
}

impl NoiseGate {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            envelope: EnvelopeFollower::new(sample_rate, GATE_ATTACK_MS, GATE_RELEASE_MS),
            threshold_db: -60.0,
        }
    }

    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    #[inline]
    fn gain_for(&self, envelope_db: f32) -> f32 {
        if envelope_db >= self.threshold_db {
            1.0
        } else {
            let below = envelope_db - self.threshold_db;
            db_to_linear((below * (GATE_EXPANSION_RATIO - 1.0)).max(GATE_FLOOR_DB))
        }
    }
}

impl Stage for NoiseGate {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        for sample in buffer.iter_mut() {
            let env = self.envelope.process(*sample);
            *sample *= self.gain_for(linear_to_db(env));
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
    }

    fn name(&self) -> &'static str {
        "Noise Gate"
    }
}

/// Feed-forward downward compressor with hard knee and makeup gain
pub struct Compressor {
    envelope: EnvelopeFollower,
    threshold_db: f32,
    ratio: f32,
    makeup_linear: f32,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            envelope: EnvelopeFollower::new(
                sample_rate,
                COMPRESSOR_ATTACK_MS,
                COMPRESSOR_RELEASE_MS,
            ),
            threshold_db: -25.0,
            ratio: 6.0,
            makeup_linear: 1.0,
        }
    }

    pub fn set_params(&mut self, threshold_db: f32, ratio: f32, makeup_db: f32) {
        self.threshold_db = threshold_db;
        self.ratio = ratio.max(1.0);
        self.makeup_linear = db_to_linear(makeup_db);
    }

    /// Gain reduction in dB (<= 0) for an envelope level
    #[inline]
    fn reduction_db(&self, envelope_db: f32) -> f32 {
        if envelope_db <= self.threshold_db {
            0.0
        } else {
            (self.threshold_db - envelope_db) * (1.0 - 1.0 / self.ratio)
        }
    }
}

impl Stage for Compressor {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        for sample in buffer.iter_mut() {
            let env = self.envelope.process(*sample);
            let gain = db_to_linear(self.reduction_db(linear_to_db(env)));
            *sample *= gain * self.makeup_linear;
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
    }

    fn name(&self) -> &'static str {
        "Compressor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * amplitude)
            .collect()
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_gate_passes_loud_signal() {
        let mut gate = NoiseGate::new(44100.0);
        gate.set_threshold_db(-40.0);
        let ctx = ProcessContext::new(44100.0, 4410);

        let input = sine(0.5, 4410);
        let mut buffer = input.clone();
        gate.process(&mut buffer, &ctx);

        // After the 1 ms attack the gate is fully open
        assert!((peak(&buffer[2205..]) - peak(&input[2205..])).abs() < 0.01);
    }

    #[test]
    fn test_gate_suppresses_noise_floor() {
        let mut gate = NoiseGate::new(44100.0);
        gate.set_threshold_db(-40.0);
        let ctx = ProcessContext::new(44100.0, 4410);

        // -60 dBFS hiss, 20 dB under threshold -> 60 dB of attenuation
        let mut buffer = sine(0.001, 4410);
        gate.process(&mut buffer, &ctx);

        assert!(peak(&buffer[2205..]) < 1e-5);
    }

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let mut comp = Compressor::new(44100.0);
        comp.set_params(-20.0, 4.0, 0.0);
        let ctx = ProcessContext::new(44100.0, 8820);

        let mut buffer = sine(1.0, 8820);
        comp.process(&mut buffer, &ctx);

        // 20 dB over a 4:1 threshold -> ~15 dB reduction at steady state
        let settled = peak(&buffer[4410..]);
        assert!(settled < 0.35, "expected heavy reduction, got {}", settled);
        assert!(settled > 0.05);
    }

    #[test]
    fn test_compressor_leaves_quiet_signal() {
        let mut comp = Compressor::new(44100.0);
        comp.set_params(-10.0, 10.0, 0.0);
        let ctx = ProcessContext::new(44100.0, 4410);

        let input = sine(0.1, 4410); // -20 dBFS, under threshold
        let mut buffer = input.clone();
        comp.process(&mut buffer, &ctx);

        for (out, inp) in buffer.iter().zip(&input) {
            assert!((out - inp).abs() < 1e-6);
        }
    }

    #[test]
    fn test_makeup_gain() {
        let mut comp = Compressor::new(44100.0);
        comp.set_params(0.0, 2.0, 6.0);
        let ctx = ProcessContext::new(44100.0, 64);

        let mut buffer = vec![0.1; 64];
        comp.process(&mut buffer, &ctx);
        assert!((buffer[63] - 0.1995).abs() < 0.001);
    }
}
