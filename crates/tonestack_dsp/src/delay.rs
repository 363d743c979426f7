//! Feedback Delay (echo)

use crate::delay_line::DelayLine;
use crate::processor::{ProcessContext, Stage};
use crate::smoothing::Smoother;

/// Longest echo time the delay knob reaches (1 s) plus headroom
const MAX_DELAY_S: f32 = 1.05;

/// Shortest echo so the read never lands on the sample being written
const MIN_DELAY_SAMPLES: f32 = 1.0;

/// Loop gain ceiling; a 100% feedback setting sustains without running away
const MAX_LOOP_GAIN: f32 = 0.98;

/// Glide time when the delay knob moves (avoids pitchy zipper noise)
const TIME_SMOOTHING_MS: f32 = 50.0;

pub struct Delay {
    line: DelayLine,
    time_samples: Smoother,
    feedback: f32,
    mix: f32,
    sample_rate: f32,
    primed: bool,
}

impl Delay {
    /// Allocates one second of delay memory
    pub fn new(sample_rate: f32) -> Self {
        Self {
            line: DelayLine::new(sample_rate, MAX_DELAY_S),
            time_samples: Smoother::new(sample_rate, TIME_SMOOTHING_MS, MIN_DELAY_SAMPLES),
            feedback: 0.3,
            mix: 0.35,
            sample_rate,
            primed: false,
        }
    }

    /// Set echo time (s), feedback (%) and wet/dry mix (%)
    pub fn set_params(&mut self, seconds: f32, feedback_pct: f32, wet_dry_pct: f32) {
        let samples = (seconds * self.sample_rate).clamp(MIN_DELAY_SAMPLES, self.line.max_delay());
        self.time_samples.set_target(samples);
        if !self.primed {
            self.time_samples.snap(samples);
            self.primed = true;
        }
        self.feedback = (feedback_pct / 100.0).clamp(0.0, MAX_LOOP_GAIN);
        self.mix = (wet_dry_pct / 100.0).clamp(0.0, 1.0);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }
}

impl Stage for Delay {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        let dry_gain = 1.0 - self.mix;
        for sample in buffer.iter_mut() {
            let delayed = self.line.read(self.time_samples.next() - 1.0);
            self.line.write(*sample + delayed * self.feedback);
            *sample = *sample * dry_gain + delayed * self.mix;
        }
    }

    /// Flush echoes to silence; the next parameter update snaps the time
    fn reset(&mut self) {
        self.line.clear();
        let target = self.time_samples.target();
        self.time_samples.snap(target);
    }

    fn name(&self) -> &'static str {
        "Delay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_arrives_after_delay_time() {
        let mut delay = Delay::new(1000.0);
        delay.set_params(0.1, 0.0, 50.0); // 100 samples at 1 kHz
        let ctx = ProcessContext::new(1000.0, 256);

        let mut buffer = vec![0.0; 256];
        buffer[0] = 1.0;
        delay.process(&mut buffer, &ctx);

        assert!((buffer[0] - 0.5).abs() < 1e-6);
        let echo_pos = buffer[1..]
            .iter()
            .position(|s| s.abs() > 0.25)
            .map(|p| p + 1);
        assert_eq!(echo_pos, Some(100));
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let mut delay = Delay::new(1000.0);
        delay.set_params(0.05, 50.0, 100.0);
        let ctx = ProcessContext::new(1000.0, 200);

        let mut buffer = vec![0.0; 200];
        buffer[0] = 1.0;
        delay.process(&mut buffer, &ctx);

        assert!((buffer[50] - 1.0).abs() < 1e-3);
        assert!((buffer[100] - 0.5).abs() < 1e-3);
        assert!((buffer[150] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_full_feedback_is_bounded() {
        let mut delay = Delay::new(1000.0);
        delay.set_params(0.01, 100.0, 50.0);
        assert!(delay.feedback() <= MAX_LOOP_GAIN);

        let ctx = ProcessContext::new(1000.0, 1000);
        let mut buffer = vec![0.5; 1000];
        delay.process(&mut buffer, &ctx);
        assert!(buffer.iter().all(|s| s.is_finite() && s.abs() < 30.0));
    }

    #[test]
    fn test_reset_clears_tail() {
        let mut delay = Delay::new(1000.0);
        delay.set_params(0.02, 80.0, 50.0);
        let ctx = ProcessContext::new(1000.0, 64);

        let mut buffer = vec![1.0; 64];
        delay.process(&mut buffer, &ctx);
        delay.reset();

        let mut silence = vec![0.0; 64];
        delay.process(&mut silence, &ctx);
        assert!(silence.iter().all(|s| *s == 0.0));
    }
}
