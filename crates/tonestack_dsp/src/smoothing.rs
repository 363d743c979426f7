//! One-pole parameter smoothing and envelope following.

/// Exponential smoother that glides a parameter toward its target
///
/// Used for values that arrive once per block (delay time, tremolo gain)
/// so the per-sample path never sees a step.
#[derive(Debug, Clone)]
pub struct Smoother {
    value: f32,
    target: f32,
    coeff: f32,
}

impl Smoother {
    pub fn new(sample_rate: f32, time_ms: f32, initial: f32) -> Self {
        Self {
            value: initial,
            target: initial,
            coeff: time_coefficient(sample_rate, time_ms),
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump straight to a value, skipping the glide
    #[inline]
    pub fn snap(&mut self, value: f32) {
        self.value = value;
        self.target = value;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        self.value = self.coeff * self.value + (1.0 - self.coeff) * self.target;
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Peak envelope follower with separate attack and release times
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    attack: f32,
    release: f32,
    envelope: f32,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        Self {
            attack: time_coefficient(sample_rate, attack_ms),
            release: time_coefficient(sample_rate, release_ms),
            envelope: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let level = sample.abs();
        let coeff = if level > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * level;
        self.envelope
    }

    #[inline]
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

/// One-pole coefficient reaching ~63% of a step after `time_ms`
#[inline]
pub fn time_coefficient(sample_rate: f32, time_ms: f32) -> f32 {
    let samples = (time_ms * 0.001 * sample_rate).max(1e-3);
    (-1.0 / samples).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoother_converges() {
        let mut smoother = Smoother::new(44100.0, 5.0, 0.0);
        smoother.set_target(1.0);
        for _ in 0..44100 {
            smoother.next();
        }
        assert!((smoother.value() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_smoother_snap() {
        let mut smoother = Smoother::new(44100.0, 50.0, 0.0);
        smoother.snap(0.7);
        assert!((smoother.next() - 0.7).abs() < 1e-6);
        assert_eq!(smoother.target(), 0.7);
    }

    #[test]
    fn test_envelope_attack_faster_than_release() {
        let mut env = EnvelopeFollower::new(44100.0, 1.0, 100.0);

        // 1 ms attack: after 5 ms of full-scale input we're nearly there
        for _ in 0..220 {
            env.process(1.0);
        }
        assert!(env.envelope() > 0.95);

        // 100 ms release: 5 ms of silence barely moves it
        for _ in 0..220 {
            env.process(0.0);
        }
        assert!(env.envelope() > 0.9);

        env.reset();
        assert_eq!(env.envelope(), 0.0);
    }
}
