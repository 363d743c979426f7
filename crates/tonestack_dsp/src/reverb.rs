//! Reverb - Schroeder/Freeverb-style algorithmic room
//!
//! Eight parallel damped comb filters feed four series allpass filters.
//! Only the wet/dry mix is user-facing; room size and damping are fixed
//! to a medium hall.

use crate::processor::{ProcessContext, Stage};

// Tuning constants (scaled from 44100 Hz)
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];

const INPUT_GAIN: f32 = 0.015;
const WET_GAIN: f32 = 3.0;
const ROOM_FEEDBACK: f32 = 0.84;
const DAMPING: f32 = 0.2;
const ALLPASS_FEEDBACK: f32 = 0.5;

#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    filter_store: f32,
}

impl CombFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            filter_store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];

        // Lowpass in the feedback path darkens the tail over time
        self.filter_store = output * (1.0 - DAMPING) + self.filter_store * DAMPING;

        self.buffer[self.index] = input + self.filter_store * ROOM_FEEDBACK;
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.filter_store = 0.0;
    }
}

#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        let output = buffered - input;

        self.buffer[self.index] = input + buffered * ALLPASS_FEEDBACK;
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// Mono algorithmic reverb
pub struct Reverb {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
    /// Wet share (0.0 = dry, 1.0 = fully wet)
    mix: f32,
}

impl Reverb {
    /// Allocates the comb and allpass memories for `sample_rate`
    pub fn new(sample_rate: f32) -> Self {
        let scale = sample_rate / 44100.0;
        let scaled = |t: usize| (t as f32 * scale) as usize;

        Self {
            combs: COMB_TUNING.iter().map(|&t| CombFilter::new(scaled(t))).collect(),
            allpasses: ALLPASS_TUNING
                .iter()
                .map(|&t| AllpassFilter::new(scaled(t)))
                .collect(),
            mix: 0.25,
        }
    }

    /// Set wet/dry mix in percent
    pub fn set_mix(&mut self, wet_dry_pct: f32) {
        self.mix = (wet_dry_pct / 100.0).clamp(0.0, 1.0);
    }

    #[inline]
    fn process_sample(&mut self, sample: f32) -> f32 {
        let input = sample * INPUT_GAIN;

        let mut wet = 0.0;
        for comb in self.combs.iter_mut() {
            wet += comb.process(input);
        }
        for allpass in self.allpasses.iter_mut() {
            wet = allpass.process(wet);
        }

        sample * (1.0 - self.mix) + wet * WET_GAIN * self.mix
    }
}

impl Stage for Reverb {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    fn reset(&mut self) {
        for comb in self.combs.iter_mut() {
            comb.clear();
        }
        for allpass in self.allpasses.iter_mut() {
            allpass.clear();
        }
    }

    fn name(&self) -> &'static str {
        "Reverb"
    }
}
