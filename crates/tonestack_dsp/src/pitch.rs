//! Pitch Detector (tuner)
//!
//! Zero-crossing frequency estimation over one input buffer. The detector
//! only reads audio; it never writes to the chain.
//!
//! # Algorithm
//!
//! ```text
//! crossings  = { i : x[i-1] < 0 <= x[i] }
//! distance   = (last - first) / (count - 1)
//! frequency  = sample_rate / distance
//! midi       = 69 + 12 * log2(frequency / 440)
//! cents      = (midi - round(midi)) * 100
//! ```
//!
//! Buffers of 4096 samples or more give usable accuracy on the low E string.

/// Frequencies at or below this are treated as noise or silence
pub const VOICED_FLOOR_HZ: f32 = 50.0;

/// Chromatic note names indexed by `midi % 12`
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Result of analysing one buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental in Hz (0.0 when no crossings were found)
    pub frequency_hz: f32,
    /// Nearest chromatic note, empty when unvoiced
    pub note_name: &'static str,
    /// Distance from the nearest note in cents (-50..=50), 0 when unvoiced
    pub cents_deviation: f32,
    pub is_voiced: bool,
}

impl PitchEstimate {
    pub const UNVOICED: Self = Self {
        frequency_hz: 0.0,
        note_name: "",
        cents_deviation: 0.0,
        is_voiced: false,
    };

    /// Map a frequency onto the nearest semitone
    pub fn from_frequency(frequency_hz: f32) -> Self {
        if !frequency_hz.is_finite() || frequency_hz <= VOICED_FLOOR_HZ {
            return Self {
                frequency_hz: if frequency_hz.is_finite() { frequency_hz.max(0.0) } else { 0.0 },
                ..Self::UNVOICED
            };
        }

        let midi = 69.0 + 12.0 * (frequency_hz / 440.0).log2();
        let rounded = midi.round();
        let index = (rounded as i32).rem_euclid(12) as usize;

        Self {
            frequency_hz,
            note_name: NOTE_NAMES[index],
            cents_deviation: (midi - rounded) * 100.0,
            is_voiced: true,
        }
    }
}

/// Zero-crossing pitch detector for a fixed sample rate
#[derive(Debug, Clone, Copy)]
pub struct PitchDetector {
    sample_rate: f32,
}

impl PitchDetector {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Estimate the pitch of `buffer`
    ///
    /// # Real-time Safety
    /// Single pass, no allocations.
    pub fn detect(&self, buffer: &[f32]) -> PitchEstimate {
        let mut first = 0usize;
        let mut last = 0usize;
        let mut count = 0usize;

        for i in 1..buffer.len() {
            if buffer[i - 1] < 0.0 && buffer[i] >= 0.0 {
                if count == 0 {
                    first = i;
                }
                last = i;
                count += 1;
            }
        }

        if count < 2 {
            return PitchEstimate::UNVOICED;
        }

        let distance = (last - first) as f32 / (count - 1) as f32;
        PitchEstimate::from_frequency(self.sample_rate / distance)
    }
}
