//! Fractional Delay Line
//!
//! Circular buffer allocated once at construction. Reads interpolate
//! linearly between samples so modulated delay times glide smoothly.

#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocate a delay line able to hold `max_seconds` of audio
    pub fn new(sample_rate: f32, max_seconds: f32) -> Self {
        let len = ((max_seconds * sample_rate).ceil() as usize + 2).max(4);
        Self {
            buffer: vec![0.0; len],
            write_pos: 0,
        }
    }

    /// Largest delay (in samples) that can be read back
    #[inline]
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 2) as f32
    }

    /// Read the sample written `delay_samples` ago (fractional)
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(0.0, self.max_delay());
        let whole = delay.floor();
        let frac = delay - whole;

        // write_pos points at the next slot to write, so the newest sample is one behind
        let newest = self.write_pos + len - 1;
        let i0 = (newest - whole as usize) % len;
        let i1 = (i0 + len - 1) % len;

        let s0 = self.buffer[i0];
        let s1 = self.buffer[i1];
        s0 + (s1 - s0) * frac
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos >= self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Silence the line without reallocating
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
