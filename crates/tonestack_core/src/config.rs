//! Engine and Stream Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Stream parameters supplied by the device layer
///
/// Both values are fixed for the life of a chain; changing either requires
/// a full reinitialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Samples per processing block (mono)
    pub block_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            // Large enough for the tuner to resolve low E
            block_size: 4096,
        }
    }
}

impl StreamConfig {
    /// Playback duration of one block; the processing deadline
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }

    /// Calculate latency in milliseconds for this configuration
    pub fn latency_ms(&self) -> f32 {
        (self.block_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.block_size < 32 || self.block_size > 8192 {
            return Err(format!("Invalid block size: {}", self.block_size));
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Stream configuration
    pub stream: StreamConfig,

    /// LFO clock rate in Hz
    pub lfo_tick_hz: f32,

    /// Buffer reports held before the audio side starts dropping them
    pub report_capacity: usize,

    /// Event channel capacity
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::tuner()
    }
}

impl EngineConfig {
    /// Create config optimized for low latency playing
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                block_size: 256, // ~5.3ms latency
            },
            lfo_tick_hz: 30.0,
            report_capacity: 256,
            event_capacity: 64,
        }
    }

    /// Create config with blocks long enough for accurate tuning
    pub fn tuner() -> Self {
        Self {
            stream: StreamConfig::default(),
            lfo_tick_hz: 30.0,
            report_capacity: 32,
            event_capacity: 64,
        }
    }

    /// Interval between LFO ticks
    pub fn lfo_tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.lfo_tick_hz as f64)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;
        if !self.lfo_tick_hz.is_finite() || self.lfo_tick_hz < 1.0 || self.lfo_tick_hz > 1000.0 {
            return Err(format!("Invalid LFO tick rate: {}", self.lfo_tick_hz));
        }
        if self.report_capacity == 0 {
            return Err("Report capacity must be non-zero".to_string());
        }
        if self.event_capacity == 0 {
            return Err("Event capacity must be non-zero".to_string());
        }
        Ok(())
    }
}
