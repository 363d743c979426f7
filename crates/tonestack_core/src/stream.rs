//! Audio-side Processing
//!
//! [`AudioProcessor`] is the object the device layer calls once per block.
//! It owns the [`SignalChain`] and the tuner, reads parameters from
//! [`SharedState`] and reports back through atomics, an `rtrb` ring of
//! [`BufferReport`]s and non-blocking event sends.
//!
//! ```text
//! input ──┬──▶ Level Meter (input)
//!         ├──▶ Pitch Detector
//!         └──▶ Signal Chain ──▶ output ──▶ Level Meter (output)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use rtrb::Producer;
use tonestack_dsp::{measure, LevelReading, PitchDetector, PitchEstimate};
use tracing::info;

use crate::chain::SignalChain;
use crate::config::StreamConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::shared::SharedState;

/// Measurements taken from one processed block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferReport {
    pub input_level: LevelReading,
    pub output_level: LevelReading,
    pub pitch: PitchEstimate,
}

/// Flags blocks that took longer than their playback duration
#[derive(Debug, Clone, Copy)]
pub struct DeadlineMonitor {
    budget: Duration,
}

impl DeadlineMonitor {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            budget: config.block_duration(),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Returns true if `elapsed` blew the deadline
    #[inline]
    pub fn record(&self, elapsed: Duration) -> bool {
        elapsed > self.budget
    }
}

/// The real-time half of the engine
pub struct AudioProcessor {
    config: StreamConfig,
    chain: SignalChain,
    detector: PitchDetector,
    monitor: DeadlineMonitor,
    shared: Arc<SharedState>,
    reports: Producer<BufferReport>,
    events: Sender<Event>,
}

impl AudioProcessor {
    pub(crate) fn new(
        config: StreamConfig,
        shared: Arc<SharedState>,
        reports: Producer<BufferReport>,
        events: Sender<Event>,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        Ok(Self {
            chain: SignalChain::new(&config, &shared)?,
            detector: PitchDetector::new(config.sample_rate as f32),
            monitor: DeadlineMonitor::new(&config),
            config,
            shared,
            reports,
            events,
        })
    }

    pub fn config(&self) -> StreamConfig {
        self.config
    }

    /// Process one block: meter and tune the input, run the chain into
    /// `output`, meter the output
    ///
    /// Both slices must be exactly `block_size` long. Fails with
    /// `NotRunning` once the engine is stopped, leaving `output` untouched.
    ///
    /// # Real-time Safety
    /// No allocations, no locks, no I/O.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> EngineResult<BufferReport> {
        let started = Instant::now();

        if !self.shared.is_running() {
            return Err(EngineError::NotRunning);
        }
        let expected = self.config.block_size as usize;
        for got in [input.len(), output.len()] {
            if got != expected {
                return Err(EngineError::BufferSizeMismatch { expected, got });
            }
        }

        let input_level = measure(input);
        let pitch = self.detector.detect(input);

        for (out, sample) in output.iter_mut().zip(input) {
            *out = if sample.is_finite() { *sample } else { 0.0 };
        }
        self.chain.process(output, &self.shared);

        let report = BufferReport {
            input_level,
            output_level: measure(output),
            pitch,
        };

        // Drop the report if nobody is draining the ring
        let _ = self.reports.push(report);
        self.shared.record_buffer();

        if self.monitor.record(started.elapsed()) {
            let late_buffers = self.shared.record_late_buffer();
            let _ = self.events.try_send(Event::DeadlineMissed { late_buffers });
        }

        Ok(report)
    }

    /// Rebuild all stage state for a new sample rate / block size
    ///
    /// Control values, enable flags and the active preset are kept; delay
    /// lines, envelopes and filter memory start from silence. Allocates, so
    /// call it from the device-change path, not the audio callback.
    pub fn reinitialize(&mut self, config: StreamConfig) -> EngineResult<()> {
        config.validate().map_err(EngineError::ConfigError)?;

        self.chain = SignalChain::new(&config, &self.shared)?;
        self.detector = PitchDetector::new(config.sample_rate as f32);
        self.monitor = DeadlineMonitor::new(&config);
        self.config = config;

        info!(
            "Signal chain reinitialized: {} Hz, {} samples ({:.1} ms)",
            config.sample_rate,
            config.block_size,
            config.latency_ms()
        );
        let _ = self.events.try_send(Event::Reinitialized {
            sample_rate: config.sample_rate,
            block_size: config.block_size,
        });
        Ok(())
    }
}
