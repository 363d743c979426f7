//! Effect Engine - Main Entry Point
//!
//! The [`Engine`] is the control-side controller. It owns the shared
//! parameter state, the LFO ticker and (until the device layer takes it) the
//! [`AudioProcessor`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Control thread (UI)                      │
//! │  set_control / set_stage_enabled / select_* ──▶ SharedState  │
//! │  poll_report ◀──rtrb──┐        poll_event ◀──crossbeam──┐    │
//! └───────────────────────┼─────────────────────────────────┼────┘
//!                         │                                 │
//! ┌───────────────────────┴───────────┐   ┌─────────────────┴────┐
//! │ Audio thread: AudioProcessor      │   │ tonestack-lfo thread │
//! │ (reads atomics, never blocks)     │   │ (30 Hz, writes LFO   │
//! └───────────────────────────────────┘   │  output atomics)     │
//!                                         └──────────────────────┘
//! ```
//!
//! Configuration errors (unknown stage, control, preset or modulation type)
//! are returned to the caller, logged and published as
//! [`Event::Diagnostic`]. Engine state is left unchanged.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use rtrb::{Consumer, RingBuffer};
use tonestack_dsp::{find_preset, ModulationOutput, ModulationType, CABINET_PRESETS};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, StreamConfig};
use crate::error::{EngineError, EngineResult};
use crate::lfo::LfoTicker;
use crate::message::Event;
use crate::settings::{RigSettings, StageSettings};
use crate::shared::{EngineStats, SharedState};
use crate::stage::StageId;
use crate::stream::{AudioProcessor, BufferReport};

/// The effect engine controller
///
/// All methods take `&self`; the engine can be shared between threads.
pub struct Engine {
    /// Current configuration (stream part changes on reinitialisation)
    config: Mutex<EngineConfig>,

    shared: Arc<SharedState>,

    /// Audio side, until handed out via `take_processor`
    processor: Mutex<Option<AudioProcessor>>,

    /// Receiving end of the report ring
    reports: Mutex<Consumer<BufferReport>>,

    event_sender: Sender<Event>,
    event_receiver: Receiver<Event>,

    /// Running LFO thread, present between start and stop
    lfo: Mutex<Option<LfoTicker>>,
}

impl Engine {
    /// Create a new engine with default configuration
    pub fn new() -> EngineResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new engine with custom configuration
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let shared = Arc::new(SharedState::new());
        let (event_sender, event_receiver) = bounded::<Event>(config.event_capacity);
        let (producer, consumer) = RingBuffer::<BufferReport>::new(config.report_capacity);

        let processor = AudioProcessor::new(
            config.stream,
            Arc::clone(&shared),
            producer,
            event_sender.clone(),
        )?;

        info!(
            "Engine created: {} Hz, {} samples per block ({:.1} ms)",
            config.stream.sample_rate,
            config.stream.block_size,
            config.stream.latency_ms()
        );

        Ok(Self {
            config: Mutex::new(config),
            shared,
            processor: Mutex::new(Some(processor)),
            reports: Mutex::new(consumer),
            event_sender,
            event_receiver,
            lfo: Mutex::new(None),
        })
    }

    /// Start accepting audio ticks and start the LFO clock
    pub fn start(&self) -> EngineResult<()> {
        let mut lfo = self.lfo.lock();
        if self.shared.is_running() {
            warn!("Engine already running");
            return Err(EngineError::AlreadyRunning);
        }

        let period = self.config.lock().lfo_tick_interval();
        *lfo = Some(LfoTicker::spawn(
            Arc::clone(&self.shared),
            self.event_sender.clone(),
            period,
        )?);

        self.shared.set_running(true);
        info!("Engine started");
        self.publish(Event::Started);
        Ok(())
    }

    /// Stop accepting audio ticks and stop the LFO clock
    ///
    /// Stage state is left in place.
    pub fn stop(&self) -> EngineResult<()> {
        let mut lfo = self.lfo.lock();
        if !self.shared.is_running() {
            debug!("Engine not running");
            return Err(EngineError::NotRunning);
        }

        self.shared.set_running(false);
        if let Some(ticker) = lfo.take() {
            ticker.stop();
        }

        info!("Engine stopped");
        self.publish(Event::Stopped);
        Ok(())
    }

    /// Check if engine is currently running
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Set a control by stage and control name
    ///
    /// Out-of-range values are clamped and NaN reads as 0. Returns the value
    /// actually stored.
    pub fn set_control(&self, stage: &str, control: &str, value: f32) -> EngineResult<f32> {
        self.report(self.try_set_control(stage, control, value))
    }

    fn try_set_control(&self, stage: &str, control: &str, value: f32) -> EngineResult<f32> {
        let id: StageId = stage.parse()?;
        let slot = id.control_index(control)?;
        let stored = self.shared.set_control(id, slot, value);
        debug!("Set {}.{} to {:.3}", id, control, stored);
        Ok(stored)
    }

    /// Read back the effective normalised value of a control
    pub fn control(&self, stage: &str, control: &str) -> EngineResult<f32> {
        let id: StageId = stage.parse()?;
        let slot = id.control_index(control)?;
        Ok(self.shared.control(id, slot))
    }

    /// Engage or bypass a stage
    pub fn set_stage_enabled(&self, stage: &str, enabled: bool) -> EngineResult<()> {
        let id = self.report(stage.parse::<StageId>())?;
        self.set_enabled(id, enabled);
        Ok(())
    }

    fn set_enabled(&self, id: StageId, enabled: bool) {
        self.shared.set_enabled(id, enabled);
        if id == StageId::Modulation && !enabled {
            // Don't leave a stale attenuation for the next enable
            self.shared.reset_lfo_output();
        }
        debug!("Stage {} {}", id, if enabled { "enabled" } else { "bypassed" });
    }

    pub fn is_stage_enabled(&self, stage: &str) -> EngineResult<bool> {
        let id: StageId = stage.parse()?;
        Ok(self.shared.is_enabled(id))
    }

    /// Switch the cabinet to a catalog preset (case-insensitive)
    ///
    /// The switch is a single index store; a block in flight finishes on
    /// the old preset.
    pub fn select_cabinet_preset(&self, name: &str) -> EngineResult<()> {
        let index = self.report(
            find_preset(name).ok_or_else(|| EngineError::UnknownPreset(name.to_string())),
        )?;
        self.shared.set_cabinet(index);

        let canonical = CABINET_PRESETS[index].0;
        info!("Cabinet preset: {}", canonical);
        self.publish(Event::PresetChanged {
            name: canonical.to_string(),
        });
        Ok(())
    }

    /// Names of all cabinet presets, in catalog order
    pub fn cabinet_presets(&self) -> Vec<&'static str> {
        CABINET_PRESETS.iter().map(|(name, _)| *name).collect()
    }

    pub fn active_cabinet_preset(&self) -> &'static str {
        CABINET_PRESETS
            .get(self.shared.cabinet())
            .map_or(CABINET_PRESETS[0].0, |(name, _)| *name)
    }

    /// Select chorus, flanger or tremolo
    pub fn select_modulation_type(&self, name: &str) -> EngineResult<()> {
        let kind = self.report(
            ModulationType::from_name(name)
                .ok_or_else(|| EngineError::UnknownModulationType(name.to_string())),
        )?;
        // The pending output was derived for the previous type; it is
        // replaced by a neutral one in the same store
        if self.shared.set_modulation_type(kind) {
            debug!("Modulation type: {}", kind);
        }
        Ok(())
    }

    pub fn modulation_type(&self) -> ModulationType {
        self.shared.modulation_type()
    }

    /// Latest LFO output published by the ticker
    pub fn lfo_output(&self) -> ModulationOutput {
        self.shared.lfo_output()
    }

    /// Process one block through the held processor
    ///
    /// For hosts that drive the engine from a single thread. Once the
    /// processor has been taken this fails with `ConfigError`.
    pub fn process_buffer(&self, input: &[f32], output: &mut [f32]) -> EngineResult<BufferReport> {
        match self.processor.lock().as_mut() {
            Some(processor) => processor.process(input, output),
            None => Err(EngineError::ConfigError(
                "audio processor was handed to the device layer".to_string(),
            )),
        }
    }

    /// Hand the audio side to the device layer
    ///
    /// Returns `None` if it was already taken.
    pub fn take_processor(&self) -> Option<AudioProcessor> {
        let processor = self.processor.lock().take();
        if processor.is_some() {
            debug!("Audio processor handed to device layer");
        }
        processor
    }

    /// Re-initialise the chain for a new device sample rate / block size
    ///
    /// Only possible while the engine still holds the processor; otherwise
    /// the device layer calls [`AudioProcessor::reinitialize`] itself.
    pub fn reinitialize(&self, stream: StreamConfig) -> EngineResult<()> {
        let mut guard = self.processor.lock();
        let processor = guard.as_mut().ok_or_else(|| {
            EngineError::ConfigError("audio processor was handed to the device layer".to_string())
        })?;
        processor.reinitialize(stream)?;
        self.config.lock().stream = stream;
        Ok(())
    }

    /// Next buffer report (non-blocking)
    pub fn poll_report(&self) -> Option<BufferReport> {
        self.reports.lock().pop().ok()
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Get next event, waiting up to `timeout`
    pub fn wait_event(&self, timeout: Duration) -> Option<Event> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    pub fn stats(&self) -> EngineStats {
        self.shared.stats()
    }

    /// Get current configuration
    pub fn config(&self) -> EngineConfig {
        self.config.lock().clone()
    }

    /// Capture the live rig (controls, enables, preset, modulation type)
    pub fn snapshot(&self, name: &str) -> RigSettings {
        let stages = StageId::ALL
            .into_iter()
            .map(|id| StageSettings {
                stage: id.as_str().to_string(),
                enabled: self.shared.is_enabled(id),
                controls: id
                    .controls()
                    .iter()
                    .enumerate()
                    .map(|(slot, spec)| (spec.name.to_string(), self.shared.control(id, slot)))
                    .collect(),
            })
            .collect();

        RigSettings::new(
            name,
            stages,
            self.active_cabinet_preset(),
            self.shared.modulation_type().as_str(),
        )
    }

    /// Restore a saved rig
    ///
    /// Unknown stages, controls, presets or modulation types are skipped and
    /// reported as diagnostics. Returns the number of skipped entries.
    pub fn apply_settings(&self, settings: &RigSettings) -> usize {
        let mut skipped = 0;

        for entry in &settings.stages {
            let id = match self.report(entry.stage.parse::<StageId>()) {
                Ok(id) => id,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            for (control, value) in &entry.controls {
                if self.set_control(id.as_str(), control, *value).is_err() {
                    skipped += 1;
                }
            }
            self.set_enabled(id, entry.enabled);
        }

        if self.select_cabinet_preset(&settings.cabinet).is_err() {
            skipped += 1;
        }
        if self.select_modulation_type(&settings.modulation).is_err() {
            skipped += 1;
        }

        info!("Applied rig '{}' ({} entries skipped)", settings.name, skipped);
        skipped
    }

    /// Log and publish configuration errors on their way to the caller
    fn report<T>(&self, result: EngineResult<T>) -> EngineResult<T> {
        if let Err(err) = &result {
            if err.is_configuration() {
                warn!("{}", err);
                self.publish(Event::diagnostic(err));
            }
        }
        result
    }

    fn publish(&self, event: Event) {
        if self.event_sender.try_send(event).is_err() {
            debug!("Event channel full, dropping event");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shared.set_running(false);
        if let Some(ticker) = self.lfo.lock().take() {
            ticker.stop();
        }
    }
}
