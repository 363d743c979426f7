//! Lock-free State Shared Between Control and Audio Threads
//!
//! Every value the UI can change lives here as an atomic. The audio tick
//! never blocks on anything in this module.
//!
//! # Publication protocol
//!
//! A control write stores the value, then bumps the stage's generation with
//! `Release`. The audio tick loads the generation with `Acquire` and only
//! re-derives physical parameters when it moved. A value written after the
//! tick read the generation is picked up on the next buffer.
//!
//! Disabling a stage also bumps its bypass epoch, so the tick clears the
//! stage's memory even when it is re-enabled before the next buffer.
//!
//! The modulation type and the LFO output share one word. Each type drives
//! a single parameter (delay time for chorus and flanger, gain for tremolo),
//! so the word holds the type tag and that parameter's f32 bits.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tonestack_dsp::mapping::normalize;
use tonestack_dsp::{ModulationOutput, ModulationType};

use crate::stage::{StageId, MAX_CONTROLS, STAGE_COUNT};

/// Counters exposed to the control side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub buffers_processed: u64,
    pub late_buffers: u64,
    pub lfo_ticks_dropped: u64,
}

struct StageSlot {
    enabled: AtomicBool,
    /// Normalised control values stored as f32 bits
    controls: [AtomicU32; MAX_CONTROLS],
    generation: AtomicU32,
    /// Bumped on every disable
    bypass_epoch: AtomicU32,
}

impl StageSlot {
    fn new(id: StageId) -> Self {
        let slot = Self {
            enabled: AtomicBool::new(id.enabled_by_default()),
            controls: std::array::from_fn(|_| AtomicU32::new(0.0_f32.to_bits())),
            generation: AtomicU32::new(0),
            bypass_epoch: AtomicU32::new(0),
        };
        for (i, spec) in id.controls().iter().enumerate() {
            slot.controls[i].store(spec.default.to_bits(), Ordering::Relaxed);
        }
        slot
    }
}

/// Shared state between audio tick, LFO ticker and control thread
pub struct SharedState {
    stages: [StageSlot; STAGE_COUNT],

    /// Active cabinet preset index; one store switches the whole preset
    cabinet: AtomicUsize,

    /// Modulation type tag and the latest LFO output for that type
    modulation: AtomicU64,

    running: AtomicBool,

    buffers_processed: AtomicU64,
    late_buffers: AtomicU64,
    lfo_ticks_dropped: AtomicU64,
}

#[inline]
fn pack(kind: ModulationType, output: ModulationOutput) -> u64 {
    let value = match kind {
        ModulationType::Tremolo => output.amplitude,
        ModulationType::Chorus | ModulationType::Flanger => output.delay_ms,
    };
    ((kind as u64) << 32) | value.to_bits() as u64
}

#[inline]
fn unpack(bits: u64) -> (ModulationType, ModulationOutput) {
    let kind = ModulationType::from_u8((bits >> 32) as u8);
    let value = f32::from_bits(bits as u32);
    let output = match kind {
        ModulationType::Tremolo => ModulationOutput {
            delay_ms: 0.0,
            amplitude: value,
        },
        ModulationType::Chorus | ModulationType::Flanger => ModulationOutput {
            delay_ms: value,
            amplitude: 1.0,
        },
    };
    (kind, output)
}

impl SharedState {
    /// Fresh state holding every stage's defaults
    pub fn new() -> Self {
        Self {
            stages: StageId::ALL.map(StageSlot::new),
            cabinet: AtomicUsize::new(0),
            modulation: AtomicU64::new(pack(
                ModulationType::Chorus,
                ModulationOutput::NEUTRAL,
            )),
            running: AtomicBool::new(false),
            buffers_processed: AtomicU64::new(0),
            late_buffers: AtomicU64::new(0),
            lfo_ticks_dropped: AtomicU64::new(0),
        }
    }

    /// Store a control value, clamped into [0, 1]; returns the stored value
    ///
    /// `index` must come from [`StageId::control_index`].
    pub fn set_control(&self, stage: StageId, index: usize, value: f32) -> f32 {
        let value = normalize(value);
        let slot = &self.stages[stage.index()];
        slot.controls[index].store(value.to_bits(), Ordering::Relaxed);
        slot.generation.fetch_add(1, Ordering::Release);
        value
    }

    #[inline]
    pub fn control(&self, stage: StageId, index: usize) -> f32 {
        f32::from_bits(self.stages[stage.index()].controls[index].load(Ordering::Relaxed))
    }

    /// Change counter for a stage's controls
    #[inline]
    pub fn generation(&self, stage: StageId) -> u32 {
        self.stages[stage.index()].generation.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, stage: StageId, enabled: bool) {
        let slot = &self.stages[stage.index()];
        if !enabled {
            slot.bypass_epoch.fetch_add(1, Ordering::Release);
        }
        slot.enabled.store(enabled, Ordering::Release);
    }

    /// Number of times a stage has been disabled
    #[inline]
    pub fn bypass_epoch(&self, stage: StageId) -> u32 {
        self.stages[stage.index()].bypass_epoch.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_enabled(&self, stage: StageId) -> bool {
        self.stages[stage.index()].enabled.load(Ordering::Acquire)
    }

    pub fn set_cabinet(&self, index: usize) {
        self.cabinet.store(index, Ordering::Release);
    }

    #[inline]
    pub fn cabinet(&self) -> usize {
        self.cabinet.load(Ordering::Acquire)
    }

    /// Switch the modulation type; the LFO output goes neutral in the same store
    ///
    /// Returns false if `kind` was already active.
    pub fn set_modulation_type(&self, kind: ModulationType) -> bool {
        let neutral = pack(kind, ModulationOutput::NEUTRAL);
        self.modulation
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (unpack(bits).0 != kind).then_some(neutral)
            })
            .is_ok()
    }

    #[inline]
    pub fn modulation_type(&self) -> ModulationType {
        self.modulation().0
    }

    /// Publish an LFO output derived for `kind`
    ///
    /// Dropped (returns false) if the type changed since it was derived.
    pub fn publish_lfo_output(&self, kind: ModulationType, output: ModulationOutput) -> bool {
        let bits = pack(kind, output);
        self.modulation
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (unpack(current).0 == kind).then_some(bits)
            })
            .is_ok()
    }

    /// Put the LFO output back to neutral, keeping the type
    pub fn reset_lfo_output(&self) {
        let _ = self
            .modulation
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(pack(unpack(current).0, ModulationOutput::NEUTRAL))
            });
    }

    #[inline]
    pub fn lfo_output(&self) -> ModulationOutput {
        self.modulation().1
    }

    /// Type and LFO output from a single load
    #[inline]
    pub fn modulation(&self) -> (ModulationType, ModulationOutput) {
        unpack(self.modulation.load(Ordering::Acquire))
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn record_buffer(&self) {
        self.buffers_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a late buffer; returns the running total
    #[inline]
    pub fn record_late_buffer(&self) -> u64 {
        self.late_buffers.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count dropped LFO ticks; returns the running total
    pub fn record_dropped_ticks(&self, dropped: u64) -> u64 {
        self.lfo_ticks_dropped.fetch_add(dropped, Ordering::Relaxed) + dropped
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            buffers_processed: self.buffers_processed.load(Ordering::Relaxed),
            late_buffers: self.late_buffers.load(Ordering::Relaxed),
            lfo_ticks_dropped: self.lfo_ticks_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
