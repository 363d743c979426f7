//! Tonestack Core - Effect Engine
//!
//! This crate turns the DSP stages of `tonestack_dsp` into a running engine:
//! - Fixed-order signal chain with per-stage enable/bypass
//! - Lock-free parameter exchange between UI and audio threads
//! - 30 Hz LFO clock on its own thread
//! - Tuner and level metering per block, deadline monitoring
//! - Rig save/load
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI Thread                            │
//! │   handles (stage + control) ──▶ Engine ◀── events/reports   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ atomics
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   input ──▶ Meter/Tuner ──▶ Signal Chain ──▶ Meter ──▶ out  │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod chain;
mod config;
mod engine;
mod error;
mod lfo;
mod message;
mod settings;
mod shared;
mod stage;
mod stream;

pub use chain::SignalChain;
pub use config::{EngineConfig, StreamConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use lfo::{LfoTicker, TickSchedule};
pub use message::Event;
pub use settings::{RigSettings, StageSettings};
pub use shared::{EngineStats, SharedState};
pub use stage::{ControlSpec, StageId, MAX_CONTROLS, STAGE_COUNT};
pub use stream::{AudioProcessor, BufferReport, DeadlineMonitor};

// Re-export DSP types for convenience
pub use tonestack_dsp::{
    LevelReading, ModulationOutput, ModulationType, PitchEstimate, CABINET_PRESETS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let _config = EngineConfig::default();
        let _rig = RigSettings::default();
        assert_eq!(StageId::ALL.len(), STAGE_COUNT);
    }
}
