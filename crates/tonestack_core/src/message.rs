//! Engine Events
//!
//! Events flow from the engine (audio tick, LFO ticker, control path) to
//! whoever drains them on the UI side. Every producer uses `try_send`.

use serde::{Deserialize, Serialize};

/// Events published by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Engine started successfully
    Started,

    /// Engine stopped
    Stopped,

    /// Non-fatal configuration problem (unknown stage, control or preset)
    Diagnostic { message: String },

    /// A buffer took longer than its playback duration
    DeadlineMissed { late_buffers: u64 },

    /// Active cabinet preset changed
    PresetChanged { name: String },

    /// Chain state rebuilt for a new stream configuration
    Reinitialized { sample_rate: u32, block_size: u32 },

    /// The LFO clock fell behind and skipped stale ticks
    LfoTicksDropped { dropped: u64 },
}

impl Event {
    /// Create a diagnostic event from any error type
    pub fn diagnostic<E: std::fmt::Display>(err: E) -> Self {
        Event::Diagnostic {
            message: err.to_string(),
        }
    }
}
