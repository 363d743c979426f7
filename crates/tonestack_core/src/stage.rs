//! Stage Handles and Control Tables
//!
//! The UI layer never holds references into the chain. It names a stage by
//! [`StageId`] and a control by its string name; this module resolves those
//! handles to slot indices and carries the per-stage defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Most controls any stage exposes
pub const MAX_CONTROLS: usize = 3;

/// Number of stages in the chain
pub const STAGE_COUNT: usize = 8;

/// Effect stages in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Gate,
    Compressor,
    Distortion,
    ToneEq,
    Modulation,
    Cabinet,
    Delay,
    Reverb,
}

/// One user-facing control and its default knob position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSpec {
    pub name: &'static str,
    pub default: f32,
}

const fn control(name: &'static str, default: f32) -> ControlSpec {
    ControlSpec { name, default }
}

const GATE_CONTROLS: &[ControlSpec] = &[control("threshold", 0.3)];
// Level 1/3 is 0 dB makeup
const COMPRESSOR_CONTROLS: &[ControlSpec] =
    &[control("sustain", 0.5), control("level", 1.0 / 3.0)];
const DISTORTION_CONTROLS: &[ControlSpec] = &[control("drive", 0.5)];
const TONE_EQ_CONTROLS: &[ControlSpec] = &[
    control("bass", 0.5),
    control("mid", 0.5),
    control("treble", 0.5),
];
const MODULATION_CONTROLS: &[ControlSpec] = &[control("rate", 0.3), control("depth", 0.5)];
const DELAY_CONTROLS: &[ControlSpec] = &[
    control("time", 0.35),
    control("feedback", 0.3),
    control("mix", 0.35),
];
const REVERB_CONTROLS: &[ControlSpec] = &[control("mix", 0.25)];

impl StageId {
    /// All stages in processing order
    pub const ALL: [StageId; STAGE_COUNT] = [
        StageId::Gate,
        StageId::Compressor,
        StageId::Distortion,
        StageId::ToneEq,
        StageId::Modulation,
        StageId::Cabinet,
        StageId::Delay,
        StageId::Reverb,
    ];

    /// Position in the chain, also the slot index in shared state
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Gate => "gate",
            StageId::Compressor => "compressor",
            StageId::Distortion => "distortion",
            StageId::ToneEq => "tone_eq",
            StageId::Modulation => "modulation",
            StageId::Cabinet => "cabinet",
            StageId::Delay => "delay",
            StageId::Reverb => "reverb",
        }
    }

    /// Controls this stage accepts, in slot order
    pub fn controls(self) -> &'static [ControlSpec] {
        match self {
            StageId::Gate => GATE_CONTROLS,
            StageId::Compressor => COMPRESSOR_CONTROLS,
            StageId::Distortion => DISTORTION_CONTROLS,
            StageId::ToneEq => TONE_EQ_CONTROLS,
            StageId::Modulation => MODULATION_CONTROLS,
            StageId::Cabinet => &[],
            StageId::Delay => DELAY_CONTROLS,
            StageId::Reverb => REVERB_CONTROLS,
        }
    }

    /// Resolve a control name to its slot
    pub fn control_index(self, name: &str) -> Result<usize, EngineError> {
        self.controls()
            .iter()
            .position(|spec| spec.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| EngineError::UnknownControl {
                stage: self.as_str().to_string(),
                control: name.to_string(),
            })
    }

    /// Whether the stage is engaged on a fresh engine
    pub fn enabled_by_default(self) -> bool {
        matches!(self, StageId::ToneEq | StageId::Cabinet)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = EngineError;

    /// Accepts the snake_case names, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        StageId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownStage(s.to_string()))
    }
}
