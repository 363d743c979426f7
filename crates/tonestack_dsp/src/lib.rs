//! Tonestack DSP - Guitar Effect Building Blocks
//!
//! This crate provides the audio processing pieces of the Tonestack engine:
//! - Parameter mapping from normalized knob positions to physical units
//! - Noise gate and compressor driven by envelope followers
//! - Tanh distortion, three-band tone EQ and a feedback delay
//! - Chorus / flanger / tremolo with a coarse-clock LFO
//! - EQ-based cabinet simulation with a fixed preset catalog
//! - Freeverb-style reverb
//! - Zero-crossing pitch detection and RMS level metering
//!
//! # Architecture
//!
//! Every stage implements [`Stage`] and processes mono buffers in place.
//! Memory is allocated at construction; `process()` and `reset()` never
//! allocate. Threading and parameter exchange live in `tonestack_core`.

mod cabinet;
mod delay;
mod delay_line;
mod distortion;
mod dynamics;
mod eq;
mod error;
pub mod mapping;
mod meter;
mod modulation;
mod pitch;
mod presets;
mod processor;
mod reverb;
mod smoothing;

pub use cabinet::Cabinet;
pub use delay::Delay;
pub use delay_line::DelayLine;
pub use distortion::Distortion;
pub use dynamics::{Compressor, NoiseGate};
pub use eq::{FilterBand, FilterKind, ToneEq, TONE_BANDS, TONE_BANDWIDTH_OCTAVES};
pub use error::DspError;
pub use meter::{measure, rms, LevelReading, METER_FLOOR_DB};
pub use modulation::{Lfo, ModulationOutput, ModulationStage, ModulationType};
pub use pitch::{PitchDetector, PitchEstimate, NOTE_NAMES, VOICED_FLOOR_HZ};
pub use presets::{find_preset, CabinetPreset, CABINET_PRESETS, MAX_CABINET_BANDS};
pub use processor::{ProcessContext, Stage};
pub use reverb::Reverb;
pub use smoothing::{EnvelopeFollower, Smoother};
