//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while building or configuring DSP stages
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Invalid filter coefficients for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { frequency: f32, sample_rate: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Unknown cabinet preset: {0}")]
    UnknownPreset(String),

    #[error("Unknown modulation type: {0}")]
    UnknownModulationType(String),
}
