//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the effect engine
///
/// `NotRunning` and `BufferSizeMismatch` are the only variants the audio
/// path returns; neither carries heap data.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Unknown control '{control}' on stage '{stage}'")]
    UnknownControl { stage: String, control: String },

    #[error("Unknown cabinet preset: {0}")]
    UnknownPreset(String),

    #[error("Unknown modulation type: {0}")]
    UnknownModulationType(String),

    #[error("Engine already running")]
    AlreadyRunning,

    #[error("Engine not running")]
    NotRunning,

    #[error("Buffer size mismatch: expected {expected} samples, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("Stream configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("DSP error: {0}")]
    DspError(#[from] tonestack_dsp::DspError),
}

impl EngineError {
    /// Configuration errors are reported to the caller and never fatal
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownStage(_)
                | EngineError::UnknownControl { .. }
                | EngineError::UnknownPreset(_)
                | EngineError::UnknownModulationType(_)
        )
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
