use flux_core::{ParameterError, ZeroWindowError};
use thiserror::Error;

/// Configuration and setup errors. None of these occur during steady-state
/// ticking; a pipeline that was built successfully only fails through
/// contract-violation panics.
#[derive(Debug, Error)]
pub enum OnsetError {
    #[error("band {band}: minimum frequency {min_hz} Hz is not below maximum {max_hz} Hz")]
    InvalidBandRange { band: usize, min_hz: f32, max_hz: f32 },

    #[error("band {band}: {min_hz}-{max_hz} Hz resolves to empty bin range [{min_bin}, {max_bin})")]
    EmptyBinRange {
        band: usize,
        min_hz: f32,
        max_hz: f32,
        min_bin: usize,
        max_bin: usize,
    },

    #[error("band {band}: {source}")]
    InvalidEvaluationWindow {
        band: usize,
        #[source]
        source: ZeroWindowError,
    },

    #[error("invalid sample rate {0} Hz")]
    InvalidSampleRate(f32),

    #[error("bin count must be at least 2, got {0}")]
    InvalidBinCount(usize),

    #[error("spectrum has {actual} bins, expected {expected}")]
    SpectrumLength { expected: usize, actual: usize },

    #[error("spectrum consumer is gone")]
    Disconnected,

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OnsetError>;
