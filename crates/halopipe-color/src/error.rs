//! Error types for halopipe-color

use thiserror::Error;

/// Errors that can occur during color operations
#[derive(Debug, Error)]
pub enum ColorError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] halopipe_core::Error),

    /// Buffer is not a whole number of rows
    #[error("buffer of {len} bytes is not a whole number of rows of width {width}")]
    PartialRow { width: u32, len: usize },

    /// Global histogram does not cover the whole grid
    #[error("histogram holds {actual} samples but the grid has {expected} pixels")]
    HistogramMismatch { expected: u64, actual: u64 },

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for color operations
pub type ColorResult<T> = Result<T, ColorError>;
