//! I/O error types
//!
//! Provides a unified error type for bitmap decoding and encoding.
//! Every failure raised here is fatal input: the coordinator cannot
//! produce a grid, so the run aborts.

use thiserror::Error;

/// Error type for image I/O operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// Standard I/O error (file not found, truncated stream, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bitmap is not supported (bit depth, compression, planes)
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The image data is structurally invalid
    #[error("invalid image data: {0}")]
    InvalidData(String),

    /// An error from the core library (e.g. buffer length mismatch)
    #[error("core error: {0}")]
    Core(#[from] halopipe_core::Error),
}

/// Convenience alias for I/O results.
pub type IoResult<T> = Result<T, IoError>;
