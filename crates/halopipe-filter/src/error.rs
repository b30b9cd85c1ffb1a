//! Error types for halopipe-filter

use thiserror::Error;

/// Errors that can occur during filtering operations
#[derive(Debug, Error)]
pub enum FilterError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] halopipe_core::Error),

    /// The input band lacks rows the window needs
    #[error(
        "rows {needed_start}..{needed_end} needed but only {have_start}..{have_end} present"
    )]
    InsufficientHalo {
        needed_start: u32,
        needed_end: u32,
        have_start: u32,
        have_end: u32,
    },

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
