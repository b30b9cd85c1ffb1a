//! Error types for halopipe-pipeline

use halopipe_comm::CommError;
use thiserror::Error;

/// Errors that can occur while running the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] halopipe_core::Error),

    /// Communication error
    #[error("communication error: {0}")]
    Comm(#[from] CommError),

    /// Median filter error
    #[error("filter error: {0}")]
    Filter(#[from] halopipe_filter::FilterError),

    /// Grayscale or equalization error
    #[error("color error: {0}")]
    Color(#[from] halopipe_color::ColorError),

    /// Worker thread pool could not be built
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Invalid run configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The coordinator could not load its input
    #[error("input unavailable: {0}")]
    InputUnavailable(String),

    /// A worker thread panicked
    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },

    /// The coordinator finished without an assembled grid
    #[error("coordinator returned no output")]
    MissingOutput,
}

impl PipelineError {
    /// Whether this error only reports that another member aborted.
    pub fn is_abort(&self) -> bool {
        matches!(self, PipelineError::Comm(CommError::Aborted { .. }))
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
