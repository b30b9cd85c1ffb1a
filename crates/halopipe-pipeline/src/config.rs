//! Run configuration

use crate::{PipelineError, PipelineResult};
use halopipe_core::FilterSpec;

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 1;
/// Default number of kernel threads inside each worker
pub const DEFAULT_THREADS_PER_WORKER: usize = 1;

/// Options for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Median window (already coerced to an odd size)
    pub filter: FilterSpec,
    /// Number of group members with private memory
    pub workers: usize,
    /// Threads each member uses for its row kernels
    pub threads_per_worker: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            filter: FilterSpec::default(),
            workers: DEFAULT_WORKERS,
            threads_per_worker: DEFAULT_THREADS_PER_WORKER,
        }
    }
}

impl RunConfig {
    /// Configuration with the given filter and default parallelism.
    pub fn new(filter: FilterSpec) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_threads(mut self, threads_per_worker: usize) -> Self {
        self.threads_per_worker = threads_per_worker;
        self
    }

    /// Reject configurations no run can satisfy.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig("worker count must be > 0".into()));
        }
        if self.threads_per_worker == 0 {
            return Err(PipelineError::InvalidConfig(
                "threads per worker must be > 0".into(),
            ));
        }
        Ok(())
    }
}
