//! halopipe-pipeline - Partitioned image pipeline driver
//!
//! Runs median filter, grayscale and histogram equalization over a grid
//! split into row partitions. The result is byte-identical for every
//! worker count and every thread count:
//!
//! ```ignore
//! use halopipe_pipeline::{RunConfig, run_distributed};
//!
//! let config = RunConfig::new(FilterSpec::new(5)?).with_workers(4);
//! let (output, report) = run_distributed(&config, || Ok(grid))?;
//! println!("{}", report);
//! ```

mod config;
pub mod driver;
mod error;
mod report;

pub use config::{DEFAULT_THREADS_PER_WORKER, DEFAULT_WORKERS, RunConfig};
pub use driver::{Executor, WorkerOutcome, process_grid, run_distributed, run_shared, run_worker};
pub use error::{PipelineError, PipelineResult};
pub use report::{RunReport, StageTimings};
