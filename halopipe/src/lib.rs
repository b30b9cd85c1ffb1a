//! halopipe - Partitioned image pipeline
//!
//! Splits an RGB image into row partitions with halo rows, runs a
//! median filter, a luminance conversion and a global histogram
//! equalization on each partition, and reassembles an output that is
//! byte-identical whatever the number of workers or threads.
//!
//! # Example
//!
//! ```
//! use halopipe::{FilterSpec, Grid};
//! use halopipe::pipeline::{RunConfig, run_shared};
//!
//! let grid = Grid::new(64, 48).unwrap();
//! let config = RunConfig::new(FilterSpec::new(3).unwrap()).with_threads(2);
//! let (output, report) = run_shared(&config, &grid).unwrap();
//! assert_eq!(output.width(), 64);
//! assert_eq!(report.filter_size, 3);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use halopipe_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use halopipe_color as color;
pub use halopipe_comm as comm;
pub use halopipe_filter as filter;
pub use halopipe_io as io;
pub use halopipe_pipeline as pipeline;

pub mod cli;
