//! halopipe core - Basic data structures for the distributed pipeline
//!
//! This crate provides the data structures shared by every stage:
//!
//! - [`Grid`] - Interleaved 3-channel pixel grid
//! - [`FilterSpec`] - Odd square window used by the rank filter
//! - [`Histogram`] - Fixed 256-bin intensity histogram
//! - [`Error`] / [`Result`] - Core error type

pub mod error;
pub mod filter_spec;
pub mod grid;
pub mod histogram;

pub use error::{Error, Result};
pub use filter_spec::FilterSpec;
pub use grid::{CHANNELS, Grid, alloc_bytes, rows_to_bytes, static_chunk_rows};
pub use histogram::{HISTOGRAM_BINS, Histogram};

/// Channel indices within one interleaved pixel.
pub mod color {
    /// Red channel (byte 0)
    pub const RED: usize = 0;
    /// Green channel (byte 1)
    pub const GREEN: usize = 1;
    /// Blue channel (byte 2)
    pub const BLUE: usize = 2;
}
