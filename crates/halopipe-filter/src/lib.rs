//! halopipe-filter - Windowed rank filtering
//!
//! This crate provides the median filter stage of the pipeline. It
//! works on [`RowBand`]s so that a worker holding only part of the
//! image, plus its halo rows, produces the same bytes a single worker
//! would for the whole image.

mod error;
pub mod rank;

pub use error::{FilterError, FilterResult};
pub use rank::{RowBand, median_filter, median_filter_band, median_of};
