//! halopipe-color - Pointwise luminance and histogram equalization
//!
//! Both stages work on slices of full-width interleaved rows so a
//! worker can apply them to just the rows it owns. Equalization needs
//! one global histogram; see [`equalize`](mod@equalize) for how the
//! work is split.

mod error;
pub mod equalize;
pub mod grayscale;

pub use equalize::{EqualizationMap, TrcLut, equalize, local_histogram, remap_rows};
pub use error::{ColorError, ColorResult};
pub use grayscale::{LUMA_BLUE, LUMA_GREEN, LUMA_RED, grayscale, grayscale_rows, luminance};

/// Number of full rows in a buffer `len` bytes long.
pub(crate) fn row_count(len: usize, width: u32) -> ColorResult<usize> {
    let stride = width as usize * halopipe_core::CHANNELS;
    if stride == 0 || len % stride != 0 {
        return Err(ColorError::PartialRow { width, len });
    }
    Ok(len / stride)
}
