//! Luminance conversion
//!
//! Replaces every pixel by its rounded luminance, written to all three
//! channels. Each pixel is independent, so rows may be split across
//! threads in any way without changing the output.

use crate::{ColorResult, row_count};
use halopipe_core::{CHANNELS, Grid, color, static_chunk_rows};
use rayon::prelude::*;

/// Red luminance weight
pub const LUMA_RED: f64 = 0.299;
/// Green luminance weight
pub const LUMA_GREEN: f64 = 0.587;
/// Blue luminance weight
pub const LUMA_BLUE: f64 = 0.114;

/// Rounded luminance of one pixel.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_RED * r as f64 + LUMA_GREEN * g as f64 + LUMA_BLUE * b as f64;
    y.round().clamp(0.0, 255.0) as u8
}

/// Convert full-width rows to gray in place.
///
/// `threads <= 1` runs on the calling thread; otherwise rows are split
/// into one contiguous chunk per thread.
pub fn grayscale_rows(buf: &mut [u8], width: u32, threads: usize) -> ColorResult<()> {
    let rows = row_count(buf.len(), width)?;
    if rows == 0 {
        return Ok(());
    }

    if threads <= 1 {
        gray_chunk(buf);
    } else {
        let chunk = static_chunk_rows(rows, threads) * width as usize * CHANNELS;
        buf.par_chunks_mut(chunk).for_each(gray_chunk);
    }
    Ok(())
}

/// Convert a whole grid to gray on the calling thread.
pub fn grayscale(grid: &mut Grid) -> ColorResult<()> {
    let width = grid.width();
    grayscale_rows(grid.data_mut(), width, 1)
}

fn gray_chunk(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(CHANNELS) {
        let y = luminance(px[color::RED], px[color::GREEN], px[color::BLUE]);
        px.fill(y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_primaries() {
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(255, 255, 255), 255);
        // 0.299 * 255 = 76.245
        assert_eq!(luminance(255, 0, 0), 76);
        // 0.587 * 255 = 149.685
        assert_eq!(luminance(0, 255, 0), 150);
        // 0.114 * 255 = 29.07
        assert_eq!(luminance(0, 0, 255), 29);
    }

    #[test]
    fn test_gray_written_to_all_channels() {
        let mut grid = Grid::new(2, 1).unwrap();
        grid.set_rgb(0, 0, 100, 150, 200).unwrap();
        grid.set_rgb(1, 0, 7, 7, 7).unwrap();
        grayscale(&mut grid).unwrap();
        let y = luminance(100, 150, 200);
        assert_eq!(grid.get_rgb(0, 0), Some((y, y, y)));
        assert_eq!(grid.get_rgb(1, 0), Some((7, 7, 7)));
    }

    #[test]
    fn test_threaded_matches_sequential() {
        let mut seq: Vec<u8> = (0..7 * 9 * 3).map(|i| (i * 13 % 256) as u8).collect();
        let mut par = seq.clone();
        grayscale_rows(&mut seq, 7, 1).unwrap();
        grayscale_rows(&mut par, 7, 4).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_partial_row_rejected() {
        let mut buf = vec![0u8; 10];
        assert!(grayscale_rows(&mut buf, 2, 1).is_err());
    }
}
