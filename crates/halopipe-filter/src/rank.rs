//! Median (rank) filtering over halo-extended row bands
//!
//! Each worker holds a [`RowBand`]: a contiguous block of full-width
//! rows starting at some global row, containing its owned rows plus
//! `radius` halo rows above and below where the image allows. The
//! filter writes only owned rows and reads only rows inside the band.
//!
//! Edge policy: any pixel whose *global* row or column lies within
//! `radius` of the image border is copied through unchanged. A worker's
//! band boundary is not an image boundary, so the test always uses
//! global coordinates.
//!
//! Interior pixels take, per channel, the sample at index `size² / 2`
//! of the sorted `size x size` neighbourhood.

use crate::{FilterError, FilterResult};
use halopipe_core::{CHANNELS, FilterSpec, Grid, alloc_bytes, color, static_chunk_rows};
use rayon::prelude::*;

/// A read-only block of full-width rows taken from a larger image.
#[derive(Debug, Clone, Copy)]
pub struct RowBand<'a> {
    data: &'a [u8],
    width: u32,
    image_height: u32,
    first_row: u32,
    rows: u32,
}

impl<'a> RowBand<'a> {
    /// Wrap `data`, whose first row is global row `first_row` of an
    /// image `width` x `image_height`.
    pub fn new(data: &'a [u8], width: u32, image_height: u32, first_row: u32) -> FilterResult<Self> {
        if width == 0 || image_height == 0 {
            return Err(halopipe_core::Error::InvalidDimension {
                width,
                height: image_height,
            }
            .into());
        }
        let stride = width as usize * CHANNELS;
        if data.len() % stride != 0 {
            return Err(FilterError::InvalidParameters(format!(
                "band of {} bytes is not a whole number of {}-byte rows",
                data.len(),
                stride
            )));
        }
        let rows = (data.len() / stride) as u32;
        if first_row as u64 + rows as u64 > image_height as u64 {
            return Err(FilterError::InvalidParameters(format!(
                "band rows {}..{} exceed image height {}",
                first_row,
                first_row as u64 + rows as u64,
                image_height
            )));
        }
        Ok(Self {
            data,
            width,
            image_height,
            first_row,
            rows,
        })
    }

    /// A band covering a whole grid.
    pub fn from_grid(grid: &'a Grid) -> Self {
        Self {
            data: grid.data(),
            width: grid.width(),
            image_height: grid.height(),
            first_row: 0,
            rows: grid.height(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    /// Global index of the first row held.
    pub fn first_row(&self) -> u32 {
        self.first_row
    }

    /// One past the global index of the last row held.
    pub fn end_row(&self) -> u32 {
        self.first_row + self.rows
    }

    #[inline]
    fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Bytes of global row `gy`; the caller guarantees it is held.
    #[inline]
    fn row(&self, gy: u32) -> &'a [u8] {
        let stride = self.stride();
        let start = (gy - self.first_row) as usize * stride;
        &self.data[start..start + stride]
    }
}

/// Sort `samples` and return the value at index `len / 2`.
#[inline]
pub fn median_of(samples: &mut [u8]) -> u8 {
    samples.sort_unstable();
    samples[samples.len() / 2]
}

/// Median-filter the owned rows of a band.
///
/// # Arguments
///
/// * `band` - Halo-extended input rows
/// * `spec` - Window size
/// * `out_row_start` - Global index of the first owned row
/// * `out` - Owned output rows, full width, interleaved
/// * `threads` - Number of static row chunks to run in parallel;
///   `<= 1` runs on the calling thread
pub fn median_filter_band(
    band: &RowBand<'_>,
    spec: FilterSpec,
    out_row_start: u32,
    out: &mut [u8],
    threads: usize,
) -> FilterResult<()> {
    let stride = band.stride();
    if out.len() % stride != 0 {
        return Err(FilterError::InvalidParameters(format!(
            "output of {} bytes is not a whole number of {}-byte rows",
            out.len(),
            stride
        )));
    }
    let out_rows = out.len() / stride;
    if out_rows == 0 {
        return Ok(());
    }

    let radius = spec.radius();
    let out_end = out_row_start as u64 + out_rows as u64;
    let needed_start = out_row_start.saturating_sub(radius);
    let needed_end = (out_end + radius as u64).min(band.image_height as u64) as u32;
    if out_end > band.image_height as u64
        || needed_start < band.first_row()
        || needed_end > band.end_row()
    {
        return Err(FilterError::InsufficientHalo {
            needed_start,
            needed_end,
            have_start: band.first_row(),
            have_end: band.end_row(),
        });
    }

    // No pixel is interior once the window spans the image
    let span = 2 * radius as u64;
    if span >= band.image_height as u64 || span >= band.width as u64 {
        for (k, out_row) in out.chunks_exact_mut(stride).enumerate() {
            out_row.copy_from_slice(band.row(out_row_start + k as u32));
        }
        log::debug!(
            "median {}x{} covers the {}x{} image, rows {}..{} copied",
            spec.size(),
            spec.size(),
            band.width,
            band.image_height,
            out_row_start,
            out_end
        );
        return Ok(());
    }

    if threads <= 1 || out_rows == 1 {
        filter_rows(band, spec, out_row_start, out)?;
    } else {
        let chunk_rows = static_chunk_rows(out_rows, threads);
        out.par_chunks_mut(chunk_rows * stride)
            .enumerate()
            .try_for_each(|(i, chunk)| {
                let first = out_row_start + (i * chunk_rows) as u32;
                filter_rows(band, spec, first, chunk)
            })?;
    }

    log::debug!(
        "median {}x{} over rows {}..{} ({} threads)",
        spec.size(),
        spec.size(),
        out_row_start,
        out_end,
        threads.max(1)
    );
    Ok(())
}

/// Median-filter a whole grid on the calling thread.
pub fn median_filter(grid: &Grid, spec: FilterSpec) -> FilterResult<Grid> {
    let mut out = Grid::new(grid.width(), grid.height())?;
    median_filter_band(&RowBand::from_grid(grid), spec, 0, out.data_mut(), 1)?;
    Ok(out)
}

/// Filter consecutive rows starting at global row `first_row`.
///
/// One window scratch buffer serves every pixel of every row in the
/// chunk.
fn filter_rows(
    band: &RowBand<'_>,
    spec: FilterSpec,
    first_row: u32,
    out: &mut [u8],
) -> FilterResult<()> {
    let mut window = window_buffer(spec)?;
    for (k, out_row) in out.chunks_exact_mut(band.stride()).enumerate() {
        filter_row(band, spec, first_row + k as u32, out_row, &mut window);
    }
    Ok(())
}

/// Scratch space for one neighbourhood, split by channel.
fn window_buffer(spec: FilterSpec) -> FilterResult<Vec<u8>> {
    let len = spec.area().checked_mul(CHANNELS).ok_or_else(|| {
        FilterError::InvalidParameters(format!(
            "{}x{} window does not fit in memory",
            spec.size(),
            spec.size()
        ))
    })?;
    Ok(alloc_bytes(len)?)
}

fn filter_row(band: &RowBand<'_>, spec: FilterSpec, gy: u32, out_row: &mut [u8], window: &mut [u8]) {
    let r = spec.radius();
    let size = spec.size() as usize;
    let area = spec.area();
    let width = band.width();
    let src = band.row(gy);

    if gy < r || gy as u64 + r as u64 >= band.image_height() as u64 {
        out_row.copy_from_slice(src);
        return;
    }

    let (win_r, rest) = window.split_at_mut(area);
    let (win_g, win_b) = rest.split_at_mut(area);

    for x in 0..width {
        let o = x as usize * CHANNELS;
        if x < r || x as u64 + r as u64 >= width as u64 {
            out_row[o..o + CHANNELS].copy_from_slice(&src[o..o + CHANNELS]);
            continue;
        }

        let left = (x - r) as usize * CHANNELS;
        let mut n = 0;
        for wy in gy - r..=gy + r {
            let line = &band.row(wy)[left..left + size * CHANNELS];
            for px in line.chunks_exact(CHANNELS) {
                win_r[n] = px[color::RED];
                win_g[n] = px[color::GREEN];
                win_b[n] = px[color::BLUE];
                n += 1;
            }
        }

        out_row[o + color::RED] = median_of(win_r);
        out_row[o + color::GREEN] = median_of(win_g);
        out_row[o + color::BLUE] = median_of(win_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> Grid {
        let mut grid = Grid::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 37 + y * 91) % 251) as u8;
                grid.set_rgb(x, y, v, v.wrapping_mul(3), 255 - v).unwrap();
            }
        }
        grid
    }

    #[test]
    fn test_median_of_known_window() {
        let mut samples = [90, 10, 70, 30, 50, 20, 80, 40, 60];
        assert_eq!(median_of(&mut samples), 50);
    }

    #[test]
    fn test_median_removes_impulse() {
        let mut grid = Grid::new(5, 5).unwrap();
        grid.fill_rgb(10, 20, 30);
        grid.set_rgb(2, 2, 255, 255, 255).unwrap();
        let out = median_filter(&grid, FilterSpec::new(3).unwrap()).unwrap();
        assert_eq!(out.get_rgb(2, 2), Some((10, 20, 30)));
    }

    #[test]
    fn test_border_band_copied_for_size_5() {
        let grid = ramp(9, 8);
        let out = median_filter(&grid, FilterSpec::new(5).unwrap()).unwrap();
        for y in 0..8 {
            for x in 0..9 {
                let border = y < 2 || y >= 6 || x < 2 || x >= 7;
                if border {
                    assert_eq!(out.get_rgb(x, y), grid.get_rgb(x, y), "({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_size_one_is_identity() {
        let grid = ramp(6, 4);
        let out = median_filter(&grid, FilterSpec::new(1).unwrap()).unwrap();
        assert_eq!(out, grid);
    }

    #[test]
    fn test_window_larger_than_image_copies_everything() {
        let grid = ramp(4, 4);
        let out = median_filter(&grid, FilterSpec::new(9).unwrap()).unwrap();
        assert_eq!(out, grid);
    }

    #[test]
    fn test_huge_window_copies_without_allocating() {
        let grid = ramp(8, 6);
        for size in [u32::MAX, 65535, 13] {
            let spec = FilterSpec::new(size).unwrap();
            let out = median_filter(&grid, spec).unwrap();
            assert_eq!(out, grid, "size = {}", size);

            let mut par = vec![0u8; grid.data().len()];
            median_filter_band(&RowBand::from_grid(&grid), spec, 0, &mut par, 4).unwrap();
            assert_eq!(&par[..], grid.data(), "size = {}", size);
        }
    }

    #[test]
    fn test_window_fits_only_one_dimension() {
        // Wide enough for interior columns but too short for interior rows
        let grid = ramp(20, 4);
        let out = median_filter(&grid, FilterSpec::new(5).unwrap()).unwrap();
        assert_eq!(out, grid);
    }

    #[test]
    fn test_window_buffer_overflow_is_an_error() {
        let spec = FilterSpec::new(u32::MAX).unwrap();
        assert!(matches!(
            window_buffer(spec),
            Err(FilterError::InvalidParameters(_))
        ));
        assert_eq!(window_buffer(FilterSpec::new(3).unwrap()).unwrap().len(), 27);
    }

    #[test]
    fn test_band_matches_whole_grid() {
        let grid = ramp(11, 13);
        let spec = FilterSpec::new(3).unwrap();
        let whole = median_filter(&grid, spec).unwrap();

        // Rows 4..8 with one halo row on each side
        let stride = grid.row_stride();
        let band_data = &grid.data()[3 * stride..9 * stride];
        let band = RowBand::new(band_data, 11, 13, 3).unwrap();
        let mut out = vec![0u8; 4 * stride];
        median_filter_band(&band, spec, 4, &mut out, 1).unwrap();
        assert_eq!(&out[..], &whole.data()[4 * stride..8 * stride]);
    }

    #[test]
    fn test_parallel_chunks_match_sequential() {
        let grid = ramp(17, 23);
        let spec = FilterSpec::new(5).unwrap();
        let band = RowBand::from_grid(&grid);
        let mut seq = vec![0u8; grid.data().len()];
        median_filter_band(&band, spec, 0, &mut seq, 1).unwrap();
        for threads in [2, 3, 4, 8] {
            let mut par = vec![0u8; grid.data().len()];
            median_filter_band(&band, spec, 0, &mut par, threads).unwrap();
            assert_eq!(par, seq, "threads = {}", threads);
        }
    }

    #[test]
    fn test_missing_halo_rejected() {
        let grid = ramp(6, 10);
        let stride = grid.row_stride();
        // Owned rows 4..6 but no halo above
        let band = RowBand::new(&grid.data()[4 * stride..7 * stride], 6, 10, 4).unwrap();
        let mut out = vec![0u8; 2 * stride];
        let err = median_filter_band(&band, FilterSpec::new(3).unwrap(), 4, &mut out, 1);
        assert!(matches!(err, Err(FilterError::InsufficientHalo { .. })));
    }

    #[test]
    fn test_band_validation() {
        let data = vec![0u8; 10];
        assert!(RowBand::new(&data, 2, 5, 0).is_err());
        let data = vec![0u8; 12];
        assert!(RowBand::new(&data, 2, 1, 0).is_err());
        assert!(RowBand::new(&data, 2, 2, 0).is_ok());
    }
}
