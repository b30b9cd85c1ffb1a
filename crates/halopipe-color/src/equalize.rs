//! Global histogram equalization
//!
//! Equalization runs in two phases so that it can be split across
//! workers that each hold only part of the image:
//!
//! 1. Every worker builds a [`Histogram`] of its own rows with
//!    [`local_histogram`]. The local histograms are summed into one
//!    global histogram (by the caller, through whatever collective it
//!    uses).
//! 2. Every worker derives the same [`EqualizationMap`] from the global
//!    histogram and remaps its own rows with [`remap_rows`].
//!
//! The map is
//!
//! ```text
//! map[v] = clamp(round(255 * (cdf[v] - cdf_min) / (total - cdf_min)), 0, 255)
//! ```
//!
//! where `cdf_min` is the first non-zero CDF value. When every pixel
//! has the same value (`total == cdf_min`) the map is the identity.

use crate::{ColorError, ColorResult, row_count};
use halopipe_core::{CHANNELS, Grid, HISTOGRAM_BINS, Histogram, static_chunk_rows};
use parking_lot::Mutex;
use rayon::prelude::*;

/// Tone reproduction curve lookup table
pub type TrcLut = [u8; 256];

fn identity_lut() -> TrcLut {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = i as u8;
    }
    lut
}

/// Histogram of the first channel of full-width gray rows.
///
/// With `threads > 1` each static chunk counts into its own histogram
/// and merges it into the shared result under a lock. Integer addition
/// commutes, so the merge order does not matter.
pub fn local_histogram(buf: &[u8], width: u32, threads: usize) -> ColorResult<Histogram> {
    let rows = row_count(buf.len(), width)?;
    if rows == 0 {
        return Ok(Histogram::new());
    }

    if threads <= 1 {
        return Ok(count_chunk(buf));
    }

    let chunk = static_chunk_rows(rows, threads) * width as usize * CHANNELS;
    let shared = Mutex::new(Histogram::new());
    buf.par_chunks(chunk).for_each(|part| {
        let partial = count_chunk(part);
        shared.lock().merge(&partial);
    });
    Ok(shared.into_inner())
}

fn count_chunk(buf: &[u8]) -> Histogram {
    let mut hist = Histogram::new();
    for px in buf.chunks_exact(CHANNELS) {
        hist.add(px[0]);
    }
    hist
}

/// Intensity mapping derived from a global histogram.
#[derive(Clone, PartialEq, Eq)]
pub struct EqualizationMap {
    lut: TrcLut,
    cdf: [u64; HISTOGRAM_BINS],
    cdf_min: u64,
    total: u64,
}

impl EqualizationMap {
    /// Derive the map from the global histogram of a grid with `total`
    /// pixels.
    ///
    /// Fails if the histogram does not account for exactly `total`
    /// samples.
    pub fn derive(global: &Histogram, total: u64) -> ColorResult<Self> {
        if total == 0 {
            return Err(ColorError::InvalidParameters(
                "cannot equalize an empty grid".into(),
            ));
        }
        let counted = global.total();
        if counted != total {
            return Err(ColorError::HistogramMismatch {
                expected: total,
                actual: counted,
            });
        }

        let mut cdf = [0u64; HISTOGRAM_BINS];
        let mut running = 0u64;
        for (dst, &count) in cdf.iter_mut().zip(global.counts().iter()) {
            running += count;
            *dst = running;
        }
        let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);

        let degenerate = total == cdf_min;
        log::debug!(
            "equalize: cdf_min {} of {} pixels{}",
            cdf_min,
            total,
            if degenerate { ", single level, identity map" } else { "" }
        );
        let lut = if degenerate {
            identity_lut()
        } else {
            let den = (total - cdf_min) as f64;
            let mut lut = [0u8; 256];
            for (entry, &c) in lut.iter_mut().zip(cdf.iter()) {
                let num = c as f64 - cdf_min as f64;
                *entry = (255.0 * num / den).round().clamp(0.0, 255.0) as u8;
            }
            lut
        };

        Ok(Self {
            lut,
            cdf,
            cdf_min,
            total,
        })
    }

    /// The lookup table.
    pub fn lut(&self) -> &TrcLut {
        &self.lut
    }

    /// Cumulative counts.
    pub fn cdf(&self) -> &[u64; HISTOGRAM_BINS] {
        &self.cdf
    }

    /// First non-zero cumulative count.
    pub fn cdf_min(&self) -> u64 {
        self.cdf_min
    }

    /// Number of pixels the map was derived for.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Mapped value of `v`.
    #[inline]
    pub fn apply(&self, v: u8) -> u8 {
        self.lut[v as usize]
    }

    /// Whether every populated bin of `hist` maps to itself.
    pub fn is_identity_on(&self, hist: &Histogram) -> bool {
        hist.populated().all(|v| self.apply(v) == v)
    }
}

impl std::fmt::Debug for EqualizationMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EqualizationMap")
            .field("total", &self.total)
            .field("cdf_min", &self.cdf_min)
            .finish_non_exhaustive()
    }
}

/// Remap full-width gray rows in place, writing the mapped value of
/// the first channel to all three channels.
pub fn remap_rows(buf: &mut [u8], width: u32, map: &EqualizationMap, threads: usize) -> ColorResult<()> {
    let rows = row_count(buf.len(), width)?;
    if rows == 0 {
        return Ok(());
    }

    let lut = map.lut();
    if threads <= 1 {
        remap_chunk(buf, lut);
    } else {
        let chunk = static_chunk_rows(rows, threads) * width as usize * CHANNELS;
        buf.par_chunks_mut(chunk).for_each(|part| remap_chunk(part, lut));
    }
    Ok(())
}

fn remap_chunk(buf: &mut [u8], lut: &TrcLut) {
    for px in buf.chunks_exact_mut(CHANNELS) {
        px.fill(lut[px[0] as usize]);
    }
}

/// Equalize a whole gray grid on the calling thread.
///
/// Returns the map that was applied.
pub fn equalize(grid: &mut Grid) -> ColorResult<EqualizationMap> {
    let width = grid.width();
    let hist = local_histogram(grid.data(), width, 1)?;
    let map = EqualizationMap::derive(&hist, grid.pixel_count())?;
    remap_rows(grid.data_mut(), width, &map, 1)?;
    Ok(map)
}
