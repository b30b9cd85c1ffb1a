//! Median filter regression test
//!
//! Tests the windowed median filter:
//!   (1) Isolated impulses on a flat field are removed
//!   (2) Border pixels within the radius are copied through
//!   (3) Filtering halo-extended bands and stitching the owned rows
//!       reproduces the whole-grid result for every split

use halopipe_comm::partition_rows;
use halopipe_core::{FilterSpec, Grid};
use halopipe_filter::{RowBand, median_filter, median_filter_band};
use halopipe_test::{RegParams, noise_grid, speckled_gradient, uniform_grid};

#[test]
fn rank_reg_impulse_removal() {
    let mut rp = RegParams::new("rank_impulse");

    let mut pixs = uniform_grid(32, 24, 100).expect("uniform_grid");
    for (x, y) in [(5, 5), (10, 12), (20, 3), (30, 20), (16, 16)] {
        pixs.set_rgb(x, y, 255, 0, 255).expect("set impulse");
    }
    rp.write_grid(&pixs).expect("write input");

    let filtered = median_filter(&pixs, FilterSpec::new(3).unwrap()).expect("median 3x3");
    rp.write_grid(&filtered).expect("write output");

    // No impulse lies in the one-pixel border
    let flat = uniform_grid(32, 24, 100).expect("uniform_grid");
    rp.compare_grids(&flat, &filtered);

    assert!(rp.cleanup(), "rank_impulse regression test failed");
}

#[test]
fn rank_reg_border_copy() {
    let mut rp = RegParams::new("rank_border");

    let pixs = noise_grid(21, 17, 42).expect("noise_grid");
    for size in [3u32, 5, 7] {
        let spec = FilterSpec::new(size).unwrap();
        let r = spec.radius();
        let filtered = median_filter(&pixs, spec).expect("median");

        let mut copied = 0u32;
        let mut expected = 0u32;
        for y in 0..pixs.height() {
            for x in 0..pixs.width() {
                if y < r || y >= pixs.height() - r || x < r || x >= pixs.width() - r {
                    expected += 1;
                    if filtered.get_rgb(x, y) == pixs.get_rgb(x, y) {
                        copied += 1;
                    }
                }
            }
        }
        rp.compare_values(expected as f64, copied as f64, 0.0);
    }

    assert!(rp.cleanup(), "rank_border regression test failed");
}

/// Filter each band separately, as a distributed worker would
fn filter_in_bands(pixs: &Grid, spec: FilterSpec, workers: usize) -> Grid {
    let width = pixs.width();
    let stride = pixs.row_stride();
    let parts = partition_rows(pixs.height(), workers, spec.radius()).expect("partition");
    let mut out = Grid::new(width, pixs.height()).expect("grid");

    for part in parts.iter().filter(|p| !p.is_empty()) {
        let input = &pixs.data()[part.input_row_start as usize * stride..part.input_row_end() as usize * stride];
        let band = RowBand::new(input, width, pixs.height(), part.input_row_start).expect("band");
        let owned = &mut out.data_mut()
            [part.output_row_start as usize * stride..part.output_row_end() as usize * stride];
        median_filter_band(&band, spec, part.output_row_start, owned, 2).expect("median band");
    }
    out
}

#[test]
fn rank_reg_band_stitching() {
    let mut rp = RegParams::new("rank_bands");

    let pixs = speckled_gradient(37, 29, 6, 11).expect("speckled_gradient");
    for size in [3u32, 5] {
        let spec = FilterSpec::new(size).unwrap();
        let whole = median_filter(&pixs, spec).expect("median");
        for workers in [1usize, 2, 3, 5, 7, 40] {
            let stitched = filter_in_bands(&pixs, spec, workers);
            rp.compare_grids(&whole, &stitched);
        }
    }

    assert!(rp.cleanup(), "rank_bands regression test failed");
}
