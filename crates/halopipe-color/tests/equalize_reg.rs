//! Histogram equalization regression test
//!
//! Tests global equalization and its split form:
//!   (1) An image already spanning 0..=255 uniformly is left unchanged
//!   (2) A flat image maps through the identity
//!   (3) Summing per-band histograms and remapping each band matches
//!       whole-grid equalization
//!   (4) Output of a non-degenerate image reaches both 0 and 255

use halopipe_color::{
    EqualizationMap, equalize, grayscale, grayscale_rows, local_histogram, remap_rows,
};
use halopipe_core::Histogram;
use halopipe_test::{RegParams, full_range_gray, noise_grid, uniform_grid};

#[test]
fn equalize_reg_idempotent_on_full_range() {
    let mut rp = RegParams::new("equalize_full_range");

    let pixs = full_range_gray(3).expect("full_range_gray");
    let hist = local_histogram(pixs.data(), pixs.width(), 1).expect("histogram");
    let map = EqualizationMap::derive(&hist, pixs.pixel_count()).expect("derive");
    rp.compare_values(1.0, if map.is_identity_on(&hist) { 1.0 } else { 0.0 }, 0.0);

    let mut out = pixs.clone();
    equalize(&mut out).expect("equalize");
    rp.compare_grids(&pixs, &out);

    assert!(rp.cleanup(), "equalize_full_range regression test failed");
}

#[test]
fn equalize_reg_degenerate() {
    let mut rp = RegParams::new("equalize_degenerate");

    let pixs = uniform_grid(9, 7, 128).expect("uniform_grid");
    let mut out = pixs.clone();
    let map = equalize(&mut out).expect("equalize");
    rp.compare_values(63.0, map.cdf_min() as f64, 0.0);
    rp.compare_values(128.0, map.apply(128) as f64, 0.0);
    rp.compare_grids(&pixs, &out);

    assert!(rp.cleanup(), "equalize_degenerate regression test failed");
}

#[test]
fn equalize_reg_split_matches_whole() {
    let mut rp = RegParams::new("equalize_split");

    let mut pixs = noise_grid(23, 19, 5).expect("noise_grid");
    grayscale(&mut pixs).expect("grayscale");

    let mut whole = pixs.clone();
    equalize(&mut whole).expect("equalize");
    rp.write_grid(&whole).expect("write");

    let width = pixs.width();
    let stride = pixs.row_stride();
    for bands in [2usize, 3, 4, 19] {
        let rows_per = (pixs.height() as usize).div_ceil(bands);
        let mut split = pixs.clone();

        let mut global = Histogram::new();
        for band in split.data().chunks(rows_per * stride) {
            global.merge(&local_histogram(band, width, 1).expect("local histogram"));
        }
        let map = EqualizationMap::derive(&global, pixs.pixel_count()).expect("derive");
        for band in split.data_mut().chunks_mut(rows_per * stride) {
            remap_rows(band, width, &map, 2).expect("remap");
        }
        rp.compare_grids(&whole, &split);
    }

    assert!(rp.cleanup(), "equalize_split regression test failed");
}

#[test]
fn equalize_reg_stretches_range() {
    let mut rp = RegParams::new("equalize_stretch");

    // Gray values confined to 100..=131
    let mut pixs = noise_grid(40, 30, 9).expect("noise_grid");
    for px in pixs.data_mut().chunks_exact_mut(3) {
        let v = 100 + px[0] / 8;
        px.fill(v);
    }
    grayscale_rows(pixs.data_mut(), 40, 3).expect("grayscale");
    equalize(&mut pixs).expect("equalize");

    let hist = local_histogram(pixs.data(), 40, 1).expect("histogram");
    let lo = hist.populated().next().unwrap_or(0);
    let hi = hist.populated().last().unwrap_or(0);
    rp.compare_values(0.0, lo as f64, 0.0);
    rp.compare_values(255.0, hi as f64, 0.0);
    rp.compare_values(pixs.pixel_count() as f64, hist.total() as f64, 0.0);

    assert!(rp.cleanup(), "equalize_stretch regression test failed");
}
