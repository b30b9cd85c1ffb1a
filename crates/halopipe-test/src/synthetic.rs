//! Deterministic synthetic test images
//!
//! No image files are checked in. Every regression test builds its
//! input from one of these generators so runs are reproducible.

use crate::TestResult;
use halopipe_core::{CHANNELS, Grid};

/// Simple linear congruential generator for reproducible noise
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u32) -> Self {
        Self {
            state: seed as u64 ^ 0x9e37_79b9_7f4a_7c15,
        }
    }

    fn next_u8(&mut self) -> u8 {
        // LCG parameters from Numerical Recipes
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.state >> 56) as u8
    }
}

/// Uniform random RGB noise.
pub fn noise_grid(width: u32, height: u32, seed: u32) -> TestResult<Grid> {
    let mut grid = Grid::new(width, height)?;
    let mut rng = SimpleRng::new(seed);
    for b in grid.data_mut() {
        *b = rng.next_u8();
    }
    Ok(grid)
}

/// Smooth gradient with a sprinkling of salt-and-pepper impulses.
///
/// About one pixel in `density` is forced to black or white.
pub fn speckled_gradient(width: u32, height: u32, density: u32, seed: u32) -> TestResult<Grid> {
    let mut grid = Grid::new(width, height)?;
    let mut rng = SimpleRng::new(seed);
    let density = density.max(1);
    let x_span = (width - 1).max(1);
    let y_span = (height - 1).max(1);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / x_span) as u8;
            let g = (y * 255 / y_span) as u8;
            let b = ((x + y) % 256) as u8;
            grid.set_rgb(x, y, r, g, b)?;
            if (rng.next_u8() as u32) % density == 0 {
                let v = if rng.next_u8() & 1 == 0 { 0 } else { 255 };
                grid.set_rgb(x, y, v, v, v)?;
            }
        }
    }
    Ok(grid)
}

/// Every pixel set to the same gray value.
pub fn uniform_grid(width: u32, height: u32, value: u8) -> TestResult<Grid> {
    let mut grid = Grid::new(width, height)?;
    grid.fill_rgb(value, value, value);
    Ok(grid)
}

/// Gray image where every value 0..=255 appears exactly `repeat` times.
///
/// The grid is 256 pixels wide and `repeat` rows tall; each row is a
/// ramp from 0 to 255.
pub fn full_range_gray(repeat: u32) -> TestResult<Grid> {
    let mut grid = Grid::new(256, repeat)?;
    for row in grid.data_mut().chunks_exact_mut(256 * CHANNELS) {
        for (v, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
            px.fill(v as u8);
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_reproducible() {
        let a = noise_grid(16, 8, 7).unwrap();
        let b = noise_grid(16, 8, 7).unwrap();
        let c = noise_grid(16, 8, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_full_range_gray() {
        let grid = full_range_gray(2).unwrap();
        assert_eq!(grid.get_rgb(0, 0), Some((0, 0, 0)));
        assert_eq!(grid.get_rgb(255, 1), Some((255, 255, 255)));
    }

    #[test]
    fn test_speckled_gradient_contains_impulses() {
        let grid = speckled_gradient(32, 32, 8, 3).unwrap();
        let impulses = (0..32)
            .flat_map(|y| (0..32).map(move |x| (x, y)))
            .filter(|&(x, y)| matches!(grid.get_rgb(x, y), Some((0, 0, 0)) | Some((255, 255, 255))))
            .count();
        assert!(impulses > 0);
    }
}
