//! halopipe-test - Regression test framework for halopipe
//!
//! Every `tests/*_reg.rs` file follows the same shape:
//!
//! ```ignore
//! use halopipe_test::RegParams;
//!
//! let mut rp = RegParams::new("invariance");
//! rp.compare_grids(&reference, &distributed);
//! assert!(rp.cleanup());
//! ```
//!
//! Inputs come from the deterministic generators in [`synthetic`].
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "display" to write intermediate grids as
//!   BMP files under `tests/regout`

mod error;
mod params;
pub mod synthetic;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};
pub use synthetic::{full_range_gray, noise_grid, speckled_gradient, uniform_grid};

/// Get the path to the workspace root
fn workspace_root() -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    // halopipe-test is at crates/halopipe-test, so go up two directories
    format!("{}/../..", manifest_dir)
}

/// Get the path to the regout (regression output) directory
pub fn regout_dir() -> String {
    format!("{}/tests/regout", workspace_root())
}
