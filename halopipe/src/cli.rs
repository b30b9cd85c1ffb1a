//! Shared plumbing for the command-line binaries

use crate::io::{Bitmap, BmpHeader, read_image, write_image};
use crate::pipeline::{PipelineError, PipelineResult};
use crate::{FilterSpec, Grid};
use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::Path;

/// Input image used when none is given
pub const DEFAULT_INPUT: &str = "bitmaps/small.bmp";
/// Output of the distributed binary
pub const DEFAULT_DIST_OUTPUT: &str = "output_dist.bmp";
/// Output of the shared-memory binary
pub const DEFAULT_SHARED_OUTPUT: &str = "output_shared.bmp";

/// Install the `RUST_LOG`-controlled logger, defaulting to `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Parse arguments, exiting with status 1 on a usage error.
///
/// `--help` and `--version` still exit with status 0.
pub fn parse_or_exit<P: Parser>() -> P {
    match P::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

/// Build the window, rejecting size 0.
pub fn filter_spec(requested: u32) -> Result<FilterSpec> {
    FilterSpec::new(requested).with_context(|| format!("invalid filter size {}", requested))
}

/// Number of hardware threads, or 1 if unknown.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Read the input bitmap, remembering its header in `header`.
///
/// Failures become [`PipelineError::InputUnavailable`] so the
/// distributed driver can abort the group with them.
pub fn load_input(path: &Path, header: &Mutex<BmpHeader>) -> PipelineResult<Grid> {
    let bitmap = read_image(path).map_err(|e| {
        PipelineError::InputUnavailable(format!("cannot read '{}': {}", path.display(), e))
    })?;
    *header.lock() = bitmap.header;
    Ok(bitmap.grid)
}

/// Write the output grid with the input's header fields.
pub fn save_output(path: &Path, grid: Grid, header: BmpHeader) -> Result<()> {
    let bitmap = Bitmap { grid, header };
    write_image(path, &bitmap).with_context(|| format!("cannot write '{}'", path.display()))
}
