//! halopipe-io - Bitmap I/O for the halopipe pipeline
//!
//! Decodes and encodes uncompressed 24-bit BMP files. Only the
//! coordinator touches files; workers only ever see grid slices.

pub mod bmp;
mod error;

pub use bmp::{Bitmap, BmpHeader, RowOrder, padded_row_size, read_bmp, write_bmp};
pub use error::{IoError, IoResult};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Read a BMP image from a file path.
pub fn read_image<P: AsRef<Path>>(path: P) -> IoResult<Bitmap> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let bitmap = read_bmp(BufReader::new(file))?;
    log::info!(
        "loaded {} ({}x{})",
        path.display(),
        bitmap.grid.width(),
        bitmap.grid.height()
    );
    Ok(bitmap)
}

/// Write a BMP image to a file path.
pub fn write_image<P: AsRef<Path>>(path: P, bitmap: &Bitmap) -> IoResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_bmp(bitmap, BufWriter::new(file))?;
    log::info!("saved {}", path.display());
    Ok(())
}
