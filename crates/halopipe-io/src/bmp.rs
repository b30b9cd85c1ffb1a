//! BMP image format support
//!
//! Reads and writes uncompressed 24-bit Windows Bitmap files.
//!
//! Stored rows are padded to a 4-byte boundary. A positive height in
//! the info header means the rows are stored bottom-up, a negative one
//! means top-down. Decoding always produces a grid whose row 0 is the
//! top of the picture, and the storage order is remembered in
//! [`BmpHeader`] so that encoding writes the file back the same way.

use crate::{IoError, IoResult};
use halopipe_core::{CHANNELS, Grid, color};
use std::io::{Read, Write};

/// BMP file header size
const BMP_FILE_HEADER_SIZE: usize = 14;

/// BMP info header size (BITMAPINFOHEADER)
const BMP_INFO_HEADER_SIZE: u32 = 40;

/// The only supported bit depth
const BMP_BITS_PER_PIXEL: u16 = 24;

/// BI_RGB (no compression)
const BMP_COMPRESSION_NONE: u32 = 0;

/// Order in which rows are stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    /// Positive stored height; last picture row comes first.
    #[default]
    BottomUp,
    /// Negative stored height; first picture row comes first.
    TopDown,
}

/// Header fields that are not derived from the pixel data.
///
/// Sizes, offsets and padding are recomputed on encode; everything
/// else is carried through so a canonical file round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BmpHeader {
    /// The two reserved words of the file header
    pub reserved: [u8; 4],
    /// Horizontal resolution
    pub x_pels_per_meter: i32,
    /// Vertical resolution
    pub y_pels_per_meter: i32,
    /// Palette entries used (0 for 24 bpp)
    pub colors_used: u32,
    /// Important palette entries
    pub colors_important: u32,
    /// Stored row order
    pub row_order: RowOrder,
}

/// A decoded bitmap: the pixel grid plus the header fields needed to
/// write it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub grid: Grid,
    pub header: BmpHeader,
}

impl Bitmap {
    /// Wrap a grid with a default (bottom-up, zero resolution) header.
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            header: BmpHeader::default(),
        }
    }

    /// Replace the grid, keeping the header.
    pub fn with_grid(&self, grid: Grid) -> Self {
        Self {
            grid,
            header: self.header,
        }
    }
}

/// Bytes per stored row, including padding to a 4-byte boundary.
#[inline]
pub fn padded_row_size(width: u32) -> usize {
    (width as usize * BMP_BITS_PER_PIXEL as usize).div_ceil(32) * 4
}

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn le_i32(buf: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Read a 24-bit uncompressed BMP image
pub fn read_bmp<R: Read>(mut reader: R) -> IoResult<Bitmap> {
    // Read file header (14 bytes)
    let mut file_header = [0u8; BMP_FILE_HEADER_SIZE];
    reader.read_exact(&mut file_header)?;

    // Verify magic number
    if &file_header[0..2] != b"BM" {
        return Err(IoError::InvalidData("not a BMP file".to_string()));
    }

    let reserved = [
        file_header[6],
        file_header[7],
        file_header[8],
        file_header[9],
    ];
    let pixel_offset = le_u32(&file_header, 10) as usize;

    // Read info header (minimum 40 bytes)
    let mut info_header = [0u8; BMP_INFO_HEADER_SIZE as usize];
    reader.read_exact(&mut info_header)?;

    let header_size = le_u32(&info_header, 0);
    if header_size < BMP_INFO_HEADER_SIZE {
        return Err(IoError::InvalidData(format!(
            "unsupported BMP header size: {}",
            header_size
        )));
    }

    let width = le_i32(&info_header, 4);
    let height = le_i32(&info_header, 8);

    let planes = le_u16(&info_header, 12);
    if planes != 1 {
        return Err(IoError::UnsupportedFormat(format!(
            "unsupported number of planes: {}",
            planes
        )));
    }

    let bits_per_pixel = le_u16(&info_header, 14);
    if bits_per_pixel != BMP_BITS_PER_PIXEL {
        return Err(IoError::UnsupportedFormat(format!(
            "unsupported BMP bit depth: {} (only 24 bpp is supported)",
            bits_per_pixel
        )));
    }

    let compression = le_u32(&info_header, 16);
    if compression != BMP_COMPRESSION_NONE {
        return Err(IoError::UnsupportedFormat(format!(
            "unsupported BMP compression: {}",
            compression
        )));
    }

    if width <= 0 || height == 0 || height == i32::MIN {
        return Err(IoError::InvalidData(format!(
            "invalid BMP dimensions: {}x{}",
            width, height
        )));
    }

    let header = BmpHeader {
        reserved,
        x_pels_per_meter: le_i32(&info_header, 24),
        y_pels_per_meter: le_i32(&info_header, 28),
        colors_used: le_u32(&info_header, 32),
        colors_important: le_u32(&info_header, 36),
        row_order: if height < 0 {
            RowOrder::TopDown
        } else {
            RowOrder::BottomUp
        },
    };
    let width = width.unsigned_abs();
    let height = height.unsigned_abs();

    // Skip any extended header and gap up to the pixel data
    let current_pos = BMP_FILE_HEADER_SIZE + BMP_INFO_HEADER_SIZE as usize;
    if pixel_offset < current_pos {
        return Err(IoError::InvalidData(format!(
            "pixel data offset {} overlaps the headers",
            pixel_offset
        )));
    }
    let skip_bytes = (pixel_offset - current_pos) as u64;
    if skip_bytes > 0 {
        let skipped = std::io::copy(&mut (&mut reader).take(skip_bytes), &mut std::io::sink())?;
        if skipped != skip_bytes {
            return Err(IoError::InvalidData(
                "truncated before pixel data".to_string(),
            ));
        }
    }

    let mut grid = Grid::new(width, height)?;
    let stride = grid.row_stride();
    let mut row_buffer = vec![0u8; padded_row_size(width)];

    // Read pixel data
    for row in 0..height {
        reader.read_exact(&mut row_buffer)?;

        let y = match header.row_order {
            RowOrder::TopDown => row,
            RowOrder::BottomUp => height - 1 - row,
        };
        let start = y as usize * stride;
        let dst = &mut grid.data_mut()[start..start + stride];
        for (px, bgr) in dst
            .chunks_exact_mut(CHANNELS)
            .zip(row_buffer.chunks_exact(CHANNELS))
        {
            px[color::RED] = bgr[2];
            px[color::GREEN] = bgr[1];
            px[color::BLUE] = bgr[0];
        }
    }

    log::debug!(
        "decoded {}x{} BMP ({:?}, offset {})",
        width,
        height,
        header.row_order,
        pixel_offset
    );
    Ok(Bitmap { grid, header })
}

/// Write a 24-bit uncompressed BMP image
pub fn write_bmp<W: Write>(bitmap: &Bitmap, mut writer: W) -> IoResult<()> {
    let grid = &bitmap.grid;
    let header = &bitmap.header;
    let width = grid.width();
    let height = grid.height();

    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(IoError::InvalidData(format!(
            "grid too large for BMP: {}x{}",
            width, height
        )));
    }

    // Calculate sizes
    let row_size = padded_row_size(width);
    let pixel_data_size = row_size * height as usize;
    let pixel_offset = BMP_FILE_HEADER_SIZE + BMP_INFO_HEADER_SIZE as usize;
    let file_size = pixel_offset + pixel_data_size;
    let file_size = u32::try_from(file_size)
        .map_err(|_| IoError::InvalidData(format!("BMP file too large: {} bytes", file_size)))?;

    let stored_height = match header.row_order {
        RowOrder::BottomUp => height as i32,
        RowOrder::TopDown => -(height as i32),
    };

    // Write file header
    writer.write_all(b"BM")?;
    writer.write_all(&file_size.to_le_bytes())?;
    writer.write_all(&header.reserved)?;
    writer.write_all(&(pixel_offset as u32).to_le_bytes())?;

    // Write info header
    writer.write_all(&BMP_INFO_HEADER_SIZE.to_le_bytes())?;
    writer.write_all(&(width as i32).to_le_bytes())?;
    writer.write_all(&stored_height.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?; // Planes
    writer.write_all(&BMP_BITS_PER_PIXEL.to_le_bytes())?;
    writer.write_all(&BMP_COMPRESSION_NONE.to_le_bytes())?;
    writer.write_all(&(pixel_data_size as u32).to_le_bytes())?;
    writer.write_all(&header.x_pels_per_meter.to_le_bytes())?;
    writer.write_all(&header.y_pels_per_meter.to_le_bytes())?;
    writer.write_all(&header.colors_used.to_le_bytes())?;
    writer.write_all(&header.colors_important.to_le_bytes())?;

    // Padding bytes stay zero for every row
    let mut row_buffer = vec![0u8; row_size];

    for row in 0..height {
        let y = match header.row_order {
            RowOrder::TopDown => row,
            RowOrder::BottomUp => height - 1 - row,
        };
        let src = grid
            .row(y)
            .ok_or_else(|| IoError::InvalidData(format!("missing row {}", y)))?;
        for (bgr, px) in row_buffer
            .chunks_exact_mut(CHANNELS)
            .zip(src.chunks_exact(CHANNELS))
        {
            bgr[0] = px[color::BLUE];
            bgr[1] = px[color::GREEN];
            bgr[2] = px[color::RED];
        }

        writer.write_all(&row_buffer)?;
    }

    writer.flush()?;
    Ok(())
}
