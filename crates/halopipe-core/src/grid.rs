//! Interleaved RGB pixel grid
//!
//! `Grid` is the in-memory image that the coordinator loads, scatters
//! and finally reassembles. Pixels are stored row-major with three
//! interleaved channels in R, G, B order.

use crate::error::{Error, Result};

/// Number of interleaved channels per pixel.
pub const CHANNELS: usize = 3;

/// Allocate a zeroed byte buffer, reporting allocation failure as an error.
///
/// Large grids are allocated through this helper so that an impossible
/// request surfaces as [`Error::AllocationFailed`] instead of aborting
/// the process inside the allocator.
pub fn alloc_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Byte length of `rows` full rows of a grid `width` pixels wide.
#[inline]
pub fn rows_to_bytes(rows: u32, width: u32) -> usize {
    rows as usize * width as usize * CHANNELS
}

/// Rows per chunk when `rows` are split statically across `threads`.
///
/// Every thread gets one contiguous block; the last block may be short.
#[inline]
pub fn static_chunk_rows(rows: usize, threads: usize) -> usize {
    rows.div_ceil(threads.max(1)).max(1)
}

/// A rectangular RGB image with an owned, interleaved byte buffer.
///
/// Invariant: `data.len() == width * height * CHANNELS`.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Grid {
    /// Create a black grid of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        let data = alloc_bytes(rows_to_bytes(height, width))?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap an existing interleaved buffer.
    ///
    /// Fails if the buffer length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = rows_to_bytes(height, width);
        if data.len() != expected {
            return Err(Error::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes per row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// The whole interleaved buffer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the whole interleaved buffer.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the grid and return its buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of row `y`, or `None` if out of range.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.row_stride();
        let start = y as usize * stride;
        Some(&self.data[start..start + stride])
    }

    /// Get the (r, g, b) value at (x, y).
    pub fn get_rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        Some((self.data[idx], self.data[idx + 1], self.data[idx + 2]))
    }

    /// Set the (r, g, b) value at (x, y).
    pub fn set_rgb(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let idx = self.index(x, y);
        self.data[idx] = r;
        self.data[idx + 1] = g;
        self.data[idx + 2] = b;
        Ok(())
    }

    /// Set every pixel to the same color.
    pub fn fill_rgb(&mut self, r: u8, g: u8, b: u8) {
        for px in self.data.chunks_exact_mut(CHANNELS) {
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimension { width, height });
    }
    Ok(())
}
