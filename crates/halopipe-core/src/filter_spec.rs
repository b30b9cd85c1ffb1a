//! Square filter window specification

use crate::error::{Error, Result};

/// A square `size x size` window with odd `size`.
///
/// The radius `(size - 1) / 2` drives both the halo height used by
/// the partitioner and the border band the rank filter leaves
/// untouched, so it has to be an exact integer. Even sizes are
/// bumped to the next odd value on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterSpec {
    size: u32,
    requested: u32,
}

impl FilterSpec {
    /// Build a window from a requested size, coercing even sizes upward.
    pub fn new(requested: u32) -> Result<Self> {
        if requested == 0 {
            return Err(Error::InvalidParameter(
                "filter size must be >= 1".to_string(),
            ));
        }
        let size = if requested % 2 == 0 {
            requested
                .checked_add(1)
                .ok_or_else(|| Error::InvalidParameter("filter size too large".to_string()))?
        } else {
            requested
        };
        Ok(Self { size, requested })
    }

    /// Window side length (always odd).
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Half-width of the window.
    #[inline]
    pub fn radius(&self) -> u32 {
        (self.size - 1) / 2
    }

    /// Number of samples in the window.
    #[inline]
    pub fn area(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Size the caller asked for before odd coercion.
    #[inline]
    pub fn requested(&self) -> u32 {
        self.requested
    }

    /// Whether the requested size was even and got bumped.
    #[inline]
    pub fn was_coerced(&self) -> bool {
        self.size != self.requested
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            size: 3,
            requested: 3,
        }
    }
}
