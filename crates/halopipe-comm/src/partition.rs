//! Row-balanced partitioning with halo extension
//!
//! Splits `height` rows across `workers` participants. Each worker owns
//! a contiguous block of output rows; the first `height % workers`
//! workers get one extra row. The input block is the output block
//! extended by `radius` rows on each side, clamped to the image, so
//! that a window filter can run without reading rows held elsewhere.
//!
//! Every worker can rebuild the whole table from the broadcast height,
//! the group size and the filter radius. Nothing here is ever sent.

use crate::{CommError, CommResult};

/// Row ranges assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Partition {
    /// First owned output row (global)
    pub output_row_start: u32,
    /// Number of owned output rows
    pub output_row_count: u32,
    /// First input row including halo (global)
    pub input_row_start: u32,
    /// Number of input rows including halo
    pub input_row_count: u32,
}

impl Partition {
    /// One past the last owned output row.
    #[inline]
    pub fn output_row_end(&self) -> u32 {
        self.output_row_start + self.output_row_count
    }

    /// One past the last input row.
    #[inline]
    pub fn input_row_end(&self) -> u32 {
        self.input_row_start + self.input_row_count
    }

    /// Whether this worker owns no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.output_row_count == 0
    }

    /// Halo rows received above the owned block.
    #[inline]
    pub fn halo_above(&self) -> u32 {
        self.output_row_start - self.input_row_start
    }

    /// Halo rows received below the owned block.
    #[inline]
    pub fn halo_below(&self) -> u32 {
        self.input_row_end() - self.output_row_end()
    }
}

fn check_group(height: u32, workers: usize) -> CommResult<()> {
    if height == 0 {
        return Err(CommError::InvalidGroup("grid height must be > 0".into()));
    }
    if workers == 0 {
        return Err(CommError::InvalidGroup("worker count must be > 0".into()));
    }
    if u32::try_from(workers).is_err() {
        return Err(CommError::InvalidGroup(format!(
            "worker count {} too large",
            workers
        )));
    }
    Ok(())
}

/// Compute the partition of one worker without building the full table.
///
/// A worker that owns no rows gets an empty input range at its output
/// start, not the clamped `H - r .. H` halo the general formula would give.
pub fn partition_for(height: u32, workers: usize, radius: u32, rank: usize) -> CommResult<Partition> {
    check_group(height, workers)?;
    if rank >= workers {
        return Err(CommError::InvalidGroup(format!(
            "rank {} outside group of {}",
            rank, workers
        )));
    }

    let p = workers as u64;
    let i = rank as u64;
    let h = height as u64;
    let base = h / p;
    let remainder = h % p;

    let output_row_count = base + u64::from(i < remainder);
    let output_row_start = i * base + i.min(remainder);

    // Workers with nothing to compute take part with zero-length ranges
    if output_row_count == 0 {
        return Ok(Partition {
            output_row_start: output_row_start as u32,
            output_row_count: 0,
            input_row_start: output_row_start as u32,
            input_row_count: 0,
        });
    }

    let r = radius as u64;
    let input_row_start = output_row_start.saturating_sub(r);
    let input_row_end = (output_row_start + output_row_count + r).min(h);

    Ok(Partition {
        output_row_start: output_row_start as u32,
        output_row_count: output_row_count as u32,
        input_row_start: input_row_start as u32,
        input_row_count: (input_row_end - input_row_start) as u32,
    })
}

/// Compute the partition table for the whole group.
///
/// # Arguments
///
/// * `height` - Total grid rows; must be > 0
/// * `workers` - Group size; must be > 0
/// * `radius` - Filter radius; rows of halo on each side
pub fn partition_rows(height: u32, workers: usize, radius: u32) -> CommResult<Vec<Partition>> {
    check_group(height, workers)?;
    if workers > height as usize {
        log::warn!(
            "{} workers for {} rows: {} workers will own no rows",
            workers,
            height,
            workers - height as usize
        );
    }
    (0..workers)
        .map(|rank| partition_for(height, workers, radius, rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_split_front_loads_remainder() {
        let parts = partition_rows(10, 3, 0).unwrap();
        let counts: Vec<u32> = parts.iter().map(|p| p.output_row_count).collect();
        let starts: Vec<u32> = parts.iter().map(|p| p.output_row_start).collect();
        assert_eq!(counts, vec![4, 3, 3]);
        assert_eq!(starts, vec![0, 4, 7]);
    }

    #[test]
    fn test_completeness_many_shapes() {
        for height in 1..=40u32 {
            for workers in 1..=12usize {
                let parts = partition_rows(height, workers, 1).unwrap();
                let mut next = 0u32;
                let mut total = 0u32;
                for p in &parts {
                    if p.is_empty() {
                        continue;
                    }
                    // Contiguous, no gap and no overlap
                    assert_eq!(p.output_row_start, next, "h={} p={}", height, workers);
                    next = p.output_row_end();
                    total += p.output_row_count;
                }
                assert_eq!(next, height);
                assert_eq!(total, height);
            }
        }
    }

    #[test]
    fn test_halo_clamped_and_contains_output() {
        for height in 1..=30u32 {
            for workers in 1..=8usize {
                for radius in 0..=4u32 {
                    for p in partition_rows(height, workers, radius).unwrap() {
                        assert!(p.input_row_start <= p.output_row_start);
                        assert!(p.input_row_end() >= p.output_row_end());
                        assert!(p.input_row_end() <= height);
                        if !p.is_empty() {
                            let want_start = p.output_row_start.saturating_sub(radius);
                            let want_end = (p.output_row_end() + radius).min(height);
                            assert_eq!(p.input_row_start, want_start);
                            assert_eq!(p.input_row_end(), want_end);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_halo_covers_every_window_row() {
        for height in 1..=25u32 {
            for workers in 1..=7usize {
                for radius in 0..=3u32 {
                    for p in partition_rows(height, workers, radius).unwrap() {
                        for gy in p.output_row_start..p.output_row_end() {
                            let interior = gy >= radius && gy + radius < height;
                            let (lo, hi) = if interior {
                                (gy - radius, gy + radius)
                            } else {
                                (gy, gy)
                            };
                            assert!(lo >= p.input_row_start && hi < p.input_row_end());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_more_workers_than_rows() {
        let parts = partition_rows(3, 5, 2).unwrap();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[3].output_row_count, 0);
        assert_eq!(parts[3].input_row_count, 0);
        assert_eq!(parts[4].output_row_start, 3);
        assert_eq!(parts[0].input_row_count, 3);
    }

    #[test]
    fn test_partition_for_matches_table() {
        let table = partition_rows(101, 7, 3).unwrap();
        for (rank, p) in table.iter().enumerate() {
            assert_eq!(partition_for(101, 7, 3, rank).unwrap(), *p);
        }
        assert!(partition_for(101, 7, 3, 7).is_err());
    }

    #[test]
    fn test_invalid_group() {
        assert!(partition_rows(0, 2, 1).is_err());
        assert!(partition_rows(10, 0, 1).is_err());
    }
}
