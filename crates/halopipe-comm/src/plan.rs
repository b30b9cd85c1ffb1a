//! Byte-level scatter/gather descriptors
//!
//! Turns a partition table into the counts and offsets used by the
//! irregular scatter and gather collectives. All values are in bytes:
//! rows x width x channels.
//!
//! Scatter ranges include the halo, so neighbouring ranges overlap by
//! up to `2 * radius` rows. Gather ranges carry owned rows only and
//! tile the full buffer exactly once.

use crate::partition::Partition;
use crate::{CommError, CommResult};
use halopipe_core::rows_to_bytes;
use std::ops::Range;

/// Scatter and gather descriptors for one group, built by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    scatter_counts: Vec<usize>,
    scatter_offsets: Vec<usize>,
    gather_counts: Vec<usize>,
    gather_offsets: Vec<usize>,
}

impl DistributionPlan {
    /// Build the plan for a grid `width` pixels wide.
    pub fn build(partitions: &[Partition], width: u32) -> Self {
        let n = partitions.len();
        let mut plan = Self {
            scatter_counts: Vec::with_capacity(n),
            scatter_offsets: Vec::with_capacity(n),
            gather_counts: Vec::with_capacity(n),
            gather_offsets: Vec::with_capacity(n),
        };
        for p in partitions {
            plan.scatter_counts
                .push(rows_to_bytes(p.input_row_count, width));
            plan.scatter_offsets
                .push(rows_to_bytes(p.input_row_start, width));
            plan.gather_counts
                .push(rows_to_bytes(p.output_row_count, width));
            plan.gather_offsets
                .push(rows_to_bytes(p.output_row_start, width));
        }
        plan
    }

    /// Number of workers the plan was built for.
    pub fn workers(&self) -> usize {
        self.scatter_counts.len()
    }

    pub fn scatter_counts(&self) -> &[usize] {
        &self.scatter_counts
    }

    pub fn scatter_offsets(&self) -> &[usize] {
        &self.scatter_offsets
    }

    pub fn gather_counts(&self) -> &[usize] {
        &self.gather_counts
    }

    pub fn gather_offsets(&self) -> &[usize] {
        &self.gather_offsets
    }

    /// Byte range of the full buffer sent to `rank`.
    pub fn scatter_range(&self, rank: usize) -> Range<usize> {
        let start = self.scatter_offsets[rank];
        start..start + self.scatter_counts[rank]
    }

    /// Byte range of the full buffer received from `rank`.
    pub fn gather_range(&self, rank: usize) -> Range<usize> {
        let start = self.gather_offsets[rank];
        start..start + self.gather_counts[rank]
    }

    /// Check the plan against a full buffer of `total_len` bytes.
    ///
    /// Every scatter range must lie inside the buffer, and the gather
    /// ranges taken in rank order must cover it without gap or overlap.
    pub fn validate(&self, total_len: usize) -> CommResult<()> {
        let mut next = 0usize;
        for rank in 0..self.workers() {
            let scatter = self.scatter_range(rank);
            if scatter.end > total_len {
                return Err(CommError::InvalidPlan(format!(
                    "scatter range {:?} of rank {} exceeds {} bytes",
                    scatter, rank, total_len
                )));
            }

            let gather = self.gather_range(rank);
            if gather.is_empty() {
                continue;
            }
            if gather.start != next {
                return Err(CommError::InvalidPlan(format!(
                    "gather range {:?} of rank {} does not start at byte {}",
                    gather, rank, next
                )));
            }
            if gather.start < scatter.start || gather.end > scatter.end {
                return Err(CommError::InvalidPlan(format!(
                    "rank {} owns bytes {:?} it does not receive",
                    rank, gather
                )));
            }
            next = gather.end;
        }
        if next != total_len {
            return Err(CommError::InvalidPlan(format!(
                "gather ranges cover {} of {} bytes",
                next, total_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition_rows;
    use halopipe_core::CHANNELS;

    #[test]
    fn test_counts_and_offsets() {
        // 10 rows over 3 workers, radius 1, width 4 -> 12 bytes per row
        let parts = partition_rows(10, 3, 1).unwrap();
        let plan = DistributionPlan::build(&parts, 4);
        let row = 4 * CHANNELS;

        assert_eq!(plan.gather_counts(), &[4 * row, 3 * row, 3 * row]);
        assert_eq!(plan.gather_offsets(), &[0, 4 * row, 7 * row]);
        assert_eq!(plan.scatter_counts(), &[5 * row, 5 * row, 4 * row]);
        assert_eq!(plan.scatter_offsets(), &[0, 3 * row, 6 * row]);
        plan.validate(10 * row).unwrap();
    }

    #[test]
    fn test_scatter_ranges_overlap_by_two_radius() {
        let parts = partition_rows(30, 3, 2).unwrap();
        let plan = DistributionPlan::build(&parts, 5);
        let row = 5 * CHANNELS;
        let a = plan.scatter_range(0);
        let b = plan.scatter_range(1);
        assert_eq!(a.end - b.start, 4 * row);
    }

    #[test]
    fn test_gather_ranges_tile_buffer() {
        for workers in 1..=9 {
            let parts = partition_rows(17, workers, 2).unwrap();
            let plan = DistributionPlan::build(&parts, 3);
            let total: usize = plan.gather_counts().iter().sum();
            assert_eq!(total, 17 * 3 * CHANNELS);
            plan.validate(total).unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_wrong_buffer() {
        let parts = partition_rows(8, 2, 1).unwrap();
        let plan = DistributionPlan::build(&parts, 2);
        let total = 8 * 2 * CHANNELS;
        assert!(plan.validate(total - 1).is_err());
        assert!(plan.validate(total + 6).is_err());
    }
}
