//! Timing summary of a run

use std::fmt;
use std::time::Duration;

/// Time spent in each stage, as seen by the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Median filter
    pub filter: Duration,
    /// Luminance conversion
    pub grayscale: Duration,
    /// Local histogram, map derivation and remap
    pub equalize: Duration,
    /// Broadcast, scatter, reduction and gather
    pub communication: Duration,
}

/// Summary returned by every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub workers: usize,
    pub threads_per_worker: usize,
    pub filter_size: u32,
    pub width: u32,
    pub height: u32,
    /// Wall-clock time between the opening and closing barriers
    pub elapsed: Duration,
    pub stages: StageTimings,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} worker(s) x {} thread(s), filter {}x{}, image {}x{}",
            self.workers,
            self.threads_per_worker,
            self.filter_size,
            self.filter_size,
            self.width,
            self.height
        )?;
        writeln!(
            f,
            "  filter {:.6} s, grayscale {:.6} s, equalize {:.6} s, communication {:.6} s",
            self.stages.filter.as_secs_f64(),
            self.stages.grayscale.as_secs_f64(),
            self.stages.equalize.as_secs_f64(),
            self.stages.communication.as_secs_f64()
        )?;
        write!(f, "Total time: {:.6} s", self.elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_totals() {
        let report = RunReport {
            workers: 4,
            threads_per_worker: 2,
            filter_size: 5,
            width: 640,
            height: 480,
            elapsed: Duration::from_millis(1500),
            stages: StageTimings::default(),
        };
        let text = report.to_string();
        assert!(text.starts_with("4 worker(s) x 2 thread(s), filter 5x5"));
        assert!(text.ends_with("Total time: 1.500000 s"));
    }
}
