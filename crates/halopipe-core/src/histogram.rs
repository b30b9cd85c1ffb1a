//! Fixed-size intensity histogram
//!
//! A 256-bin count array. Local histograms are built by one worker;
//! the global histogram is the element-wise sum of every local one.
//! Summation is exact integer addition, so the merge order never
//! affects the result.

/// Number of intensity bins.
pub const HISTOGRAM_BINS: usize = 256;

/// 256-entry intensity histogram with `u64` counts.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Histogram {
    counts: [u64; HISTOGRAM_BINS],
}

impl Histogram {
    /// An empty histogram.
    pub const fn new() -> Self {
        Self {
            counts: [0; HISTOGRAM_BINS],
        }
    }

    /// Build a histogram from raw counts.
    pub const fn from_counts(counts: [u64; HISTOGRAM_BINS]) -> Self {
        Self { counts }
    }

    /// Count one occurrence of `value`.
    #[inline]
    pub fn add(&mut self, value: u8) {
        self.counts[value as usize] += 1;
    }

    /// Count of `value`.
    #[inline]
    pub fn get(&self, value: u8) -> u64 {
        self.counts[value as usize]
    }

    /// All bins.
    #[inline]
    pub fn counts(&self) -> &[u64; HISTOGRAM_BINS] {
        &self.counts
    }

    /// Sum of all bins.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Add `other` into `self`, bin by bin.
    pub fn merge(&mut self, other: &Histogram) {
        for (dst, src) in self.counts.iter_mut().zip(other.counts.iter()) {
            *dst += *src;
        }
    }

    /// Values with a non-zero count, in increasing order.
    pub fn populated(&self) -> impl Iterator<Item = u8> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(v, _)| v as u8)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let populated: Vec<(u8, u64)> = self.populated().map(|v| (v, self.get(v))).collect();
        f.debug_struct("Histogram")
            .field("total", &self.total())
            .field("populated", &populated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_total() {
        let mut h = Histogram::new();
        h.add(0);
        h.add(255);
        h.add(255);
        assert_eq!(h.get(0), 1);
        assert_eq!(h.get(255), 2);
        assert_eq!(h.total(), 3);
        assert_eq!(h.populated().collect::<Vec<_>>(), vec![0, 255]);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut a = Histogram::new();
        let mut b = Histogram::new();
        let mut c = Histogram::new();
        for v in 0..=200u8 {
            a.add(v);
            b.add(v / 2);
            c.add(255 - v);
        }

        let mut abc = a;
        abc.merge(&b);
        abc.merge(&c);

        let mut cba = c;
        cba.merge(&b);
        cba.merge(&a);

        assert_eq!(abc, cba);
        assert_eq!(abc.total(), a.total() + b.total() + c.total());
    }
}
