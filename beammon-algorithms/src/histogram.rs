//! Fixed-width one-dimensional histogram.

/// A 1D histogram with uniform bins over `[low, high)`.
///
/// Values outside the range are counted as under/overflow and do not
/// enter any bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    counts: Vec<u64>,
    low: f64,
    high: f64,
    bin_width: f64,
    underflow: u64,
    overflow: u64,
}

impl Histogram1D {
    /// Create an empty histogram.
    ///
    /// # Arguments
    ///
    /// * `bins` - Number of bins (at least one is used)
    /// * `low` - Lower edge of the first bin
    /// * `high` - Upper edge of the last bin
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(bins: usize, low: f64, high: f64) -> Self {
        let bins = bins.max(1);
        Self {
            counts: vec![0; bins],
            low,
            high,
            bin_width: (high - low) / bins as f64,
            underflow: 0,
            overflow: 0,
        }
    }

    /// Add one entry. Returns the bin index it landed in.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn fill(&mut self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        if value < self.low {
            self.underflow += 1;
            return None;
        }
        if value >= self.high {
            self.overflow += 1;
            return None;
        }
        let bin = (((value - self.low) / self.bin_width) as usize).min(self.counts.len() - 1);
        self.counts[bin] += 1;
        Some(bin)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries() == 0
    }

    /// Number of entries inside the range.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    #[must_use]
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    #[must_use]
    pub fn count(&self, bin: usize) -> Option<u64> {
        self.counts.get(bin).copied()
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.low + (bin as f64 + 0.5) * self.bin_width
    }

    /// Index of the fullest bin; the first one wins ties.
    ///
    /// Returns `None` when the histogram is empty.
    #[must_use]
    pub fn maximum_bin(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (bin, &count) in self.counts.iter().enumerate() {
            if count > 0 && best.map_or(true, |(_, max)| count > max) {
                best = Some((bin, count));
            }
        }
        best.map(|(bin, _)| bin)
    }

    /// `(center, count)` pairs for every bin.
    pub fn points(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(bin, &count)| (self.bin_center(bin), count))
    }
}
