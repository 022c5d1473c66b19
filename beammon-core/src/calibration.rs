//! Timing calibration configuration and tables.
#![allow(clippy::doc_markdown)]

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, ConfigLoadError};
use crate::hit::ChannelKey;
use crate::layout::ReferenceChannelGroup;

/// Open time interval `(low, high)` in ns.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeWindow {
    pub low: f64,
    pub high: f64,
}

impl TimeWindow {
    #[must_use]
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Returns true if `time` lies strictly inside the window.
    #[inline]
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        time > self.low && time < self.high
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Parameters of the per-run timing calibration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalibrationConfig {
    /// Number of leading events used to build the calibration.
    pub sample_size: usize,
    /// Acceptance window for reference-channel hit times. The default suits
    /// the hit-PMT T0 readout; see [`crate::layout`].
    pub window: TimeWindow,
    /// Number of histogram bins across the window.
    pub bins: usize,
    /// Initial Gaussian width (ns).
    pub seed_sigma: f64,
    /// Half-width of the fit range around the peak bin (ns).
    pub fit_half_width: f64,
    /// Iteration cap for the least-squares fit.
    pub max_iterations: usize,
    /// Relative chi-square change below which the fit is converged.
    pub tolerance: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sample_size: 5000,
            window: TimeWindow::new(2150.0, 2250.0),
            bins: 200,
            seed_sigma: 4.0,
            fit_half_width: 8.0,
            max_iterations: 200,
            tolerance: 1e-9,
        }
    }
}

impl CalibrationConfig {
    /// Sets the calibration sample size.
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Sets the acceptance window.
    #[must_use]
    pub fn with_window(mut self, low: f64, high: f64) -> Self {
        self.window = TimeWindow::new(low, high);
        self
    }

    /// Sets the histogram binning.
    #[must_use]
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    /// Sets the seed width of the fit.
    #[must_use]
    pub fn with_seed_sigma(mut self, sigma: f64) -> Self {
        self.seed_sigma = sigma;
        self
    }

    /// Sets the half-width of the fit range.
    #[must_use]
    pub fn with_fit_half_width(mut self, half_width: f64) -> Self {
        self.fit_half_width = half_width;
        self
    }

    /// Rejects parameter combinations that cannot produce a calibration.
    ///
    /// # Errors
    /// Returns [`ConfigLoadError::InvalidParameter`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let invalid = |name: &'static str, reason: String| {
            Err(ConfigLoadError::InvalidParameter { name, reason })
        };
        if self.sample_size == 0 {
            return invalid("sample_size", "must be at least one event".to_string());
        }
        let TimeWindow { low, high } = self.window;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return invalid("window", format!("({low}, {high}) is empty or not finite"));
        }
        if self.bins == 0 {
            return invalid("bins", "must be at least one".to_string());
        }
        if !(self.seed_sigma.is_finite() && self.seed_sigma > 0.0) {
            return invalid("seed_sigma", format!("must be positive, got {}", self.seed_sigma));
        }
        if !(self.fit_half_width.is_finite() && self.fit_half_width > 0.0) {
            return invalid(
                "fit_half_width",
                format!("must be positive, got {}", self.fit_half_width),
            );
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations", "must be at least one".to_string());
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid("tolerance", format!("must be positive, got {}", self.tolerance));
        }
        Ok(())
    }
}

/// Fitted timing reference of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationEntry {
    /// Fitted Gaussian mean (ns).
    pub mean: f64,
    /// Fitted Gaussian width (ns), always positive inside a table.
    pub sigma: f64,
    /// Fitted peak amplitude (counts per bin).
    pub amplitude: f64,
    /// Hits histogrammed for this channel.
    pub samples: usize,
    /// Iterations the fit needed.
    pub iterations: usize,
}

impl CalibrationEntry {
    /// Returns true if `time` is within `n_sigma` widths of the mean.
    #[inline]
    #[must_use]
    pub fn accepts(&self, time: f64, n_sigma: f64) -> bool {
        (time - self.mean).abs() < n_sigma * self.sigma
    }
}

/// Immutable per-run mapping from reference channel to its calibration.
///
/// A table can only be built through [`CalibrationTable::from_entries`],
/// which refuses entries with a non-positive or non-finite width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    entries: BTreeMap<ChannelKey, CalibrationEntry>,
}

impl CalibrationTable {
    /// Builds a table, validating every entry.
    ///
    /// # Errors
    /// Returns [`CalibrationError::InvalidSigma`] for the first entry whose
    /// sigma is not a positive finite number or whose mean is not finite.
    pub fn from_entries<I>(entries: I) -> Result<Self, CalibrationError>
    where
        I: IntoIterator<Item = (ChannelKey, CalibrationEntry)>,
    {
        let mut table = BTreeMap::new();
        for (key, entry) in entries {
            if !(entry.sigma.is_finite() && entry.sigma > 0.0 && entry.mean.is_finite()) {
                return Err(CalibrationError::InvalidSigma {
                    module: key.module,
                    channel: key.channel,
                    sigma: entry.sigma,
                });
            }
            table.insert(key, entry);
        }
        Ok(Self { entries: table })
    }

    /// Combines two tables; entries of `other` replace duplicates.
    #[must_use]
    pub fn merge(mut self, other: CalibrationTable) -> Self {
        self.entries.extend(other.entries);
        self
    }

    #[must_use]
    pub fn get(&self, key: ChannelKey) -> Option<&CalibrationEntry> {
        self.entries.get(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (&ChannelKey, &CalibrationEntry)> {
        self.entries.iter()
    }

    /// Checks that every channel of `group` has an entry.
    ///
    /// # Errors
    /// Returns [`CalibrationError::MissingChannel`] for the first uncovered channel.
    pub fn covers(&self, group: &ReferenceChannelGroup) -> Result<(), CalibrationError> {
        match group.keys().find(|key| !self.entries.contains_key(key)) {
            Some(key) => Err(CalibrationError::MissingChannel {
                module: key.module,
                channel: key.channel,
            }),
            None => Ok(()),
        }
    }
}
