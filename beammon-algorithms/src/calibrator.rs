//! Per-run timing calibration of the reference channels.
//!
//! For every channel of a reference group the hit times inside the
//! acceptance window are histogrammed, a Gaussian is seeded at the fullest
//! bin and fitted over a narrow range around it. The fitted mean and width
//! become the channel's [`CalibrationEntry`].

use beammon_core::calibration::{CalibrationConfig, CalibrationEntry, CalibrationTable, TimeWindow};
use beammon_core::error::CalibrationError;
use beammon_core::hit::{ChannelKey, Event};
use beammon_core::layout::{DetectorLayout, ReferenceChannelGroup, REFERENCE_GROUP_SIZE};
use log::{debug, info};

use crate::fit::{fit_gaussian, FitError, FitOptions, GaussianParams, MIN_POPULATED_BINS};
use crate::histogram::Histogram1D;

/// Builds calibration tables from a leading sample of events.
#[derive(Debug, Clone, Default)]
pub struct TimingCalibrator {
    config: CalibrationConfig,
}

impl TimingCalibrator {
    /// Create a calibrator with the given settings.
    #[must_use]
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Calibrate one group over the configured acceptance window.
    ///
    /// At most `sample_size` events are read from `events`.
    ///
    /// # Errors
    /// Returns a [`CalibrationError`] for the first channel that cannot be fitted.
    pub fn calibrate(
        &self,
        events: &[Event],
        group: &ReferenceChannelGroup,
    ) -> Result<CalibrationTable, CalibrationError> {
        self.calibrate_in_window(events, group, self.config.window)
    }

    /// Calibrate one group over an explicit acceptance window.
    ///
    /// # Errors
    /// Returns a [`CalibrationError`] for the first channel that cannot be fitted.
    pub fn calibrate_in_window(
        &self,
        events: &[Event],
        group: &ReferenceChannelGroup,
        window: TimeWindow,
    ) -> Result<CalibrationTable, CalibrationError> {
        let mut histograms: [Histogram1D; REFERENCE_GROUP_SIZE] = std::array::from_fn(|_| {
            Histogram1D::new(self.config.bins, window.low, window.high)
        });
        let mut samples = [0usize; REFERENCE_GROUP_SIZE];

        for hit in events
            .iter()
            .take(self.config.sample_size)
            .flat_map(|event| event.iter())
        {
            if hit.module != group.module || !window.contains(hit.time) {
                continue;
            }
            if let Some(slot) = group.channels.iter().position(|&ch| ch == hit.channel) {
                if histograms[slot].fill(hit.time).is_some() {
                    samples[slot] += 1;
                }
            }
        }

        let mut entries = Vec::with_capacity(REFERENCE_GROUP_SIZE);
        for ((key, histogram), count) in group.keys().zip(&histograms).zip(samples) {
            let entry = self.fit_channel(key, histogram, count)?;
            debug!(
                "{} {key}: mean {:.3} sigma {:.3} from {count} hits ({} iterations)",
                group.name, entry.mean, entry.sigma, entry.iterations
            );
            entries.push((key, entry));
        }

        let table = CalibrationTable::from_entries(entries)?;
        info!(
            "Calibrated {} ({} channels) over ({}, {})",
            group.name,
            table.len(),
            window.low,
            window.high
        );
        Ok(table)
    }

    /// Calibrate both reference groups of a layout into one table.
    ///
    /// # Errors
    /// Returns a [`CalibrationError`] for the first channel that cannot be fitted.
    pub fn calibrate_layout(
        &self,
        events: &[Event],
        layout: &DetectorLayout,
    ) -> Result<CalibrationTable, CalibrationError> {
        let t0 = self.calibrate(events, &layout.t0)?;
        let t1 = self.calibrate(events, &layout.t1)?;
        Ok(t0.merge(t1))
    }

    fn fit_channel(
        &self,
        key: ChannelKey,
        histogram: &Histogram1D,
        samples: usize,
    ) -> Result<CalibrationEntry, CalibrationError> {
        let Some(peak_bin) = histogram.maximum_bin() else {
            return Err(CalibrationError::NoSamples {
                module: key.module,
                channel: key.channel,
            });
        };
        let peak = histogram.bin_center(peak_bin);
        let peak_count = histogram.count(peak_bin).unwrap_or_default();

        #[allow(clippy::cast_precision_loss)]
        let points: Vec<(f64, f64)> = histogram
            .points()
            .filter(|&(x, _)| (x - peak).abs() <= self.config.fit_half_width)
            .map(|(x, count)| (x, count as f64))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let seed = GaussianParams::new(peak_count as f64, peak, self.config.seed_sigma);
        let options = FitOptions {
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
        };

        let fit = fit_gaussian(&points, seed, options).map_err(|err| match err {
            FitError::TooFewPoints { populated } => CalibrationError::TooFewBins {
                module: key.module,
                channel: key.channel,
                populated,
                required: MIN_POPULATED_BINS,
            },
            FitError::Singular => CalibrationError::FitDidNotConverge {
                module: key.module,
                channel: key.channel,
                iterations: 0,
            },
            FitError::Stalled { iterations } | FitError::NotConverged { iterations } => {
                CalibrationError::FitDidNotConverge {
                    module: key.module,
                    channel: key.channel,
                    iterations,
                }
            }
        })?;

        let GaussianParams { mean, sigma, .. } = fit.params;
        Ok(CalibrationEntry {
            mean,
            sigma,
            amplitude: fit.params.amplitude,
            samples,
            iterations: fit.iterations,
        })
    }
}
