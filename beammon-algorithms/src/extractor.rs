//! Per-event feature extraction against a frozen calibration table.

use beammon_core::calibration::CalibrationTable;
use beammon_core::features::EventFeatures;
use beammon_core::hit::Event;
use beammon_core::layout::{DetectorLayout, ReferenceChannelGroup, REFERENCE_GROUP_SIZE};
use log::debug;

/// Average time of a reference group and the number of hits accepted.
///
/// The average is only defined when exactly four hits pass the
/// `n_sigma` window of their channel.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn group_average(
    event: &Event,
    group: &ReferenceChannelGroup,
    calib: &CalibrationTable,
    n_sigma: f64,
) -> (Option<f64>, usize) {
    let mut sum = 0.0;
    let mut accepted = 0usize;

    for hit in event.iter().filter(|hit| group.contains(hit)) {
        let Some(entry) = calib.get(hit.key()) else {
            debug!("{}: no calibration for {}", group.name, hit.key());
            continue;
        };
        if entry.accepts(hit.time, n_sigma) {
            sum += hit.time;
            accepted += 1;
        } else {
            debug!(
                "{}: rejected {} at t={} (mean {:.3}, sigma {:.3})",
                group.name,
                hit.key(),
                hit.time,
                entry.mean,
                entry.sigma
            );
        }
    }

    let average = (accepted == REFERENCE_GROUP_SIZE).then(|| sum / REFERENCE_GROUP_SIZE as f64);
    (average, accepted)
}

/// Computes [`EventFeatures`] for events of one detector layout.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    layout: DetectorLayout,
}

impl FeatureExtractor {
    #[must_use]
    pub fn new(layout: DetectorLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn layout(&self) -> &DetectorLayout {
        &self.layout
    }

    /// Extract the timing, charge and gate observables of one event.
    ///
    /// Never fails: anything that cannot be computed is left as `None`.
    #[must_use]
    pub fn extract(&self, event: &Event, calib: &CalibrationTable) -> EventFeatures {
        let layout = &self.layout;
        let (t0_avg, t0_hits) = group_average(event, &layout.t0, calib, layout.n_sigma);
        let (t1_avg, t1_hits) = group_average(event, &layout.t1, calib, layout.n_sigma);

        let tof_t0t1 = match (t0_avg, t1_avg) {
            (Some(t0), Some(t1)) => Some(t1 - t0),
            _ => {
                debug!("no time of flight: {t0_hits} T0 and {t1_hits} T1 hits accepted");
                None
            }
        };

        // A non-finite charge poisons the sum instead of propagating NaN.
        let act_sum = event
            .iter()
            .filter(|hit| layout.act_range.contains(hit))
            .try_fold(0.0, |acc, hit| hit.charge.is_finite().then_some(acc + hit.charge));

        EventFeatures {
            t0_avg,
            t1_avg,
            tof_t0t1,
            act_sum,
            t4_hit: event
                .iter()
                .any(|hit| layout.trigger.iter().any(|paddle| paddle.fires(hit))),
            hole0: event.iter().any(|hit| layout.hole0.fires(hit)),
            hole1: event.iter().any(|hit| layout.hole1.fires(hit)),
            t0_hits,
            t1_hits,
        }
    }
}
