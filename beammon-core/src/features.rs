//! Derived per-event features.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::layout::REFERENCE_GROUP_SIZE;

/// Scalar observables computed from one event and the run calibration.
///
/// Values that could not be computed are `None`; they never carry a
/// numeric placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventFeatures {
    /// T0 group average time (ns), defined only with a full group.
    pub t0_avg: Option<f64>,
    /// T1 group average time (ns), defined only with a full group.
    pub t1_avg: Option<f64>,
    /// Time of flight `t1_avg - t0_avg` (ns).
    pub tof_t0t1: Option<f64>,
    /// Charge summed over the Cherenkov channel range.
    pub act_sum: Option<f64>,
    /// A trigger paddle fired.
    pub t4_hit: bool,
    /// First hole veto fired.
    pub hole0: bool,
    /// Second hole veto fired.
    pub hole1: bool,
    /// Accepted T0 hits.
    pub t0_hits: usize,
    /// Accepted T1 hits.
    pub t1_hits: usize,
}

impl EventFeatures {
    /// Returns true if both reference groups were complete.
    #[must_use]
    pub fn has_full_reference(&self) -> bool {
        self.t0_hits == REFERENCE_GROUP_SIZE && self.t1_hits == REFERENCE_GROUP_SIZE
    }
}
