//! Detector channel layout for the beam monitor.
//!
//! The default values describe the beamline PMT readout: the T0 and T1
//! counter planes (four PMTs each), the aerogel Cherenkov group summed for
//! the charge observable, the T4 trigger paddles and the two hole vetoes.
//! Thresholds are empirically tuned detector constants and are not expected
//! to carry over to another geometry.
//!
//! The default reference groups are the beam-monitor TDC channels (module 0,
//! channels 0-3 and 4-7). The default [`CalibrationConfig`] window of
//! 2150-2250 ns is tuned for the hit-PMT readout of T0, which sits on card
//! 131, channels 12-15. Calibrating TDC channels needs a window matched to
//! their timing; for the hit-PMT readout swap in its group:
//!
//! ```
//! use beammon_core::{DetectorLayout, ReferenceChannelGroup};
//!
//! let layout = DetectorLayout::new()
//!     .with_t0(ReferenceChannelGroup::new("T0", 131, [12, 13, 14, 15]));
//! assert!(layout.validate().is_ok());
//! ```
//!
//! [`CalibrationConfig`]: crate::calibration::CalibrationConfig

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigLoadError;
use crate::hit::{ChannelKey, HitRecord};

/// Number of channels in a reference group.
pub const REFERENCE_GROUP_SIZE: usize = 4;

/// Four channels on one module that together define a timing reference.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceChannelGroup {
    /// Conventional name ("T0", "T1").
    pub name: String,
    /// Module the channels belong to.
    pub module: u32,
    /// Channel ids, one per PMT.
    pub channels: [u32; REFERENCE_GROUP_SIZE],
}

impl ReferenceChannelGroup {
    /// Creates a new reference group.
    #[must_use]
    pub fn new(name: &str, module: u32, channels: [u32; REFERENCE_GROUP_SIZE]) -> Self {
        Self {
            name: name.to_string(),
            module,
            channels,
        }
    }

    /// Returns the channel keys of the group.
    pub fn keys(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.channels
            .iter()
            .map(move |&channel| ChannelKey::new(self.module, channel))
    }

    /// Returns true if the hit was read out on one of the group's channels.
    #[inline]
    #[must_use]
    pub fn contains(&self, hit: &HitRecord) -> bool {
        hit.module == self.module && self.channels.contains(&hit.channel)
    }
}

/// Inclusive range of channels on one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelRange {
    pub module: u32,
    pub first: u32,
    pub last: u32,
}

impl ChannelRange {
    #[must_use]
    pub fn new(module: u32, first: u32, last: u32) -> Self {
        Self {
            module,
            first,
            last,
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, hit: &HitRecord) -> bool {
        hit.module == self.module && (self.first..=self.last).contains(&hit.channel)
    }
}

/// A single channel paired with a charge threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdChannel {
    pub module: u32,
    pub channel: u32,
    /// The channel fires when its charge is strictly above this value.
    pub threshold: f64,
}

impl ThresholdChannel {
    #[must_use]
    pub fn new(module: u32, channel: u32, threshold: f64) -> Self {
        Self {
            module,
            channel,
            threshold,
        }
    }

    /// Returns true if the hit is on this channel and above threshold.
    #[inline]
    #[must_use]
    pub fn fires(&self, hit: &HitRecord) -> bool {
        hit.module == self.module && hit.channel == self.channel && hit.charge > self.threshold
    }
}

/// Channel layout and gate constants used by feature extraction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorLayout {
    /// Upstream timing reference.
    pub t0: ReferenceChannelGroup,
    /// Downstream timing reference.
    pub t1: ReferenceChannelGroup,
    /// Channels summed into the charge observable.
    pub act_range: ChannelRange,
    /// Trigger paddles; any one firing sets the T4 flag.
    pub trigger: Vec<ThresholdChannel>,
    /// First hole veto.
    pub hole0: ThresholdChannel,
    /// Second hole veto.
    pub hole1: ThresholdChannel,
    /// Acceptance half-width around each channel mean, in fitted sigmas.
    pub n_sigma: f64,
}

impl Default for DetectorLayout {
    fn default() -> Self {
        Self {
            t0: ReferenceChannelGroup::new("T0", 0, [0, 1, 2, 3]),
            t1: ReferenceChannelGroup::new("T1", 0, [4, 5, 6, 7]),
            act_range: ChannelRange::new(0, 18, 23),
            trigger: vec![
                ThresholdChannel::new(0, 42, 300.0),
                ThresholdChannel::new(0, 43, 300.0),
            ],
            hole0: ThresholdChannel::new(0, 9, 150.0),
            hole1: ThresholdChannel::new(0, 10, 100.0),
            n_sigma: 3.0,
        }
    }
}

impl DetectorLayout {
    /// Creates a layout with the beamline defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the T0 reference group.
    #[must_use]
    pub fn with_t0(mut self, group: ReferenceChannelGroup) -> Self {
        self.t0 = group;
        self
    }

    /// Sets the T1 reference group.
    #[must_use]
    pub fn with_t1(mut self, group: ReferenceChannelGroup) -> Self {
        self.t1 = group;
        self
    }

    /// Sets the charge-sum channel range.
    #[must_use]
    pub fn with_act_range(mut self, range: ChannelRange) -> Self {
        self.act_range = range;
        self
    }

    /// Sets the trigger paddles.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Vec<ThresholdChannel>) -> Self {
        self.trigger = trigger;
        self
    }

    /// Sets both hole vetoes.
    #[must_use]
    pub fn with_holes(mut self, hole0: ThresholdChannel, hole1: ThresholdChannel) -> Self {
        self.hole0 = hole0;
        self.hole1 = hole1;
        self
    }

    /// Sets the acceptance width in sigmas.
    #[must_use]
    pub fn with_n_sigma(mut self, n_sigma: f64) -> Self {
        self.n_sigma = n_sigma;
        self
    }

    /// Both reference groups, T0 first.
    #[must_use]
    pub fn reference_groups(&self) -> [&ReferenceChannelGroup; 2] {
        [&self.t0, &self.t1]
    }

    /// Checks the layout for values that would make extraction meaningless.
    ///
    /// # Errors
    /// Returns [`ConfigLoadError::InvalidParameter`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if !(self.n_sigma.is_finite() && self.n_sigma > 0.0) {
            return Err(ConfigLoadError::InvalidParameter {
                name: "n_sigma",
                reason: format!("must be a positive number, got {}", self.n_sigma),
            });
        }
        if self.act_range.first > self.act_range.last {
            return Err(ConfigLoadError::InvalidParameter {
                name: "act_range",
                reason: format!(
                    "first channel {} is after last channel {}",
                    self.act_range.first, self.act_range.last
                ),
            });
        }
        for group in self.reference_groups() {
            let mut channels = group.channels;
            channels.sort_unstable();
            if channels.windows(2).any(|pair| pair[0] == pair[1]) {
                return Err(ConfigLoadError::InvalidParameter {
                    name: "reference_group",
                    reason: format!("group {} lists a channel twice", group.name),
                });
            }
        }
        if self.t0.keys().any(|key| self.t1.keys().any(|other| other == key)) {
            return Err(ConfigLoadError::InvalidParameter {
                name: "reference_group",
                reason: "T0 and T1 share a channel".to_string(),
            });
        }
        Ok(())
    }
}
