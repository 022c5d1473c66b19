//! Hit records and events from the beam monitor readout.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::run::RunId;

/// Hardware address of one readout channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelKey {
    /// Digitizer module (card) id.
    pub module: u32,
    /// Channel id within the module.
    pub channel: u32,
}

impl ChannelKey {
    /// Creates a new channel key.
    #[inline]
    #[must_use]
    pub fn new(module: u32, channel: u32) -> Self {
        Self { module, channel }
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "module {} channel {}", self.module, self.channel)
    }
}

/// One digitized detector hit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitRecord {
    /// Digitizer module (card) id.
    pub module: u32,
    /// Channel id within the module.
    pub channel: u32,
    /// Integrated charge (QDC units).
    pub charge: f64,
    /// Hit time (ns).
    pub time: f64,
}

impl HitRecord {
    /// Creates a new hit record.
    #[inline]
    #[must_use]
    pub fn new(module: u32, channel: u32, charge: f64, time: f64) -> Self {
        Self {
            module,
            channel,
            charge,
            time,
        }
    }

    /// Returns the channel this hit was read out on.
    #[inline]
    #[must_use]
    pub fn key(&self) -> ChannelKey {
        ChannelKey::new(self.module, self.channel)
    }
}

/// All hits sharing one readout window.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Run this event was recorded in, if the reader knows it.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub run_id: Option<RunId>,
    /// Hits in readout order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub hits: Vec<HitRecord>,
}

impl Event {
    /// Creates an event with no run id.
    #[must_use]
    pub fn new(hits: Vec<HitRecord>) -> Self {
        Self { run_id: None, hits }
    }

    /// Tags the event with a run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Returns the number of hits in the event.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the event has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &HitRecord> {
        self.hits.iter()
    }
}

impl FromIterator<HitRecord> for Event {
    fn from_iter<I: IntoIterator<Item = HitRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
