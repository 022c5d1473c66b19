//! Event selection and box-cut particle identification.

use beammon_core::cuts::{PidMethod, RunCutDefinitions};
use beammon_core::features::EventFeatures;
use beammon_core::particle::ParticleCode;

/// True if the event is triggered, not vetoed and has a full timing reference.
#[inline]
#[must_use]
pub fn passes_selection(features: &EventFeatures) -> bool {
    features.t4_hit
        && !features.hole0
        && !features.hole1
        && features.has_full_reference()
        && features.tof_t0t1.is_some()
}

/// Box-cut classification: first species (electron, muon, pion) whose box
/// contains `(tof, act)` wins.
#[must_use]
pub fn classify_box(features: &EventFeatures, cuts: &RunCutDefinitions) -> ParticleCode {
    if !passes_selection(features) {
        return ParticleCode::Unknown;
    }
    let (Some(tof), Some(act)) = (features.tof_t0t1, features.act_sum) else {
        return ParticleCode::Unknown;
    };
    cuts.in_priority_order()
        .find(|(_, cut)| cut.contains(tof, act))
        .map_or(ParticleCode::Unknown, |(species, _)| species)
}

/// Classifier bound to one identification method.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    method: PidMethod,
}

impl Classifier {
    #[must_use]
    pub fn new(method: PidMethod) -> Self {
        Self { method }
    }

    #[must_use]
    pub fn method(&self) -> PidMethod {
        self.method
    }

    /// Classify one event. A run without cut definitions yields `Unknown`.
    #[must_use]
    pub fn classify(&self, features: &EventFeatures, cuts: Option<&RunCutDefinitions>) -> ParticleCode {
        let Some(cuts) = cuts else {
            return ParticleCode::Unknown;
        };
        match self.method {
            PidMethod::Box => classify_box(features, cuts),
        }
    }
}
