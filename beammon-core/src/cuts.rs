//! Run-dependent particle-ID cut boxes.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::particle::ParticleCode;
use crate::run::RunId;

/// Axis-aligned acceptance rectangle in (time of flight, charge sum).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CutBox {
    pub tof_min: f64,
    pub tof_max: f64,
    pub act_min: f64,
    pub act_max: f64,
}

impl CutBox {
    #[must_use]
    pub fn new(tof_min: f64, tof_max: f64, act_min: f64, act_max: f64) -> Self {
        Self {
            tof_min,
            tof_max,
            act_min,
            act_max,
        }
    }

    /// Returns true if the point lies in the box, bounds included.
    #[inline]
    #[must_use]
    pub fn contains(&self, tof: f64, act: f64) -> bool {
        (self.tof_min..=self.tof_max).contains(&tof) && (self.act_min..=self.act_max).contains(&act)
    }
}

/// Cut boxes of one run. An absent box never matches.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunCutDefinitions {
    pub electron: Option<CutBox>,
    pub muon: Option<CutBox>,
    pub pion: Option<CutBox>,
}

impl RunCutDefinitions {
    /// Returns the box for a species; `Unknown` has none.
    #[must_use]
    pub fn box_for(&self, species: ParticleCode) -> Option<&CutBox> {
        match species {
            ParticleCode::Electron => self.electron.as_ref(),
            ParticleCode::Muon => self.muon.as_ref(),
            ParticleCode::Pion => self.pion.as_ref(),
            ParticleCode::Unknown => None,
        }
    }

    /// Present boxes in priority order: electron, muon, pion.
    pub fn in_priority_order(&self) -> impl Iterator<Item = (ParticleCode, &CutBox)> {
        ParticleCode::SPECIES
            .into_iter()
            .filter_map(move |species| self.box_for(species).map(|cut| (species, cut)))
    }
}

/// Cut definitions keyed by run id.
pub type RunCutMap = BTreeMap<RunId, RunCutDefinitions>;

/// Particle-ID method, chosen when the processing configuration is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PidMethod {
    /// Rectangular cuts in (TOF, charge sum), first match wins.
    #[default]
    Box,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_bounds_inclusive() {
        let cut = CutBox::new(13.0, 15.0, 0.0, 10_000.0);
        assert!(cut.contains(13.0, 0.0));
        assert!(cut.contains(15.0, 10_000.0));
        assert!(!cut.contains(15.001, 5000.0));
        assert!(!cut.contains(14.0, -0.5));
        assert!(!cut.contains(f64::NAN, 5000.0));
    }

    #[test]
    fn test_priority_order_skips_absent() {
        let cuts = RunCutDefinitions {
            electron: None,
            muon: Some(CutBox::new(0.0, 1.0, 0.0, 1.0)),
            pion: Some(CutBox::new(1.0, 2.0, 0.0, 1.0)),
        };
        let order: Vec<ParticleCode> = cuts.in_priority_order().map(|(s, _)| s).collect();
        assert_eq!(order, vec![ParticleCode::Muon, ParticleCode::Pion]);
    }
}
