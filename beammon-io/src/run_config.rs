//! Run-keyed cut and data-quality document.
//!
//! ```json
//! {
//!   "1610": {
//!     "dataquality": { "GoodRun": true },
//!     "box": {
//!       "electron": { "tof_min": 13.0, "tof_max": 15.0, "act_min": 0.0, "act_max": 10000.0 }
//!     }
//!   }
//! }
//! ```
//!
//! Unknown keys are ignored. A run without a `box` block has no cut
//! definitions; a run without `dataquality.GoodRun` is bad.

use std::collections::BTreeMap;
use std::path::Path;

use beammon_core::{
    is_good_run, ConfigLoadError, CutBox, RunCutDefinitions, RunCutMap, RunId, RunQuality,
    RunQualityMap,
};
use log::info;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RunEntry {
    #[serde(rename = "box", default)]
    cut_box: Option<BoxBlock>,
    #[serde(default)]
    dataquality: Option<QualityBlock>,
}

#[derive(Debug, Deserialize)]
struct BoxBlock {
    #[serde(default)]
    electron: Option<CutBox>,
    #[serde(default)]
    muon: Option<CutBox>,
    #[serde(default)]
    pion: Option<CutBox>,
}

#[derive(Debug, Deserialize)]
struct QualityBlock {
    #[serde(rename = "GoodRun", default)]
    good_run: bool,
}

fn parse_document(document: &str) -> Result<BTreeMap<RunId, RunEntry>, ConfigLoadError> {
    let raw: BTreeMap<String, RunEntry> = serde_json::from_str(document)
        .map_err(|err| ConfigLoadError::Malformed(err.to_string()))?;
    raw.into_iter()
        .map(|(key, entry)| {
            key.trim()
                .parse::<RunId>()
                .map(|run_id| (run_id, entry))
                .map_err(|_| ConfigLoadError::InvalidRunId(key))
        })
        .collect()
}

/// Parse the per-run cut boxes of a document.
///
/// # Errors
/// Returns [`ConfigLoadError`] if the document is malformed or a key is not a run id.
pub fn load_cuts(document: &str) -> Result<RunCutMap, ConfigLoadError> {
    RunConfigStore::from_json_str(document).map(|store| store.cuts)
}

/// Parse the per-run quality flags of a document.
///
/// # Errors
/// Returns [`ConfigLoadError`] if the document is malformed or a key is not a run id.
pub fn load_quality(document: &str) -> Result<RunQualityMap, ConfigLoadError> {
    RunConfigStore::from_json_str(document).map(|store| store.quality)
}

/// Cut definitions and quality flags for every configured run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfigStore {
    cuts: RunCutMap,
    quality: RunQualityMap,
}

impl RunConfigStore {
    /// Parse a configuration document.
    ///
    /// # Errors
    /// Returns [`ConfigLoadError`] if the document is malformed or a key is not a run id.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigLoadError> {
        let mut store = Self::default();
        for (run_id, entry) in parse_document(document)? {
            if let Some(block) = entry.cut_box {
                store.cuts.insert(
                    run_id,
                    RunCutDefinitions {
                        electron: block.electron,
                        muon: block.muon,
                        pion: block.pion,
                    },
                );
            }
            if let Some(block) = entry.dataquality {
                store.quality.insert(run_id, RunQuality::new(block.good_run));
            }
        }
        Ok(store)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    /// Returns [`ConfigLoadError::Unreadable`] if the file cannot be read,
    /// otherwise as [`RunConfigStore::from_json_str`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let document =
            std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let store = Self::from_json_str(&document)?;
        info!(
            "Loaded {} run(s) with cuts and {} with quality flags from {}",
            store.cuts.len(),
            store.quality.len(),
            path.display()
        );
        Ok(store)
    }

    #[must_use]
    pub fn cuts(&self) -> &RunCutMap {
        &self.cuts
    }

    #[must_use]
    pub fn quality(&self) -> &RunQualityMap {
        &self.quality
    }

    /// Cut definitions of `run_id`, if configured.
    #[must_use]
    pub fn cuts_for(&self, run_id: RunId) -> Option<&RunCutDefinitions> {
        self.cuts.get(&run_id)
    }

    /// Fail-closed quality lookup.
    #[must_use]
    pub fn is_good_run(&self, run_id: RunId) -> bool {
        is_good_run(run_id, &self.quality)
    }

    /// Every run id mentioned by either map, ascending.
    #[must_use]
    pub fn run_ids(&self) -> Vec<RunId> {
        let mut ids: Vec<RunId> = self.cuts.keys().chain(self.quality.keys()).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Split into the cut and quality maps.
    #[must_use]
    pub fn into_maps(self) -> (RunCutMap, RunQualityMap) {
        (self.cuts, self.quality)
    }
}
