//! Run identifiers, data quality and the per-run processing stages.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Data-taking run number.
pub type RunId = u32;

/// Data-quality verdict of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunQuality {
    pub good_run: bool,
}

impl RunQuality {
    #[must_use]
    pub fn new(good_run: bool) -> Self {
        Self { good_run }
    }
}

/// Quality verdicts keyed by run id.
pub type RunQualityMap = BTreeMap<RunId, RunQuality>;

/// Returns the quality verdict of a run. Unknown runs are bad.
#[must_use]
pub fn is_good_run(run_id: RunId, quality: &RunQualityMap) -> bool {
    quality.get(&run_id).is_some_and(|q| q.good_run)
}

/// Lifecycle of one run through the pipeline.
///
/// ```text
/// Unconfigured -> QualityChecked -> Calibrated -> Processing -> Done
///                       |               |
///                       +---> Aborted <-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Unconfigured,
    QualityChecked,
    Calibrated,
    Processing,
    Done,
    Aborted,
}

impl RunStage {
    /// Returns true if `next` is a legal successor of this stage.
    #[must_use]
    pub fn can_advance_to(self, next: RunStage) -> bool {
        matches!(
            (self, next),
            (Self::Unconfigured, Self::QualityChecked)
                | (Self::QualityChecked, Self::Calibrated | Self::Aborted)
                | (Self::Calibrated, Self::Processing | Self::Aborted)
                | (Self::Processing, Self::Done)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::QualityChecked => "quality-checked",
            Self::Calibrated => "calibrated",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_run_is_bad() {
        let mut quality = RunQualityMap::new();
        quality.insert(1610, RunQuality::new(true));
        quality.insert(1611, RunQuality::new(false));

        assert!(is_good_run(1610, &quality));
        assert!(!is_good_run(1611, &quality));
        assert!(!is_good_run(9999, &quality));
    }

    #[test]
    fn test_stage_transitions() {
        assert!(RunStage::Unconfigured.can_advance_to(RunStage::QualityChecked));
        assert!(RunStage::QualityChecked.can_advance_to(RunStage::Aborted));
        assert!(RunStage::Calibrated.can_advance_to(RunStage::Aborted));
        assert!(!RunStage::Unconfigured.can_advance_to(RunStage::Processing));
        assert!(!RunStage::Processing.can_advance_to(RunStage::Aborted));
        assert!(!RunStage::Done.can_advance_to(RunStage::Processing));
        assert!(RunStage::Aborted.is_terminal());
    }
}
