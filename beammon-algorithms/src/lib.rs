//! beammon-algorithms: Timing calibration and particle identification.
//!
//! This crate provides the per-run processing stages:
//! - **Calibrator** - Gaussian fit of each reference channel's hit times
//! - **Extractor** - Time of flight, charge sum and gate flags per event
//! - **Classifier** - Selection gates and priority-ordered box cuts
//! - **Processing** - Run state machine tying the stages together
//!

mod calibrator;
mod classifier;
mod extractor;
pub mod fit;
pub mod histogram;
mod processing;

pub use calibrator::TimingCalibrator;
pub use classifier::{classify_box, passes_selection, Classifier};
pub use extractor::{group_average, FeatureExtractor};
pub use fit::{fit_gaussian, FitError, FitOptions, GaussianFit, GaussianParams};
pub use histogram::Histogram1D;
pub use processing::{
    filter_by_species, process_run, EventResult, RunOutput, RunProcessor, RunSummary,
};
