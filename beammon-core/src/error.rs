//! Error types for beammon-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::run::{RunId, RunStage};

/// Result type alias for beammon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unreadable or malformed configuration.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    /// The configuration file could not be read.
    #[error("could not read configuration {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid or has the wrong structure.
    #[error("malformed configuration document: {0}")]
    Malformed(String),

    /// A top-level key is not an integer run id.
    #[error("configuration key {0:?} is not a run id")]
    InvalidRunId(String),

    /// A processing parameter is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// A reference channel could not be calibrated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// No hits fell inside the calibration window.
    #[error("no calibration samples for module {module} channel {channel}")]
    NoSamples { module: u32, channel: u32 },

    /// Too few populated bins in the fit range to constrain a Gaussian.
    #[error(
        "module {module} channel {channel}: {populated} populated bins in fit range, need {required}"
    )]
    TooFewBins {
        module: u32,
        channel: u32,
        populated: usize,
        required: usize,
    },

    /// The least-squares fit hit its iteration cap.
    #[error("fit for module {module} channel {channel} did not converge after {iterations} iterations")]
    FitDidNotConverge {
        module: u32,
        channel: u32,
        iterations: usize,
    },

    /// The fitted width is zero, negative or not a number.
    #[error("fit for module {module} channel {channel} gave invalid sigma {sigma}")]
    InvalidSigma { module: u32, channel: u32, sigma: f64 },

    /// The table lacks an entry for a reference channel.
    #[error("calibration table has no entry for module {module} channel {channel}")]
    MissingChannel { module: u32, channel: u32 },
}

/// Stage at which a run was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    ConfigLoad,
    QualityCheck,
    Calibration,
}

impl std::fmt::Display for FailedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ConfigLoad => "config load",
            Self::QualityCheck => "quality check",
            Self::Calibration => "calibration",
        };
        f.write_str(name)
    }
}

/// Cause of a run-level abort.
#[derive(Error, Debug)]
pub enum RunFailure {
    #[error("run is not flagged as good")]
    BadRun,

    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// Fatal failure of one run, naming the stage and run id.
#[derive(Error, Debug)]
#[error("run {run_id} aborted at {stage}: {failure}")]
pub struct RunError {
    pub run_id: RunId,
    pub stage: FailedStage,
    #[source]
    pub failure: RunFailure,
}

impl RunError {
    #[must_use]
    pub fn new(run_id: RunId, stage: FailedStage, failure: impl Into<RunFailure>) -> Self {
        Self {
            run_id,
            stage,
            failure: failure.into(),
        }
    }
}

/// Core error types for beammon operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    /// Calibration error.
    #[error("calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    /// A run was aborted.
    #[error(transparent)]
    Run(#[from] RunError),

    /// A run step was called out of order.
    #[error("invalid run transition from {from} to {to}")]
    InvalidTransition { from: RunStage, to: RunStage },
}
