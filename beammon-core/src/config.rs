//! Processing configuration fixed before a run starts.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationConfig;
use crate::cuts::PidMethod;
use crate::error::ConfigLoadError;
use crate::layout::DetectorLayout;

/// Everything the pipeline needs besides the run configuration document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProcessingConfig {
    /// Channel layout and gate thresholds.
    pub layout: DetectorLayout,
    /// Timing calibration parameters.
    pub calibration: CalibrationConfig,
    /// Particle-ID method.
    pub pid_method: PidMethod,
    /// Process events on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            layout: DetectorLayout::default(),
            calibration: CalibrationConfig::default(),
            pid_method: PidMethod::Box,
            parallel: true,
        }
    }
}

impl ProcessingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_layout(mut self, layout: DetectorLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    #[must_use]
    pub fn with_pid_method(mut self, method: PidMethod) -> Self {
        self.pid_method = method;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the layout and the calibration parameters.
    ///
    /// # Errors
    /// Returns the first [`ConfigLoadError::InvalidParameter`] found.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.layout.validate()?;
        self.calibration.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ProcessingConfig::new()
            .with_parallel(false)
            .with_calibration(CalibrationConfig::default().with_sample_size(1000));
        assert!(!config.parallel);
        assert_eq!(config.calibration.sample_size, 1000);
        assert_eq!(config.pid_method, PidMethod::Box);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_propagates_calibration_errors() {
        let config = ProcessingConfig::new()
            .with_calibration(CalibrationConfig::default().with_sample_size(0));
        assert!(config.validate().is_err());
    }
}
