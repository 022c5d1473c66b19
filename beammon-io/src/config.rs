//! Processing configuration files.

use std::path::Path;

use beammon_core::{ConfigLoadError, ProcessingConfig};

use crate::Result;

/// Read a processing configuration; missing fields take their defaults.
///
/// # Errors
/// Returns [`ConfigLoadError`] if the file is unreadable, malformed or
/// holds out-of-range parameters.
pub fn load_processing_config<P: AsRef<Path>>(path: P) -> std::result::Result<ProcessingConfig, ConfigLoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ProcessingConfig =
        serde_json::from_str(&text).map_err(|err| ConfigLoadError::Malformed(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Write a processing configuration as pretty-printed JSON.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_processing_config<P: AsRef<Path>>(path: P, config: &ProcessingConfig) -> Result<()> {
    let text = serde_json::to_string_pretty(config)?;
    std::fs::write(path, text + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beammon_core::{CalibrationConfig, PidMethod};
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let config = ProcessingConfig::default()
            .with_parallel(false)
            .with_calibration(CalibrationConfig::default().with_sample_size(1000));

        save_processing_config(&path, &config).unwrap();
        let loaded = load_processing_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(
            &path,
            r#"{ "pid_method": "box", "calibration": { "sample_size": 1000 }, "layout": { "n_sigma": 2.5 } }"#,
        )
        .unwrap();

        let loaded = load_processing_config(&path).unwrap();
        assert_eq!(loaded.pid_method, PidMethod::Box);
        assert_eq!(loaded.calibration.sample_size, 1000);
        assert_eq!(loaded.calibration.bins, 200);
        assert_eq!(loaded.layout.t1.channels, [4, 5, 6, 7]);
        assert!(loaded.parallel);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "calibration": { "sample_size": 0 } }"#).unwrap();
        assert!(matches!(
            load_processing_config(&path),
            Err(ConfigLoadError::InvalidParameter {
                name: "sample_size",
                ..
            })
        ));

        std::fs::write(&path, r#"{ "pid_method": "likelihood" }"#).unwrap();
        assert!(matches!(
            load_processing_config(&path),
            Err(ConfigLoadError::Malformed(_))
        ));
    }
}
