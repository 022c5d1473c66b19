//! beammon-io: File I/O for the beam monitor.
//!
//! This crate reads the run configuration document and memory-mapped
//! JSON Lines event files, and writes per-event results, calibration
//! tables and filtered samples.
//!

mod config;
mod error;
mod reader;
pub mod run_config;
mod writer;

pub use config::{load_processing_config, save_processing_config};
pub use error::{Error, Result};
pub use reader::{first_run_id, EventFileReader, MappedFileReader};
pub use run_config::{load_cuts, load_quality, RunConfigStore};
pub use writer::{DataFileWriter, CALIBRATION_HEADER, RESULTS_HEADER};
