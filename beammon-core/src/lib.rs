//! beammon-core: Core types for beam monitor timing calibration and particle ID.
//!
//! This crate provides the data model shared by the calibration, feature
//! extraction and classification stages: hit records, the detector channel
//! layout, calibration tables, per-event features, cut boxes, particle codes
//! and the per-run state machine.
//!

pub mod calibration;
pub mod config;
pub mod cuts;
pub mod error;
pub mod features;
pub mod hit;
pub mod layout;
pub mod particle;
pub mod run;

pub use calibration::{CalibrationConfig, CalibrationEntry, CalibrationTable, TimeWindow};
pub use config::ProcessingConfig;
pub use cuts::{CutBox, PidMethod, RunCutDefinitions, RunCutMap};
pub use error::{
    CalibrationError, ConfigLoadError, Error, FailedStage, Result, RunError, RunFailure,
};
pub use features::EventFeatures;
pub use hit::{ChannelKey, Event, HitRecord};
pub use layout::{ChannelRange, DetectorLayout, ReferenceChannelGroup, ThresholdChannel};
pub use particle::ParticleCode;
pub use run::{is_good_run, RunId, RunQuality, RunQualityMap, RunStage};
