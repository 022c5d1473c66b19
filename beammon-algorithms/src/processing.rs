//! Run-level pipeline: quality gate, calibration, then per-event
//! extraction and classification.

use beammon_core::calibration::CalibrationTable;
use beammon_core::config::ProcessingConfig;
use beammon_core::cuts::{RunCutDefinitions, RunCutMap};
use beammon_core::error::{Error, FailedStage, Result, RunError, RunFailure};
use beammon_core::features::EventFeatures;
use beammon_core::hit::Event;
use beammon_core::particle::ParticleCode;
use beammon_core::run::{is_good_run, RunId, RunQualityMap, RunStage};
use log::{info, warn};
use rayon::prelude::*;

use crate::calibrator::TimingCalibrator;
use crate::classifier::{passes_selection, Classifier};
use crate::extractor::FeatureExtractor;

/// Features and classification of one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventResult {
    /// Position of the event in the run.
    pub index: usize,
    pub features: EventFeatures,
    pub pid: ParticleCode,
}

impl EventResult {
    /// True if the event passed the trigger, veto and reference gates.
    #[must_use]
    pub fn selected(&self) -> bool {
        passes_selection(&self.features)
    }
}

/// Per-run counts and means. Means cover selected events only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub events: usize,
    pub selected: usize,
    pub electrons: usize,
    pub muons: usize,
    pub pions: usize,
    pub unknown: usize,
    pub mean_tof: Option<f64>,
    pub mean_act: Option<f64>,
    tof_sum: f64,
    act_sum: f64,
    act_count: usize,
}

impl RunSummary {
    #[must_use]
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    /// Build a summary from finished results.
    #[must_use]
    pub fn from_results(run_id: RunId, results: &[EventResult]) -> Self {
        let mut summary = Self::new(run_id);
        for result in results {
            summary.record(result);
        }
        summary
    }

    /// Number of events classified as `species`.
    #[must_use]
    pub fn count(&self, species: ParticleCode) -> usize {
        match species {
            ParticleCode::Electron => self.electrons,
            ParticleCode::Muon => self.muons,
            ParticleCode::Pion => self.pions,
            ParticleCode::Unknown => self.unknown,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn record(&mut self, result: &EventResult) {
        self.events += 1;
        match result.pid {
            ParticleCode::Electron => self.electrons += 1,
            ParticleCode::Muon => self.muons += 1,
            ParticleCode::Pion => self.pions += 1,
            ParticleCode::Unknown => self.unknown += 1,
        }
        if !result.selected() {
            return;
        }
        self.selected += 1;
        if let Some(tof) = result.features.tof_t0t1 {
            self.tof_sum += tof;
            self.mean_tof = Some(self.tof_sum / self.selected as f64);
        }
        if let Some(act) = result.features.act_sum {
            self.act_sum += act;
            self.act_count += 1;
            self.mean_act = Some(self.act_sum / self.act_count as f64);
        }
    }
}

/// Drives one run through `Unconfigured -> QualityChecked -> Calibrated ->
/// Processing -> Done`, or into `Aborted`.
#[derive(Debug)]
pub struct RunProcessor {
    run_id: RunId,
    config: ProcessingConfig,
    stage: RunStage,
    calibration: Option<CalibrationTable>,
    extractor: FeatureExtractor,
    classifier: Classifier,
    summary: RunSummary,
}

impl RunProcessor {
    /// Create a processor for `run_id`.
    ///
    /// # Errors
    /// Returns a [`RunError`] at the config-load stage if `config` is invalid.
    pub fn new(run_id: RunId, config: ProcessingConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|err| RunError::new(run_id, FailedStage::ConfigLoad, err))?;
        Ok(Self {
            run_id,
            extractor: FeatureExtractor::new(config.layout.clone()),
            classifier: Classifier::new(config.pid_method),
            config,
            stage: RunStage::Unconfigured,
            calibration: None,
            summary: RunSummary::new(run_id),
        })
    }

    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    #[must_use]
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    #[must_use]
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// The frozen calibration table, once calibrated.
    #[must_use]
    pub fn calibration(&self) -> Option<&CalibrationTable> {
        self.calibration.as_ref()
    }

    fn advance(&mut self, next: RunStage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(Error::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        Ok(())
    }

    fn abort(&mut self, stage: FailedStage, failure: impl Into<RunFailure>) -> Error {
        self.stage = RunStage::Aborted;
        let err = RunError::new(self.run_id, stage, failure);
        warn!("{err}");
        err.into()
    }

    /// Check the run against the quality map. Unlisted runs are bad.
    ///
    /// # Errors
    /// Returns a [`RunError`] at the quality-check stage for a bad run.
    pub fn check_quality(&mut self, quality: &RunQualityMap) -> Result<()> {
        self.advance(RunStage::QualityChecked)?;
        if !is_good_run(self.run_id, quality) {
            return Err(self.abort(FailedStage::QualityCheck, RunFailure::BadRun));
        }
        info!("Run {} passed the quality check", self.run_id);
        Ok(())
    }

    /// Build the calibration table from the leading events of the run.
    ///
    /// # Errors
    /// Returns a [`RunError`] at the calibration stage if any reference
    /// channel cannot be calibrated.
    pub fn calibrate(&mut self, sample: &[Event]) -> Result<&CalibrationTable> {
        if !self.stage.can_advance_to(RunStage::Calibrated) {
            return Err(Error::InvalidTransition {
                from: self.stage,
                to: RunStage::Calibrated,
            });
        }
        let calibrator = TimingCalibrator::new(self.config.calibration.clone());
        let table = match calibrator.calibrate_layout(sample, &self.config.layout) {
            Ok(table) => table,
            Err(err) => return Err(self.abort(FailedStage::Calibration, err)),
        };
        self.advance(RunStage::Calibrated)?;

        let coverage = self
            .config
            .layout
            .reference_groups()
            .into_iter()
            .try_for_each(|group| table.covers(group));
        if let Err(err) = coverage {
            return Err(self.abort(FailedStage::Calibration, err));
        }

        info!(
            "Run {}: calibrated {} reference channels from {} events",
            self.run_id,
            table.len(),
            sample.len().min(self.config.calibration.sample_size)
        );
        Ok(self.calibration.insert(table))
    }

    /// Extract and classify a batch of events, keeping input order.
    ///
    /// May be called repeatedly; indices continue across batches. Without
    /// cut definitions every event is `Unknown`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless the run is calibrated or
    /// already processing.
    pub fn process(
        &mut self,
        events: &[Event],
        cuts: Option<&RunCutDefinitions>,
    ) -> Result<Vec<EventResult>> {
        if self.stage != RunStage::Processing {
            self.advance(RunStage::Processing)?;
            if cuts.is_none() {
                warn!(
                    "Run {} has no cut definitions; all events will be unknown",
                    self.run_id
                );
            }
        }
        let Some(calib) = self.calibration.as_ref() else {
            return Err(Error::InvalidTransition {
                from: self.stage,
                to: RunStage::Processing,
            });
        };

        let offset = self.summary.events;
        let extractor = &self.extractor;
        let classifier = &self.classifier;
        let evaluate = |(i, event): (usize, &Event)| {
            let features = extractor.extract(event, calib);
            EventResult {
                index: offset + i,
                features,
                pid: classifier.classify(&features, cuts),
            }
        };

        let results: Vec<EventResult> = if self.config.parallel {
            events.par_iter().enumerate().map(evaluate).collect()
        } else {
            events.iter().enumerate().map(evaluate).collect()
        };

        for result in &results {
            self.summary.record(result);
        }
        Ok(results)
    }

    /// Close the run and return its summary.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless the run is processing.
    pub fn finish(&mut self) -> Result<RunSummary> {
        self.advance(RunStage::Done)?;
        let summary = std::mem::take(&mut self.summary);
        info!(
            "Run {}: {} events, {} selected ({} e, {} mu, {} pi)",
            summary.run_id,
            summary.events,
            summary.selected,
            summary.electrons,
            summary.muons,
            summary.pions
        );
        Ok(summary)
    }
}

/// Everything a finished run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub calibration: CalibrationTable,
    pub results: Vec<EventResult>,
    pub summary: RunSummary,
}

/// Run the full pipeline on one run's events.
///
/// The calibration sample is the first `sample_size` events; all events are
/// then classified with the run's cut definitions.
///
/// # Errors
/// Returns a [`RunError`] naming the failed stage if the run is aborted.
pub fn process_run(
    run_id: RunId,
    events: &[Event],
    config: &ProcessingConfig,
    cuts: &RunCutMap,
    quality: &RunQualityMap,
) -> Result<RunOutput> {
    let mut processor = RunProcessor::new(run_id, config.clone())?;
    processor.check_quality(quality)?;
    let calibration = processor.calibrate(events)?.clone();
    let results = processor.process(events, cuts.get(&run_id))?;
    let summary = processor.finish()?;
    Ok(RunOutput {
        calibration,
        results,
        summary,
    })
}

/// Results whose species matches `|pdg|`.
#[must_use]
pub fn filter_by_species(results: &[EventResult], pdg: i32) -> Vec<&EventResult> {
    let wanted = pdg.unsigned_abs();
    results
        .iter()
        .filter(|result| result.pid.code() == wanted)
        .collect()
}
