#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]
use approx::assert_abs_diff_eq;
use beammon_algorithms::{
    classify_box, filter_by_species, passes_selection, process_run, FeatureExtractor,
    RunProcessor, TimingCalibrator,
};
use beammon_core::{
    CalibrationConfig, CalibrationEntry, CalibrationTable, ChannelKey, CutBox, DetectorLayout,
    Error, Event, FailedStage, HitRecord, ParticleCode, ProcessingConfig, RunCutDefinitions,
    RunCutMap, RunError, RunQuality, RunQualityMap, RunStage,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

const RUN: u32 = 1610;

fn entry(mean: f64, sigma: f64) -> CalibrationEntry {
    CalibrationEntry {
        mean,
        sigma,
        amplitude: 250.0,
        samples: 5000,
        iterations: 6,
    }
}

/// T0 channels centred on 2200, T1 channels on 2215, all with sigma 4.
fn fixed_table() -> CalibrationTable {
    let t0 = (0..4).map(|ch| (ChannelKey::new(0, ch), entry(2200.0, 4.0)));
    let t1 = (4..8).map(|ch| (ChannelKey::new(0, ch), entry(2215.0, 4.0)));
    CalibrationTable::from_entries(t0.chain(t1)).unwrap()
}

fn electron_cuts() -> RunCutDefinitions {
    RunCutDefinitions {
        electron: Some(CutBox::new(13.0, 15.0, 0.0, 10_000.0)),
        muon: None,
        pion: None,
    }
}

fn scenario_event(t0_times: [f64; 4]) -> Event {
    let mut hits: Vec<HitRecord> = (0..4)
        .map(|ch| HitRecord::new(0, ch, 800.0, t0_times[ch as usize]))
        .collect();
    hits.extend(
        [2213.0, 2215.0, 2217.0, 2215.0]
            .into_iter()
            .zip(4..8)
            .map(|(t, ch)| HitRecord::new(0, ch, 800.0, t)),
    );
    hits.push(HitRecord::new(0, 42, 450.0, 0.0));
    hits.push(HitRecord::new(0, 18, 3000.0, 0.0));
    hits.push(HitRecord::new(0, 21, 2000.0, 0.0));
    Event::new(hits).with_run_id(RUN)
}

#[test]
fn test_scenario_electron() {
    let extractor = FeatureExtractor::new(DetectorLayout::default());
    let event = scenario_event([2200.0, 2201.0, 2202.0, 2201.0]);
    let features = extractor.extract(&event, &fixed_table());

    assert_abs_diff_eq!(features.t0_avg.unwrap(), 2201.0, epsilon = 1e-9);
    assert_abs_diff_eq!(features.t1_avg.unwrap(), 2215.0, epsilon = 1e-9);
    assert_abs_diff_eq!(features.tof_t0t1.unwrap(), 14.0, epsilon = 1e-9);
    assert_abs_diff_eq!(features.act_sum.unwrap(), 5000.0, epsilon = 1e-9);
    assert!(passes_selection(&features));

    let pid = classify_box(&features, &electron_cuts());
    assert_eq!(pid, ParticleCode::Electron);
    assert_eq!(pid.code(), 11);
}

#[test]
fn test_scenario_three_valid_t0_hits() {
    let extractor = FeatureExtractor::new(DetectorLayout::default());
    // 2230 is outside 3 sigma of the 2200 mean.
    let event = scenario_event([2200.0, 2201.0, 2202.0, 2230.0]);
    let features = extractor.extract(&event, &fixed_table());

    assert_eq!(features.t0_hits, 3);
    assert!(features.tof_t0t1.is_none());
    assert!(!passes_selection(&features));

    let everything = RunCutDefinitions {
        electron: Some(CutBox::new(f64::MIN, f64::MAX, f64::MIN, f64::MAX)),
        muon: Some(CutBox::new(f64::MIN, f64::MAX, f64::MIN, f64::MAX)),
        pion: Some(CutBox::new(f64::MIN, f64::MAX, f64::MIN, f64::MAX)),
    };
    assert_eq!(classify_box(&features, &everything), ParticleCode::Unknown);
}

#[test]
fn test_calibration_recovers_gaussian() {
    let layout = DetectorLayout::default();
    let mut rng = StdRng::seed_from_u64(42);
    let t0 = Normal::new(2200.0, 4.0).unwrap();
    let t1 = Normal::new(2214.0, 4.0).unwrap();

    let events: Vec<Event> = (0..5000)
        .map(|_| {
            let mut hits: Vec<HitRecord> = (0..4)
                .map(|ch| HitRecord::new(0, ch, 800.0, t0.sample(&mut rng)))
                .collect();
            hits.extend((4..8).map(|ch| HitRecord::new(0, ch, 800.0, t1.sample(&mut rng))));
            Event::new(hits)
        })
        .collect();

    let calibrator = TimingCalibrator::new(CalibrationConfig::default());
    let table = calibrator.calibrate_layout(&events, &layout).unwrap();
    assert_eq!(table.len(), 8);
    assert!(table.covers(&layout.t0).is_ok());
    assert!(table.covers(&layout.t1).is_ok());

    for (key, fitted) in table.iter() {
        let expected = if key.channel < 4 { 2200.0 } else { 2214.0 };
        assert_abs_diff_eq!(fitted.mean, expected, epsilon = 0.3);
        assert_abs_diff_eq!(fitted.sigma, 4.0, epsilon = 0.5);
        assert!(fitted.sigma > 0.0);
    }
}

#[test]
fn test_calibration_uses_leading_sample_only() {
    let group = DetectorLayout::default().t0;
    let mut rng = StdRng::seed_from_u64(7);
    let early = Normal::new(2200.0, 3.0).unwrap();
    let late = Normal::new(2230.0, 3.0).unwrap();

    let events: Vec<Event> = (0..2000)
        .map(|i| {
            let dist = if i < 1000 { early } else { late };
            (0..4)
                .map(|ch| HitRecord::new(0, ch, 800.0, dist.sample(&mut rng)))
                .collect()
        })
        .collect();

    let config = CalibrationConfig::default().with_sample_size(1000);
    let table = TimingCalibrator::new(config)
        .calibrate(&events, &group)
        .unwrap();
    for (_, fitted) in table.iter() {
        assert_eq!(fitted.samples, 1000);
        assert_abs_diff_eq!(fitted.mean, 2200.0, epsilon = 0.5);
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Truth {
    Electron,
    Muon,
    Vetoed,
}

/// Electrons and muons share a time of flight and differ in charge sum.
fn synthetic_run(count: usize, seed: u64) -> (Vec<Event>, Vec<Truth>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let t0 = Normal::new(2200.0, 1.0).unwrap();
    let t1 = Normal::new(2214.0, 1.0).unwrap();

    let mut events = Vec::with_capacity(count);
    let mut truth = Vec::with_capacity(count);
    for i in 0..count {
        let kind = match i % 5 {
            0 | 1 => Truth::Electron,
            2 | 3 => Truth::Muon,
            _ => Truth::Vetoed,
        };
        let mut hits: Vec<HitRecord> = (0..4)
            .map(|ch| HitRecord::new(0, ch, 800.0, t0.sample(&mut rng)))
            .collect();
        hits.extend((4..8).map(|ch| HitRecord::new(0, ch, 800.0, t1.sample(&mut rng))));
        hits.push(HitRecord::new(0, 43, 500.0, 0.0));
        let act = if kind == Truth::Electron { 5000.0 } else { 1000.0 };
        hits.push(HitRecord::new(0, 20, act, 0.0));
        if kind == Truth::Vetoed {
            hits.push(HitRecord::new(0, 9, 400.0, 0.0));
        }
        events.push(Event::new(hits).with_run_id(RUN));
        truth.push(kind);
    }
    (events, truth)
}

fn run_maps() -> (RunCutMap, RunQualityMap) {
    let mut cuts = RunCutMap::new();
    cuts.insert(
        RUN,
        RunCutDefinitions {
            electron: Some(CutBox::new(10.0, 18.0, 3000.0, 10_000.0)),
            muon: Some(CutBox::new(10.0, 18.0, 0.0, 3000.0)),
            pion: None,
        },
    );
    let mut quality = RunQualityMap::new();
    quality.insert(RUN, RunQuality::new(true));
    (cuts, quality)
}

#[test]
fn test_process_run_end_to_end() {
    let (events, truth) = synthetic_run(2500, 11);
    let (cuts, quality) = run_maps();
    let config = ProcessingConfig::default()
        .with_calibration(CalibrationConfig::default().with_sample_size(1000));

    let output = process_run(RUN, &events, &config, &cuts, &quality).unwrap();
    assert_eq!(output.calibration.len(), 8);
    assert_eq!(output.results.len(), events.len());

    for (result, kind) in output.results.iter().zip(&truth) {
        match kind {
            Truth::Electron => assert!(
                matches!(result.pid, ParticleCode::Electron | ParticleCode::Unknown),
                "event {} classified {}",
                result.index,
                result.pid
            ),
            Truth::Muon => assert!(
                matches!(result.pid, ParticleCode::Muon | ParticleCode::Unknown),
                "event {} classified {}",
                result.index,
                result.pid
            ),
            Truth::Vetoed => {
                assert!(!result.selected());
                assert_eq!(result.pid, ParticleCode::Unknown);
            }
        }
    }

    let summary = &output.summary;
    assert_eq!(summary.run_id, RUN);
    assert_eq!(summary.events, 2500);
    assert!(summary.selected <= 2000);
    // Gaussian tails lose a few percent of events to the 3 sigma window.
    assert!(summary.electrons > 900, "electrons {}", summary.electrons);
    assert!(summary.muons > 900, "muons {}", summary.muons);
    assert_eq!(summary.pions, 0);
    assert_abs_diff_eq!(summary.mean_tof.unwrap(), 14.0, epsilon = 0.1);

    let muons = filter_by_species(&output.results, -13);
    assert_eq!(muons.len(), summary.muons);
    assert!(muons.iter().all(|r| truth[r.index] == Truth::Muon));
}

#[test]
fn test_parallel_matches_sequential() {
    let (events, _) = synthetic_run(600, 3);
    let (cuts, quality) = run_maps();
    let calibration = CalibrationConfig::default().with_sample_size(600);

    let parallel = ProcessingConfig::default().with_calibration(calibration.clone());
    let sequential = parallel.clone().with_parallel(false);

    let a = process_run(RUN, &events, &parallel, &cuts, &quality).unwrap();
    let b = process_run(RUN, &events, &sequential, &cuts, &quality).unwrap();
    assert_eq!(a.results, b.results);
    assert_eq!(a.summary, b.summary);
}

#[test]
fn test_unknown_run_is_rejected() {
    let (events, _) = synthetic_run(100, 5);
    let (cuts, quality) = run_maps();
    let err = process_run(9999, &events, &ProcessingConfig::default(), &cuts, &quality)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Run(RunError {
            run_id: 9999,
            stage: FailedStage::QualityCheck,
            ..
        })
    ));
    assert!(err.to_string().contains("run 9999"));
}

#[test]
fn test_run_without_cuts_is_all_unknown() {
    let (events, _) = synthetic_run(500, 9);
    let mut quality = RunQualityMap::new();
    quality.insert(RUN, RunQuality::new(true));

    let output = process_run(RUN, &events, &ProcessingConfig::default(), &RunCutMap::new(), &quality)
        .unwrap();
    assert!(output.results.iter().all(|r| r.pid == ParticleCode::Unknown));
    assert!(output.summary.selected > 0);
    assert_eq!(output.summary.unknown, 500);
}

#[test]
fn test_processor_batches_continue_indices() {
    let (events, _) = synthetic_run(400, 21);
    let (cuts, quality) = run_maps();
    let config = ProcessingConfig::default()
        .with_calibration(CalibrationConfig::default().with_sample_size(400));

    let mut processor = RunProcessor::new(RUN, config).unwrap();
    processor.check_quality(&quality).unwrap();
    processor.calibrate(&events).unwrap();
    assert_eq!(processor.stage(), RunStage::Calibrated);

    let first = processor.process(&events[..150], cuts.get(&RUN)).unwrap();
    let second = processor.process(&events[150..], cuts.get(&RUN)).unwrap();
    assert_eq!(first.last().map(|r| r.index), Some(149));
    assert_eq!(second.first().map(|r| r.index), Some(150));
    assert_eq!(processor.stage(), RunStage::Processing);

    let summary = processor.finish().unwrap();
    assert_eq!(summary.events, 400);
    assert_eq!(processor.stage(), RunStage::Done);
    assert!(processor.process(&events, cuts.get(&RUN)).is_err());
}
