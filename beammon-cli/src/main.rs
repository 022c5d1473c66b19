//! Command-line interface for beam monitor timing calibration and particle ID.
//!
//! Reads JSON Lines event files, calibrates the reference channels of a run
//! and writes per-event features, calibration tables and species-filtered
//! samples.
#![allow(
    clippy::uninlined_format_args,
    clippy::too_many_lines,
    clippy::needless_pass_by_value
)]

use clap::{Parser, Subcommand};

use beammon_algorithms::{filter_by_species, process_run, RunOutput, TimingCalibrator};
use beammon_core::{
    CalibrationError, ConfigLoadError, Event, FailedStage, ParticleCode, ProcessingConfig,
    RunError, RunId,
};
use beammon_io::{
    first_run_id, load_processing_config, save_processing_config, DataFileWriter,
    EventFileReader, RunConfigStore,
};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    BeammonIo(#[from] beammon_io::Error),

    #[error("{0}")]
    Core(#[from] beammon_core::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("no run id given and none found in {0}")]
    MissingRunId(PathBuf),

    #[error("unsupported PDG code {0}; expected 0, 11, 13 or 211")]
    UnknownPdg(i32),
}

/// Beam monitor timing calibration and particle identification.
#[derive(Parser)]
#[command(name = "beammon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Input event file (JSON Lines)
    #[arg(short, long)]
    events: PathBuf,

    /// Run configuration document with cut boxes and quality flags
    #[arg(short, long)]
    config: PathBuf,

    /// Run id; defaults to the run id of the first event
    #[arg(short, long)]
    run: Option<RunId>,

    /// Processing configuration (layout and calibration settings)
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Number of leading events used for calibration
    #[arg(long)]
    sample_size: Option<usize>,

    /// Process events on a single thread
    #[arg(long)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate, extract features and classify every event of a run
    Process {
        #[command(flatten)]
        run: RunArgs,

        /// Per-event CSV output
        #[arg(short, long)]
        output: PathBuf,

        /// Calibration table CSV output
        #[arg(long)]
        calibration_output: Option<PathBuf>,
    },

    /// Fit the reference channel timing of a run
    Calibrate {
        /// Input event file (JSON Lines)
        #[arg(short, long)]
        events: PathBuf,

        /// Processing configuration (layout and calibration settings)
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Number of leading events used for calibration
        #[arg(long)]
        sample_size: Option<usize>,

        /// Calibration table CSV output
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the events classified as one species
    Filter {
        #[command(flatten)]
        run: RunArgs,

        /// PDG code to keep (sign ignored; 0 keeps unidentified events)
        #[arg(short, long, allow_hyphen_values = true)]
        pdg: i32,

        /// Filtered JSON Lines output
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Report the quality flag and cut boxes of a run
    CheckRun {
        /// Run configuration document
        #[arg(short, long)]
        config: PathBuf,

        /// Run id
        #[arg(short, long)]
        run: RunId,
    },

    /// Write the default processing configuration as a template
    Layout {
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn processing_config(
    layout: Option<&Path>,
    sample_size: Option<usize>,
    sequential: bool,
) -> std::result::Result<ProcessingConfig, ConfigLoadError> {
    let mut config = match layout {
        Some(path) => load_processing_config(path)?,
        None => ProcessingConfig::default(),
    };
    if let Some(size) = sample_size {
        config.calibration = config.calibration.with_sample_size(size);
    }
    if sequential {
        config = config.with_parallel(false);
    }
    config.validate()?;
    Ok(config)
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let start = Instant::now();
    let events = EventFileReader::open(path)?.read_events()?;
    info!(
        "Read {} events from {} in {:.2}s",
        events.len(),
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(events)
}

/// Attributes a configuration failure to the run it stopped.
fn config_load_failure(run_id: RunId, err: ConfigLoadError) -> CliError {
    beammon_core::Error::from(RunError::new(run_id, FailedStage::ConfigLoad, err)).into()
}

/// Load everything a run needs and push it through the pipeline.
///
/// The run id is resolved first so configuration failures can name it.
fn run_pipeline(args: &RunArgs) -> Result<(Vec<Event>, RunOutput)> {
    let events = read_events(&args.events)?;
    let run_id = args
        .run
        .or_else(|| first_run_id(&events))
        .ok_or_else(|| CliError::MissingRunId(args.events.clone()))?;
    let config = processing_config(args.layout.as_deref(), args.sample_size, args.sequential)
        .map_err(|err| config_load_failure(run_id, err))?;
    let store = RunConfigStore::from_path(&args.config)
        .map_err(|err| config_load_failure(run_id, err))?;

    let start = Instant::now();
    let output = process_run(run_id, &events, &config, store.cuts(), store.quality())?;
    info!(
        "Processed run {} in {:.2}s",
        run_id,
        start.elapsed().as_secs_f64()
    );
    Ok((events, output))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Process {
            run,
            output,
            calibration_output,
        } => {
            let (_, result) = run_pipeline(&run)?;

            DataFileWriter::create(&output)?.write_results_csv(&result.results)?;
            if let Some(path) = calibration_output {
                DataFileWriter::create(&path)?.write_calibration_csv(&result.calibration)?;
            }

            let summary = &result.summary;
            println!("Run {}", summary.run_id);
            println!("Events: {}", summary.events);
            println!("Selected: {}", summary.selected);
            for species in ParticleCode::SPECIES {
                println!("  {:<9} {}", species.name(), summary.count(species));
            }
            if let Some(tof) = summary.mean_tof {
                println!("Mean TOF: {:.3} ns", tof);
            }
            if let Some(act) = summary.mean_act {
                println!("Mean charge sum: {:.1}", act);
            }
            println!("Results written to {}", output.display());
        }

        Commands::Calibrate {
            events,
            layout,
            sample_size,
            output,
        } => {
            let config = processing_config(layout.as_deref(), sample_size, false)?;
            let events = read_events(&events)?;
            let table = TimingCalibrator::new(config.calibration.clone())
                .calibrate_layout(&events, &config.layout)?;

            DataFileWriter::create(&output)?.write_calibration_csv(&table)?;
            for (key, entry) in table.iter() {
                println!(
                    "{:>3} {:>3}  mean {:>10.3}  sigma {:>7.3}  ({} hits)",
                    key.module, key.channel, entry.mean, entry.sigma, entry.samples
                );
            }
            println!("Calibration written to {}", output.display());
        }

        Commands::Filter { run, pdg, output } => {
            let species = ParticleCode::from_pdg(pdg).ok_or(CliError::UnknownPdg(pdg))?;
            let (events, result) = run_pipeline(&run)?;
            let selected = filter_by_species(&result.results, pdg);

            DataFileWriter::create(&output)?.write_filtered_jsonl(&events, &selected)?;
            println!(
                "Wrote {} {} events of {} to {}",
                selected.len(),
                species,
                events.len(),
                output.display()
            );
        }

        Commands::CheckRun { config, run } => {
            let store =
                RunConfigStore::from_path(&config).map_err(|err| config_load_failure(run, err))?;
            let verdict = if store.is_good_run(run) { "good" } else { "bad" };
            println!("Run {}: {}", run, verdict);
            match store.cuts_for(run) {
                Some(cuts) => {
                    for species in ParticleCode::SPECIES {
                        match cuts.box_for(species) {
                            Some(cut) => println!(
                                "  {:<9} tof [{}, {}]  act [{}, {}]",
                                species.name(),
                                cut.tof_min,
                                cut.tof_max,
                                cut.act_min,
                                cut.act_max
                            ),
                            None => println!("  {:<9} no box", species.name()),
                        }
                    }
                }
                None => println!("  no cut definitions"),
            }
        }

        Commands::Layout { output } => {
            save_processing_config(&output, &ProcessingConfig::default())?;
            println!("Default configuration written to {}", output.display());
        }
    }

    Ok(())
}
