//! Writers for per-event results, calibration tables and filtered samples.

use crate::{Error, Result};
use beammon_algorithms::EventResult;
use beammon_core::{CalibrationTable, Event};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header of the per-event CSV.
pub const RESULTS_HEADER: &str = "event,tof_t0t1,act_sum,t4_hit,hole0,hole1,t0_hits,t1_hits,selected,pid";

/// Header of the calibration CSV.
pub const CALIBRATION_HEADER: &str = "module,channel,mean,sigma,amplitude,samples,iterations";

#[derive(Serialize)]
struct TaggedEvent<'a> {
    #[serde(flatten)]
    event: &'a Event,
    pdg: u32,
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

/// Buffered writer for beam monitor outputs.
pub struct DataFileWriter<W: Write = BufWriter<File>> {
    writer: W,
}

impl DataFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl<W: Write> DataFileWriter<W> {
    /// Wraps an existing writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes per-event features and classification as CSV.
    ///
    /// Undefined observables are written as empty fields.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_results_csv(&mut self, results: &[EventResult]) -> Result<()> {
        writeln!(self.writer, "{RESULTS_HEADER}")?;

        for r in results {
            let f = &r.features;
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{}",
                r.index,
                optional(f.tof_t0t1),
                optional(f.act_sum),
                flag(f.t4_hit),
                flag(f.hole0),
                flag(f.hole1),
                f.t0_hits,
                f.t1_hits,
                flag(r.selected()),
                r.pid.code()
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes fitted calibration entries as CSV, in channel order.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_calibration_csv(&mut self, table: &CalibrationTable) -> Result<()> {
        writeln!(self.writer, "{CALIBRATION_HEADER}")?;

        for (key, entry) in table.iter() {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{}",
                key.module,
                key.channel,
                entry.mean,
                entry.sigma,
                entry.amplitude,
                entry.samples,
                entry.iterations
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes the events behind `selected` as JSON Lines, each tagged with
    /// its `pdg` code.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if a result points past `events`.
    pub fn write_filtered_jsonl(&mut self, events: &[Event], selected: &[&EventResult]) -> Result<()> {
        for result in selected {
            let event = events.get(result.index).ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "result index {} out of range for {} events",
                    result.index,
                    events.len()
                ))
            })?;
            let tagged = TaggedEvent {
                event,
                pdg: result.pid.code(),
            };
            serde_json::to_writer(&mut self.writer, &tagged)?;
            self.writer.write_all(b"\n")?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beammon_core::{CalibrationEntry, ChannelKey, EventFeatures, HitRecord, ParticleCode};
    use tempfile::NamedTempFile;

    fn result(index: usize, pid: ParticleCode) -> EventResult {
        EventResult {
            index,
            features: EventFeatures {
                t0_avg: Some(2201.0),
                t1_avg: Some(2215.0),
                tof_t0t1: Some(14.0),
                act_sum: Some(5000.0),
                t4_hit: true,
                hole0: false,
                hole1: false,
                t0_hits: 4,
                t1_hits: 4,
            },
            pid,
        }
    }

    #[test]
    fn test_write_results_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DataFileWriter::create(file.path()).unwrap();
        let mut invalid = result(1, ParticleCode::Unknown);
        invalid.features.tof_t0t1 = None;
        invalid.features.t0_hits = 3;

        writer
            .write_results_csv(&[result(0, ParticleCode::Electron), invalid])
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], RESULTS_HEADER);
        assert_eq!(lines[1], "0,14,5000,1,0,0,4,4,1,11");
        assert_eq!(lines[2], "1,,5000,1,0,0,3,4,0,0");
    }

    #[test]
    fn test_write_calibration_csv() {
        let table = CalibrationTable::from_entries([(
            ChannelKey::new(0, 2),
            CalibrationEntry {
                mean: 2200.5,
                sigma: 3.75,
                amplitude: 812.0,
                samples: 5000,
                iterations: 7,
            },
        )])
        .unwrap();
        let mut writer = DataFileWriter::new(Vec::new());
        writer.write_calibration_csv(&table).unwrap();

        let content = String::from_utf8(writer.into_inner()).unwrap();
        assert!(content.starts_with(CALIBRATION_HEADER));
        assert!(content.contains("0,2,2200.5,3.75,812,5000,7"));
    }

    #[test]
    fn test_write_filtered_jsonl() {
        let events = vec![
            Event::new(vec![HitRecord::new(0, 1, 10.0, 2200.0)]).with_run_id(1610),
            Event::new(vec![]).with_run_id(1610),
        ];
        let results = [result(1, ParticleCode::Muon)];
        let selected: Vec<&EventResult> = results.iter().collect();

        let mut writer = DataFileWriter::new(Vec::new());
        writer.write_filtered_jsonl(&events, &selected).unwrap();
        let content = String::from_utf8(writer.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["pdg"], 13);
        assert_eq!(value["run_id"], 1610);
        assert_eq!(value["hits"].as_array().map(Vec::len), Some(0));

        let stray = [result(5, ParticleCode::Muon)];
        let stray: Vec<&EventResult> = stray.iter().collect();
        assert!(matches!(
            DataFileWriter::new(Vec::new()).write_filtered_jsonl(&events, &stray),
            Err(Error::InvalidFormat(_))
        ));
    }
}
