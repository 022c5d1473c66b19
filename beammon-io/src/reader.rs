//! Memory-mapped event file readers.
//!
//! Events are stored as JSON Lines, one event per line:
//! `{"run_id": 1610, "hits": [{"module": 0, "channel": 0, "charge": 812.0, "time": 2201.3}]}`.

use crate::{Error, Result};
use beammon_core::{Event, RunId};
use log::debug;
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A memory-mapped file reader.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blank lines with their 1-based line numbers.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.mmap
            .split(|&b| b == b'\n')
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_ascii()))
            .filter(|(_, line)| !line.is_empty())
    }
}

/// Reader for JSON Lines event files.
pub struct EventFileReader {
    reader: MappedFileReader,
}

impl EventFileReader {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: MappedFileReader::open(path)?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Decode every event in file order.
    ///
    /// # Errors
    /// Returns [`Error::InvalidEvent`] with the line number of the first bad line.
    pub fn read_events(&self) -> Result<Vec<Event>> {
        let lines: Vec<(usize, &[u8])> = self.reader.lines().collect();
        let events = lines
            .par_iter()
            .map(|&(line, bytes)| {
                serde_json::from_slice::<Event>(bytes).map_err(|source| Error::InvalidEvent {
                    path: self.reader.path().to_path_buf(),
                    line,
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Read {} events ({} bytes) from {}",
            events.len(),
            self.reader.len(),
            self.reader.path().display()
        );
        Ok(events)
    }
}

/// Run id of the first event that carries one.
#[must_use]
pub fn first_run_id(events: &[Event]) -> Option<RunId> {
    events.iter().find_map(|event| event.run_id)
}
