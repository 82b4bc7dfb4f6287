//! Append-only CSV logs for raw sentences and derived headings.
//!
//! Each session appends to two files named after the vessel:
//!
//! ```text
//! <data-dir>/<vessel>_NMEA.csv      # timestamp,raw sentence
//! <data-dir>/<vessel>_Heading.csv   # timestamp,heading
//! ```
//!
//! No header row. Files are opened in append mode and never truncated, so
//! successive sessions for the same vessel continue the same files.
//! Each record is built in memory and written with a single `write_all`.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use jiff::Timestamp;

use crate::model::HeadingSample;

/// Errors that can occur while recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("cannot append to {}: {source}", path.display())]
    Append { path: PathBuf, source: io::Error },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed record {line} in {}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

pub type Result<T> = core::result::Result<T, RecordError>;

/// The two open log files of a session. Closed on drop.
#[derive(Debug)]
pub struct Recorder {
    raw: Sink,
    heading: Sink,
}

impl Recorder {
    /// Opens (creating if needed) both logs in append mode.
    ///
    /// If the heading log can't be opened, a raw log created by this call
    /// is removed again, so a failed open leaves no files behind.
    pub fn open(raw_path: &Path, heading_path: &Path) -> Result<Self> {
        let raw_existed = raw_path.exists();
        let raw = Sink::open(raw_path)?;
        match Sink::open(heading_path) {
            Ok(heading) => Ok(Self { raw, heading }),
            Err(e) => {
                drop(raw);
                if !raw_existed {
                    let _ = fs::remove_file(raw_path);
                }
                Err(e)
            }
        }
    }

    /// Appends `timestamp,sentence` to the raw log.
    pub fn record_raw(&mut self, at: Timestamp, line: &str) -> Result<()> {
        self.raw.append(&[&format_timestamp(at), line])
    }

    /// Appends `timestamp,heading` to the heading log.
    pub fn record_heading(&mut self, at: Timestamp, heading: f64) -> Result<()> {
        self.heading
            .append(&[&format_timestamp(at), &format_heading(heading)])
    }
}

#[derive(Debug)]
struct Sink {
    path: PathBuf,
    file: fs::File,
}

impl Sink {
    fn open(path: &Path) -> Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| RecordError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn append(&mut self, fields: &[&str]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(fields)?;
        let record = writer
            .into_inner()
            .map_err(|e| self.append_error(e.into_error()))?;

        self.file
            .write_all(&record)
            .and_then(|()| self.file.flush())
            .map_err(|e| self.append_error(e))
    }

    fn append_error(&self, source: io::Error) -> RecordError {
        RecordError::Append {
            path: self.path.clone(),
            source,
        }
    }
}

/// ISO-8601 UTC with microsecond precision, e.g. `2024-05-01T12:00:00.123456Z`.
pub fn format_timestamp(at: Timestamp) -> String {
    format!("{at:.6}")
}

/// Shortest form that reads back exactly, always with a decimal: `87.6`, `0.0`.
pub fn format_heading(heading: f64) -> String {
    format!("{heading:?}")
}

/// Reads a heading log back into samples.
pub fn read_heading_log(path: &Path) -> Result<Vec<HeadingSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        let malformed = |reason: String| RecordError::Malformed {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let (Some(at), Some(heading), None) = (record.get(0), record.get(1), record.get(2)) else {
            return Err(malformed(format!("expected 2 fields, got {}", record.len())));
        };
        let at: Timestamp = at
            .parse()
            .map_err(|e| malformed(format!("bad timestamp '{at}': {e}")))?;
        let heading: f64 = heading
            .parse()
            .map_err(|e| malformed(format!("bad heading '{heading}': {e}")))?;
        samples.push(HeadingSample { at, heading });
    }
    Ok(samples)
}

/// Reads a raw log back as `(timestamp, sentence)` rows.
#[cfg(test)]
pub fn read_raw_log(path: &Path) -> Result<Vec<(Timestamp, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let at = record.get(0).and_then(|s| s.parse().ok());
        let (Some(at), Some(line)) = (at, record.get(1)) else {
            return Err(RecordError::Malformed {
                path: path.to_path_buf(),
                line: record.position().map_or(0, csv::Position::line),
                reason: "expected timestamp and sentence".into(),
            });
        };
        rows.push((at, line.to_string()));
    }
    Ok(rows)
}
