//! JSONL streams of origin event records and canonical events.
//!
//! A history file is one origin record per line, in delivery order:
//! ```jsonl
//! {"id":"e1","author":"user","content":{"parts":[{"text":"ping"}]}}
//! {"id":"e2","author":"agent","content":{"parts":[{"text":"pong"}]},"actions":{"stateDelta":{"k":1}}}
//! ```
//!
//! Records stay loosely typed (`serde_json::Value`) here; shape handling
//! belongs to the normalizer. Blank lines are ignored.

use crate::trace::CanonicalEvent;
use serde_json::Value;
use std::io::{self, BufRead, Write};

/// Error types for JSONL operations
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JsonlError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error at line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

/// Iterator over the records of a JSONL reader, one `Result` per non-blank line.
///
/// Callers that must tolerate bad lines can skip the `Err` items and keep going.
pub struct RecordLines<R> {
    lines: io::Lines<R>,
    line_num: usize,
}

impl<R: BufRead> Iterator for RecordLines<R> {
    type Item = Result<Value, JsonlError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(JsonlError::Io(e))),
            };
            self.line_num += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line).map_err(|e| JsonlError::Json {
                    line: self.line_num,
                    source: e,
                }),
            );
        }
    }
}

/// Iterate records line by line
pub fn record_lines<R: BufRead>(reader: R) -> RecordLines<R> {
    RecordLines {
        lines: reader.lines(),
        line_num: 0,
    }
}

/// Read every record, failing on the first malformed line
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Value>, JsonlError> {
    record_lines(reader).collect()
}

/// Read records from a string
pub fn records_from_str(s: &str) -> Result<Vec<Value>, JsonlError> {
    read_records(io::BufReader::new(s.as_bytes()))
}

/// Write records as JSONL
pub fn write_records<W: Write>(records: &[Value], mut writer: W) -> Result<(), JsonlError> {
    for (i, record) in records.iter().enumerate() {
        serde_json::to_writer(&mut writer, record).map_err(|e| JsonlError::Json {
            line: i + 1,
            source: e,
        })?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Write canonical events as JSONL
pub fn write_events<W: Write>(events: &[CanonicalEvent], mut writer: W) -> Result<(), JsonlError> {
    for (i, event) in events.iter().enumerate() {
        serde_json::to_writer(&mut writer, event).map_err(|e| JsonlError::Json {
            line: i + 1,
            source: e,
        })?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Read canonical events from JSONL
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<CanonicalEvent>, JsonlError> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|e| JsonlError::Json {
            line: idx + 1,
            source: e,
        })?;
        events.push(event);
    }
    Ok(events)
}
