//! Incremental JSONL normalizer for live origin streams.
//!
//! Converts individual JSONL lines into canonical events without needing the
//! full stream. Remembers the run/thread it has seen so callers can show
//! session metadata before the stream ends.

use anyhow::{Context, Result};
use turnweave_core::CanonicalEvent;

use crate::normalize::normalize_value;

/// Line-at-a-time normalizer that tracks stream metadata across lines.
#[derive(Debug, Default)]
pub struct IncrementalNormalizer {
    thread_id: Option<String>,
    last_run_id: Option<String>,
    lines_seen: u64,
    skipped: u64,
}

impl IncrementalNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single JSONL line into zero or more canonical events.
    ///
    /// Fails only when the line is not JSON; unrecognized record shapes
    /// produce an empty batch.
    pub fn parse_line(&mut self, line: &str) -> Result<Vec<CanonicalEvent>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Vec::new());
        }
        self.lines_seen += 1;

        let value: serde_json::Value =
            serde_json::from_str(line).context("origin record is not valid JSON")?;
        let events = normalize_value(&value);
        self.observe(&events);
        Ok(events)
    }

    /// Like [`parse_line`](Self::parse_line) but never fails: bad lines are
    /// counted and skipped so the rest of the stream keeps flowing.
    pub fn push_line(&mut self, line: &str) -> Vec<CanonicalEvent> {
        match self.parse_line(line) {
            Ok(events) => events,
            Err(e) => {
                self.skipped += 1;
                tracing::debug!("skipping origin line {}: {e:#}", self.lines_seen);
                Vec::new()
            }
        }
    }

    fn observe(&mut self, events: &[CanonicalEvent]) {
        for event in events {
            if self.thread_id.is_none() {
                self.thread_id = event.correlation.thread_id.clone();
            }
            if let Some(run_id) = event.run_id() {
                if self.last_run_id.as_deref() != Some(run_id) {
                    self.last_run_id = Some(run_id.to_string());
                }
            }
        }
    }

    /// Thread id of the first record that carried one
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Run id of the most recent record that carried one
    pub fn last_run_id(&self) -> Option<&str> {
        self.last_run_id.as_deref()
    }

    /// Lines that were not valid JSON
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }
}
