pub mod assemble;
pub mod merge;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod timeline;

use anyhow::Context;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use turnweave_core::ConversationTurn;
use turnweave_core::jsonl::read_records;

pub use assemble::{assemble_live_turns, assemble_turns, turns_from_messages_snapshot};
pub use merge::{TURN_SEPARATOR, merge_adjacent_turns};
pub use reconcile::{ensure_unique_ids, prune_confirmed, reconcile};
pub use session::{RunSignal, RunStatus, SessionSnapshot, SessionTicket, SessionView, SyncError};
pub use state::fold_state;
pub use timeline::{TimelineFolder, fold_timeline};

/// One delivery from an external collaborator.
#[derive(Debug, Clone)]
pub enum LiveUpdate {
    /// Full confirmed history for the session; replaces what was loaded.
    HistoryLoaded(Vec<Value>),
    /// Records pushed by the live transport.
    RecordsAppended(Vec<Value>),
    LocalTurn(ConversationTurn),
    Run(RunSignal),
    FetchFailed(String),
}

/// Persistent storage of confirmed records, keyed by session id.
pub trait HistorySource {
    fn load_history(&self, session_id: &str) -> anyhow::Result<Vec<Value>>;
}

/// History kept as one `<session_id>.jsonl` file per session in a directory.
#[derive(Debug, Clone)]
pub struct JsonlHistorySource {
    dir: PathBuf,
}

impl JsonlHistorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.jsonl"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl HistorySource for JsonlHistorySource {
    fn load_history(&self, session_id: &str) -> anyhow::Result<Vec<Value>> {
        let path = self.session_path(session_id);
        let file = File::open(&path)
            .with_context(|| format!("failed to open history {}", path.display()))?;
        let records = read_records(BufReader::new(file))
            .with_context(|| format!("failed to read history {}", path.display()))?;
        Ok(records)
    }
}
