use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use turnweave_core::jsonl::read_records;
use turnweave_core::{ConversationTurn, Role};
use turnweave_live::{JsonlHistorySource, SessionView};

use crate::config::load_config;
use crate::output::{OutputFormat, print_snapshot};

/// Local turn given on the command line.
#[derive(Debug, Deserialize)]
struct OptimisticArg {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    content: String,
}

impl From<OptimisticArg> for ConversationTurn {
    fn from(arg: OptimisticArg) -> Self {
        let mut turn = ConversationTurn::optimistic_user(arg.content);
        if let Some(id) = arg.id.filter(|id| !id.trim().is_empty()) {
            turn.id = id;
        }
        if let Some(role) = arg.role {
            turn.role = role;
        }
        turn
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OptimisticInput {
    One(OptimisticArg),
    Many(Vec<OptimisticArg>),
}

fn parse_optimistic(raw: &[String]) -> Result<Vec<ConversationTurn>> {
    let mut turns = Vec::new();
    for value in raw {
        let input: OptimisticInput = serde_json::from_str(value)
            .with_context(|| format!("Invalid --optimistic value: {value}"))?;
        match input {
            OptimisticInput::One(arg) => turns.push(arg.into()),
            OptimisticInput::Many(args) => turns.extend(args.into_iter().map(Into::into)),
        }
    }
    Ok(turns)
}

fn read_jsonl(path: &Path) -> Result<Vec<Value>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_records(BufReader::new(file)).with_context(|| format!("Failed to read {}", path.display()))
}

/// Replay a session: history first, then local turns, then the live stream,
/// the order in which they reach a client that opens a running session.
pub fn run_replay(
    config_path: Option<&Path>,
    history: &Path,
    live: Option<&Path>,
    optimistic: &[String],
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let optimistic = parse_optimistic(optimistic)?;

    let Some(session_id) = history.file_stem().and_then(|s| s.to_str()) else {
        bail!("Cannot derive a session id from {}", history.display());
    };
    let dir = history
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let source = JsonlHistorySource::new(dir);

    let mut view = SessionView::new(config);
    let ticket = view.switch_session(session_id);

    let loaded = view
        .refresh_history(&ticket, &source)
        .with_context(|| format!("Failed to load history for session {session_id}"))?;
    tracing::info!("replayed {loaded} history event(s)");

    for turn in optimistic {
        view.add_optimistic(&ticket, turn)?;
    }

    if let Some(path) = live {
        let records = read_jsonl(path)?;
        let appended = view.apply_live(&ticket, &records)?;
        tracing::info!("applied {appended} live event(s)");
    }

    print_snapshot(&view.render(), format)
}
