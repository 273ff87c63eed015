use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use turnweave_core::{StateChange, TimelineItem};
use turnweave_live::{RunStatus, SessionSnapshot};

/// Output format for a rendered session.
#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_snapshot(snapshot: &SessionSnapshot, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, snapshot)?;
            writeln!(out)?;
        }
        OutputFormat::Text => write_text(&mut out, snapshot)?,
    }
    Ok(())
}

fn write_text(out: &mut impl Write, snapshot: &SessionSnapshot) -> Result<()> {
    if let Some(session_id) = &snapshot.session_id {
        writeln!(out, "session {session_id} ({})", run_label(&snapshot.run))?;
    }
    if let Some(error) = &snapshot.last_error {
        writeln!(out, "warning: {error}")?;
    }

    writeln!(out, "\n== turns ({}) ==", snapshot.turns.len())?;
    for turn in &snapshot.turns {
        writeln!(out, "[{}] {}", turn.role, turn.id)?;
        for line in turn.content.lines() {
            writeln!(out, "  {line}")?;
        }
    }
    if snapshot.pending_optimistic > 0 {
        writeln!(out, "({} pending local turn(s))", snapshot.pending_optimistic)?;
    }

    writeln!(out, "\n== timeline ({}) ==", snapshot.timeline.len())?;
    for item in &snapshot.timeline {
        writeln!(out, "{} {}", format_timestamp(item.timestamp()), describe(item))?;
    }

    if let Some(state) = &snapshot.state {
        writeln!(out, "\n== state ==")?;
        writeln!(out, "{}", serde_json::to_string_pretty(state)?)?;
    }
    Ok(())
}

fn run_label(run: &RunStatus) -> String {
    match run {
        RunStatus::Idle => "idle".to_string(),
        RunStatus::Running { .. } => "running".to_string(),
        RunStatus::Finished { .. } => "finished".to_string(),
        RunStatus::Errored { message, .. } => format!("errored: {message}"),
    }
}

fn describe(item: &TimelineItem) -> String {
    match item {
        TimelineItem::Tool(tool) => {
            let status = match tool.status {
                turnweave_core::ToolStatus::Running => "running",
                turnweave_core::ToolStatus::Completed => "completed",
                turnweave_core::ToolStatus::Done => "done",
            };
            let mut line = format!("tool {} {} [{status}]", tool.id, tool.name);
            if !tool.args.is_empty() {
                line.push_str(&format!(" args={}", tool.args));
            }
            if let Some(result) = &tool.result {
                line.push_str(&format!(" -> {}", truncate(result, 80)));
            }
            line
        }
        TimelineItem::Artifact(artifact) => {
            let keys: Vec<&str> = artifact.delta.keys().map(String::as_str).collect();
            format!("artifact {} {}", artifact.id, keys.join(","))
        }
        TimelineItem::State(state) => match &state.change {
            StateChange::Delta(delta) => {
                let keys: Vec<&str> = delta.keys().map(String::as_str).collect();
                format!("state {} delta {}", state.id, keys.join(","))
            }
            StateChange::Snapshot(_) => format!("state {} snapshot", state.id),
        },
        TimelineItem::Event(event) => format!("event {} {}", event.id, event.label),
    }
}

fn format_timestamp(seconds: Option<f64>) -> String {
    seconds
        .and_then(|s| DateTime::<Utc>::from_timestamp_millis((s * 1000.0).round() as i64))
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
