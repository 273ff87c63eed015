use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use turnweave_core::jsonl::write_events;
use turnweave_parsers::IncrementalNormalizer;

/// Stream a JSONL file through the normalizer and print canonical events.
/// Lines that are not JSON are skipped and counted.
pub fn run_normalize(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut normalizer = IncrementalNormalizer::new();
    let mut events = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        events.extend(normalizer.push_line(&line));
    }

    if normalizer.skipped() > 0 {
        tracing::warn!(
            "skipped {} of {} line(s) in {}",
            normalizer.skipped(),
            normalizer.lines_seen(),
            path.display()
        );
    }

    write_events(&events, std::io::stdout().lock()).context("Failed to write events")?;
    Ok(())
}
