//! Shared engine configuration types.
//!
//! The session engine and the CLI read `turnweave.toml` using these types.
//! Every field has a default so an empty or partial file is valid.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "turnweave.toml";

/// Top-level engine configuration (persisted as `turnweave.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub buffers: BufferSettings,
    #[serde(default)]
    pub merge: MergeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferSettings {
    /// Capacity of the live canonical event ring.
    #[serde(default = "default_raw_event_cap")]
    pub raw_event_cap: usize,
    /// Capacity of the history canonical event ring.
    #[serde(default = "default_history_event_cap")]
    pub history_event_cap: usize,
    /// Most recent timeline items kept for display.
    #[serde(default = "default_timeline_display_cap")]
    pub timeline_display_cap: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            raw_event_cap: default_raw_event_cap(),
            history_event_cap: default_history_event_cap(),
            timeline_display_cap: default_timeline_display_cap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Merge adjacent same-role turns before reconciliation.
    #[serde(default = "default_true")]
    pub merge_adjacent: bool,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            merge_adjacent: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_raw_event_cap() -> usize {
    500
}

fn default_history_event_cap() -> usize {
    2000
}

fn default_timeline_display_cap() -> usize {
    200
}

impl EngineConfig {
    /// Parse a TOML document, clamping capacities to at least one.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(raw)?;
        config.clamp();
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Ring buffers cannot have zero capacity.
    pub fn clamp(&mut self) -> bool {
        let before = self.buffers.clone();
        self.buffers.raw_event_cap = self.buffers.raw_event_cap.max(1);
        self.buffers.history_event_cap = self.buffers.history_event_cap.max(1);
        self.buffers.timeline_display_cap = self.buffers.timeline_display_cap.max(1);
        before != self.buffers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = EngineConfig::from_toml_str("").expect("parse toml");
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.buffers.raw_event_cap, 500);
        assert!(cfg.merge.merge_adjacent);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
[buffers]
timeline_display_cap = 25
"#,
        )
        .expect("parse toml");
        assert_eq!(cfg.buffers.timeline_display_cap, 25);
        assert_eq!(cfg.buffers.history_event_cap, 2000);
        assert!(cfg.merge.merge_adjacent);
    }

    #[test]
    fn zero_capacities_are_clamped() {
        let cfg = EngineConfig::from_toml_str(
            r#"
[buffers]
raw_event_cap = 0

[merge]
merge_adjacent = false
"#,
        )
        .expect("parse toml");
        assert_eq!(cfg.buffers.raw_event_cap, 1);
        assert!(!cfg.merge.merge_adjacent);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg = EngineConfig::from_toml_str(
            r#"
[buffers]
legacy_cap = 9
"#,
        )
        .expect("parse toml");
        assert_eq!(cfg.buffers, BufferSettings::default());
    }

    #[test]
    fn serialized_config_roundtrips() {
        let mut cfg = EngineConfig::default();
        cfg.buffers.raw_event_cap = 42;
        let raw = cfg.to_toml_string().expect("serialize");
        assert_eq!(EngineConfig::from_toml_str(&raw).expect("parse"), cfg);
    }
}
