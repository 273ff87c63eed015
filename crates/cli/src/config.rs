use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use turnweave_runtime_config::{CONFIG_FILE_NAME, EngineConfig};

/// Get the config directory path (~/.config/turnweave/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("turnweave"))
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

fn read_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let mut config: EngineConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    if config.clamp() {
        tracing::warn!(
            "zero buffer capacity in {} raised to 1",
            path.display()
        );
    }
    Ok(config)
}

/// Load engine config. An explicit path must exist; the default location
/// falls back to built-in defaults when absent.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let path = config_path()?;
    if path.exists() {
        read_config(&path)
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        Ok(EngineConfig::default())
    }
}

pub fn show_config(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    let content = config
        .to_toml_string()
        .context("Failed to serialize config")?;
    print!("{content}");
    Ok(())
}
