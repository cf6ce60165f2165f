//! Worker configuration loading: defaults < TOML file < `PRESS_*` env < flags.

use anyhow::{Context, Result};
use press_core::{EntryMode, WorkerConfig};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "press-worker.toml";
const ENV_PREFIX: &str = "PRESS_";

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub workspace_root: Option<PathBuf>,
    pub generator_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub entry_mode: Option<EntryMode>,
    pub backend_url: Option<String>,
}

/// Load the worker config.
///
/// A missing file is only an error when it was named explicitly.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<WorkerConfig> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?
    } else if explicit {
        anyhow::bail!("Config file not found: {}", path.display());
    } else {
        WorkerConfig::default()
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    apply_overrides(&mut config, overrides);

    config.validate().context("Invalid worker configuration")?;
    Ok(config)
}

/// Apply `PRESS_*` variables looked up through `lookup`.
pub fn apply_env<F>(config: &mut WorkerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|value| !value.trim().is_empty())
    };

    if let Some(value) = var("WORKSPACE_ROOT") {
        config.workspace_root = PathBuf::from(value);
    }
    if let Some(value) = var("GENERATOR_DIR") {
        config.generator_dir = PathBuf::from(value);
    }
    if let Some(value) = var("TEMPLATE_DIR") {
        config.template_dir = PathBuf::from(value);
    }
    if let Some(value) = var("GENERATOR_COMMAND") {
        config.generator_command = value.split_whitespace().map(str::to_string).collect();
    }
    if let Some(value) = var("ENTRY_MODE") {
        config.entry_mode = value.parse().context("PRESS_ENTRY_MODE")?;
    }
    if let Some(value) = var("GIT_AUTHOR_NAME") {
        config.git_author.name = value;
    }
    if let Some(value) = var("GIT_AUTHOR_EMAIL") {
        config.git_author.email = value;
    }
    if let Some(value) = var("BACKEND_URL") {
        config.backend.url = value;
    }
    if let Some(value) = var("BACKEND_TOKEN") {
        config.backend.token = Some(value);
    }
    if let Some(value) = var("WORKER_ID") {
        config.backend.worker_id = value;
    }
    if let Some(value) = var("POLL_INTERVAL_SECS") {
        config.poll_interval_secs = value.trim().parse().context("PRESS_POLL_INTERVAL_SECS")?;
    }
    if let Some(value) = var("HEARTBEAT_INTERVAL_SECS") {
        config.heartbeat_interval_secs = value
            .trim()
            .parse()
            .context("PRESS_HEARTBEAT_INTERVAL_SECS")?;
    }

    Ok(())
}

pub fn apply_overrides(config: &mut WorkerConfig, overrides: &Overrides) {
    if let Some(ref dir) = overrides.workspace_root {
        config.workspace_root = dir.clone();
    }
    if let Some(ref dir) = overrides.generator_dir {
        config.generator_dir = dir.clone();
    }
    if let Some(ref dir) = overrides.template_dir {
        config.template_dir = dir.clone();
    }
    if let Some(mode) = overrides.entry_mode {
        config.entry_mode = mode;
    }
    if let Some(ref url) = overrides.backend_url {
        config.backend.url = url.clone();
    }
}

/// TOML rendering with the backend token masked.
pub fn render_redacted(config: &WorkerConfig) -> Result<String> {
    let mut shown = config.clone();
    if shown.backend.token.is_some() {
        shown.backend.token = Some("***".to_string());
    }
    Ok(toml::to_string_pretty(&shown)?)
}
