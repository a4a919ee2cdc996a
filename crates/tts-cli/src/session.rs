//! Resolving persistence settings from the config file and flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tts_persistence::{JsonObject, PersistenceConfig};

/// Values given on the command line; each one replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub local_dir: Option<PathBuf>,
}

/// Load the config file (default location unless overridden) and apply
/// the command line overrides.
///
/// Without a configured `local_dir` the CLI keeps its fallback copies in the
/// platform data directory so they survive between invocations.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<PersistenceConfig> {
    let path = overrides
        .config
        .clone()
        .unwrap_or_else(PersistenceConfig::config_path);
    let mut config = PersistenceConfig::load_from(&path)
        .with_context(|| format!("load config {}", path.display()))?;

    if let Some(base_url) = &overrides.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(local_dir) = &overrides.local_dir {
        config.local_dir = Some(local_dir.clone());
    }
    if config.local_dir.is_none() {
        config.local_dir = Some(PersistenceConfig::default_local_dir());
    }

    tracing::debug!(base_url = %config.base_url, local_dir = ?config.local_dir, "Resolved configuration");
    Ok(config)
}

/// Parse a command line JSON argument that must be an object.
pub fn parse_object(text: &str) -> Result<JsonObject> {
    match serde_json::from_str::<Value>(text).context("parse JSON argument")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, got {other}"),
    }
}
