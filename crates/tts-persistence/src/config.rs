//! Persistence configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PersistError, Result};

/// Default REST base for the data API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/data";

/// Configuration for the store registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Base URL of the data API, e.g. `http://localhost:8000/api/data`.
    pub base_url: String,

    /// How long a fetched store value is served from memory.
    pub cache_ttl_ms: u64,

    /// Timeout applied to every backend request.
    pub request_timeout_secs: u64,

    /// Directory for the file-backed fallback store.
    ///
    /// When `None`, the fallback lives in memory for the session only.
    pub local_dir: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_ms: 5000,
            request_timeout_secs: 30,
            local_dir: None,
        }
    }
}

impl PersistenceConfig {
    /// Create a config pointing at the given data API.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load config from a TOML file, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(PersistError::Config {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        toml::from_str(&content).map_err(|e| PersistError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the default config file path.
    pub fn config_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("persistence.toml"))
            .unwrap_or_else(|| PathBuf::from("persistence.toml"))
    }

    /// Get the default directory for the file-backed fallback store.
    pub fn default_local_dir() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.data_dir().join("stores"))
            .unwrap_or_else(|| PathBuf::from("stores"))
    }

    /// Cache time-to-live as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL without a trailing slash.
    pub fn data_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Base of the transformer endpoints: the data base with its `/data` suffix
    /// replaced by `/transformer`.
    pub fn transformer_base(&self) -> String {
        let base = self.data_base();
        let root = base.strip_suffix("/data").unwrap_or(base);
        format!("{root}/transformer")
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "TransformerTestStudio", "TTS")
}
