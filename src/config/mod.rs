//! Configuration loading.
//!
//! Config lives at `~/.prompt-gateway/config.json`. Every section is optional
//! and falls back to defaults. Environment variables override file values:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PROMPT_GATEWAY_GEMINI_API_KEY` | `gemini.api_key` |
//! | `PROMPT_GATEWAY_GEMINI_MODEL` | `gemini.model` |
//! | `PROMPT_GATEWAY_GEMINI_API_BASE` | `gemini.api_base` |
//! | `PROMPT_GATEWAY_DATA_DIR` | `storage.data_dir` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::persona::Persona;
use crate::providers::gemini::{DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};

const CONFIG_DIR_NAME: &str = ".prompt-gateway";
const CONFIG_FILE_NAME: &str = "config.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub persona: Persona,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
}

/// Gemini backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key. When absent, GEMINI_API_KEY / GOOGLE_API_KEY / API_KEY are used.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// HTTP transport timeout. The gateway adds no timeout of its own.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: GEMINI_API_BASE.to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the history/identity store. Defaults to `~/.prompt-gateway`.
    pub data_dir: Option<PathBuf>,
}

/// Login policy for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Require a verified identity before chatting.
    pub require_login: bool,
    /// Allow `--guest` even when login is required.
    pub allow_guest: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            require_login: false,
            allow_guest: true,
        }
    }
}

impl Config {
    /// Base directory: `~/.prompt-gateway`.
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    /// Default config file path.
    pub fn path() -> PathBuf {
        Self::dir().join(CONFIG_FILE_NAME)
    }

    /// Load from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_with_overrides(&Self::path())
    }

    /// Load from `path` (missing file → defaults), then apply environment overrides.
    pub fn load_with_overrides(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load_from_path(path)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a config file without environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| {
            GatewayError::Config(format!("invalid config at {}: {}", path.display(), e))
        })
    }

    /// Apply `PROMPT_GATEWAY_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = get("PROMPT_GATEWAY_GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = get("PROMPT_GATEWAY_GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base) = get("PROMPT_GATEWAY_GEMINI_API_BASE") {
            self.gemini.api_base = base;
        }
        if let Some(dir) = get("PROMPT_GATEWAY_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(Self::dir)
    }

    /// Path of the JSON key-value store used for history and identities.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join("store.json")
    }
}
