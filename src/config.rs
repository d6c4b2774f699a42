use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Public API root of the provider.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Ceiling for inbound JSON and form bodies.
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const PORT_ENV: &str = "PORT";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Relay configuration. Built once at startup and shared read-only by every
/// request handler.
#[derive(Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Chat model used by `/translate`.
    #[serde(default = "default_translate_model")]
    pub translate: String,
    /// Used by `/transcribe` when the client names no model.
    #[serde(default = "default_transcribe_model")]
    pub transcribe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_target")]
    pub default_target: String,
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_translate_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_transcribe_model() -> String {
    "whisper-1".to_string()
}

fn default_target() -> String {
    "English".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            translate: default_translate_model(),
            transcribe: default_transcribe_model(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            default_target: default_target(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            base_url: default_base_url(),
            api_key: None,
            models: ModelsConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("models", &self.models)
            .field("translation", &self.translation)
            .finish()
    }
}

impl RelayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the first config file found, or defaults when there is none.
    /// An explicit path must exist.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable source. Empty values count as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port.trim().parse().map_err(|_| {
                RelayError::config(format!("{} must be a port number, got '{}'", PORT_ENV, port))
            })?;
        }
        if let Some(url) = lookup(BASE_URL_ENV) {
            self.base_url = url;
        }
        Ok(())
    }

    /// Join an endpoint path onto the upstream base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("whisper-relay.toml")];

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("whisper-relay").join("config.toml"));
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("whisper-relay").join("config.toml"));
        paths.push(home.join(".whisper-relay.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
