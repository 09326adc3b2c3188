//! Advisor configuration.
//!
//! TOML file at `~/.config/krishi/config.toml` (or an explicit path).
//! Every field has a default so an absent or partial file still yields a
//! working configuration. Secrets are never stored in the file itself,
//! only the names of environment variables that hold them.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AdvisoryError;

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Ollama-compatible endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name. Image flows need a vision-capable model.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding a bearer key, for proxied deployments.
    /// Unset for a local endpoint.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            api_key_env: None,
        }
    }
}

impl BackendConfig {
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| env::var(name).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Bounded retry for transport-level backend failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay; each retry doubles it and adds jitter.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// News collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Environment variable holding the TheNewsAPI token.
    #[serde(default = "default_news_key_env")]
    pub api_key_env: String,

    /// How long a fetched article list stays fresh.
    #[serde(default = "default_cache_secs")]
    pub cache_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_news_key_env(),
            cache_secs: default_cache_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub news: NewsConfig,
}

impl AdvisorConfig {
    /// `~/.config/krishi/config.toml`, if a config directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("krishi").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, AdvisoryError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| AdvisoryError::Config(format!("{}: {e}", path.display())))
    }

    /// Load the default path if it exists; fall back to defaults otherwise.
    /// A malformed file is reported, not silently ignored.
    pub fn load_or_default() -> Result<Self, AdvisoryError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "llama3.2-vision:11b".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_news_key_env() -> String {
    "NEWS_API_KEY".to_string()
}

fn default_cache_secs() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = AdvisorConfig::default();
        assert_eq!(config.backend.endpoint, "http://127.0.0.1:11434");
        assert_eq!(config.backend.timeout_secs, 120);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.news.cache_secs, 3600);
        assert!(config.backend.api_key_env.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nmodel = \"qwen2.5:7b\"\n\n[retry]\nmax_retries = 1"
        )
        .unwrap();

        let config = AdvisorConfig::load(file.path()).unwrap();
        assert_eq!(config.backend.model, "qwen2.5:7b");
        assert_eq!(config.backend.endpoint, "http://127.0.0.1:11434");
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay_ms, 250);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"not a table\"").unwrap();
        let err = AdvisorConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, AdvisoryError::Config(_)));
    }
}
