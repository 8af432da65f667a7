//! User configuration loaded from `~/.config/streamhunt/config.toml`.
//!
//! Every key is optional:
//!
//! ```toml
//! proxy_url = "http://127.0.0.1:8080"
//! user_agent = "Mozilla/5.0 ..."
//! connect_timeout_secs = 10
//! request_timeout_secs = 30
//! adapter_timeout_secs = 60
//! disabled = ["wecima"]
//! environment = "browser"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::ResolutionEngine;
use crate::fetch::{Fetcher, HttpSettings, ReqwestFetcher, UnavailableFetcher, DEFAULT_USER_AGENT};
use crate::flags::Environment;
use crate::providers::builtin_registry;

/// Parsed configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Proxy for the proxied fetcher. Without it proxied fetches fail.
    pub proxy_url: Option<String>,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Per-adapter time limit; `0` disables it.
    pub adapter_timeout_secs: u64,
    /// Provider ids to leave out of every resolution.
    pub disabled: Vec<String>,
    pub environment: Environment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            adapter_timeout_secs: 60,
            disabled: Vec::new(),
            environment: Environment::Native,
        }
    }
}

impl Config {
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    #[must_use]
    pub fn adapter_timeout(&self) -> Option<Duration> {
        (self.adapter_timeout_secs > 0).then(|| Duration::from_secs(self.adapter_timeout_secs))
    }

    /// Build an engine over the bundled adapters with these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built, e.g. for a
    /// malformed proxy URL.
    pub fn engine(&self) -> Result<ResolutionEngine> {
        let settings = self.http_settings();
        let fetcher: Arc<dyn Fetcher> = Arc::new(
            ReqwestFetcher::with_settings(&settings).context("failed to build HTTP client")?,
        );
        let proxied: Arc<dyn Fetcher> = match &self.proxy_url {
            Some(url) => Arc::new(
                ReqwestFetcher::proxied(url, &settings)
                    .with_context(|| format!("invalid proxy URL {url}"))?,
            ),
            None => Arc::new(UnavailableFetcher),
        };

        let mut registry = builtin_registry();
        for id in &self.disabled {
            if registry.get_source(id).is_none() && registry.get_embed(id).is_none() {
                tracing::warn!("Config disables unknown provider '{}'", id);
            }
            registry.disable(id);
        }

        let engine = ResolutionEngine::new(Arc::new(registry), fetcher, proxied);
        Ok(match self.adapter_timeout() {
            Some(limit) => engine.with_adapter_timeout(limit),
            None => engine,
        })
    }
}

/// Load `~/.config/streamhunt/config.toml`.
///
/// Returns defaults if the file doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    let path = config_path();
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load a config file from an explicit path, which must exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

/// Return the path to the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streamhunt")
        .join("config.toml")
}
