//! Agent configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFLINE_AGENT_*)
//! 2. TOML config file (if OFFLINE_AGENT_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The resulting [`AgentConfig`] is the process-wide context for one deployed
//! build: it is loaded once, validated, and injected into the agent.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheVersion;

mod validation;

pub use validation::ConfigError;

/// Agent configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFLINE_AGENT_*)
/// 2. TOML config file (if OFFLINE_AGENT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Build-scoped version tag. Every partition name embeds it; changing it
    /// invalidates all caches written by earlier builds.
    ///
    /// Set via OFFLINE_AGENT_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Origin of the application the agent serves.
    ///
    /// Set via OFFLINE_AGENT_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFLINE_AGENT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via OFFLINE_AGENT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds for non-navigation fetches.
    ///
    /// Set via OFFLINE_AGENT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How long a navigation waits on the network before falling back to cache.
    ///
    /// Set via OFFLINE_AGENT_NAVIGATION_TIMEOUT_MS environment variable.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Maximum bytes to accept per response.
    ///
    /// Set via OFFLINE_AGENT_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Paths pre-cached into the static partition at install.
    #[serde(default = "default_critical_resources")]
    pub critical_resources: Vec<String>,

    /// Path of the designated offline document.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,

    /// Path prefix of API requests (never cached).
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Build tool convention for stylesheet bundles.
    #[serde(default = "default_stylesheet_bundle_path")]
    pub stylesheet_bundle_path: String,

    /// Build tool convention for static script bundles.
    #[serde(default = "default_static_bundle_path")]
    pub static_bundle_path: String,
}

fn default_version_tag() -> String {
    "v3".into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offline-agent-cache.sqlite")
}

fn default_user_agent() -> String {
    "offline-agent/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_navigation_timeout_ms() -> u64 {
    500
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_critical_resources() -> Vec<String> {
    vec!["/".into(), "/offline".into(), "/manifest.json".into()]
}

fn default_offline_path() -> String {
    "/offline".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_stylesheet_bundle_path() -> String {
    "/_next/static/css/".into()
}

fn default_static_bundle_path() -> String {
    "/_next/static/".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version_tag: default_version_tag(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            max_bytes: default_max_bytes(),
            critical_resources: default_critical_resources(),
            offline_path: default_offline_path(),
            api_prefix: default_api_prefix(),
            stylesheet_bundle_path: default_stylesheet_bundle_path(),
            static_bundle_path: default_static_bundle_path(),
        }
    }
}

impl AgentConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Navigation network-first wait as Duration.
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Partition naming for the configured version tag.
    pub fn cache_version(&self) -> CacheVersion {
        CacheVersion::new(&self.version_tag)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFLINE_AGENT_`
    /// 2. TOML file from `OFFLINE_AGENT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFLINE_AGENT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFLINE_AGENT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from an already assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
