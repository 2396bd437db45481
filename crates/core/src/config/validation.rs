//! Configuration validation rules.
//!
//! This module provides validation logic for `AgentConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AgentConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AgentConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version_tag` is empty or contains whitespace
    /// - `origin` is not an http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `navigation_timeout_ms` is below 50ms or above `timeout_ms`
    /// - any configured path does not start with `/`
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if the critical resource set is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version_tag.is_empty() {
            return Err(invalid("version_tag", "must not be empty"));
        }
        if self.version_tag.chars().any(char::is_whitespace) {
            return Err(invalid("version_tag", "must not contain whitespace"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.navigation_timeout_ms < 50 {
            return Err(invalid("navigation_timeout_ms", "must be at least 50ms"));
        }
        if self.navigation_timeout_ms > self.timeout_ms {
            return Err(invalid("navigation_timeout_ms", "must not exceed timeout_ms"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.critical_resources.is_empty() {
            return Err(ConfigError::Missing {
                field: "critical_resources".into(),
                hint: "list at least the application root, e.g. [\"/\"]".into(),
            });
        }
        if let Some(bad) = self.critical_resources.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("critical_resources", &format!("{bad} must start with '/'")));
        }

        for (field, path) in [
            ("offline_path", &self.offline_path),
            ("api_prefix", &self.api_prefix),
            ("stylesheet_bundle_path", &self.stylesheet_bundle_path),
            ("static_bundle_path", &self.static_bundle_path),
        ] {
            if !path.starts_with('/') {
                return Err(invalid(field, "must start with '/'"));
            }
        }

        if !self.critical_resources.contains(&self.offline_path) {
            tracing::warn!(
                offline_path = %self.offline_path,
                "offline document is not pre-cached; offline navigations will use the built-in page"
            );
        }

        Ok(())
    }
}
