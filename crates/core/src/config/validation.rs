//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` is empty or padded with whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - a `static_suffixes` entry does not start with `.`
    /// - `install_concurrency` is outside 1..=32
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }
        if self.cache_version.trim() != self.cache_version {
            return Err(invalid("cache_version", "must not have leading or trailing whitespace"));
        }

        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.static_suffixes.is_empty() {
            return Err(invalid("static_suffixes", "must list at least one suffix"));
        }
        if let Some(bad) = self.static_suffixes.iter().find(|s| !s.starts_with('.') || s.len() < 2) {
            return Err(invalid("static_suffixes", format!("{bad:?} must look like \".css\"")));
        }

        if self.install_concurrency == 0 || self.install_concurrency > 32 {
            return Err(invalid("install_concurrency", "must be between 1 and 32"));
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

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.manifest.is_empty() {
            tracing::warn!(
                cache_version = %self.cache_version,
                "manifest is empty; install will create an empty cache generation"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: AppConfig, expected: &str) {
        let result = config.validate();
        assert!(
            matches!(&result, Err(ConfigError::Invalid { field, .. }) if field == expected),
            "expected {expected} to be rejected, got {result:?}"
        );
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_cache_version() {
        assert_invalid(AppConfig { cache_version: "  ".into(), ..Default::default() }, "cache_version");
        assert_invalid(AppConfig { cache_version: " v1".into(), ..Default::default() }, "cache_version");
    }

    #[test]
    fn test_validate_origin() {
        assert_invalid(AppConfig { origin: "localhost".into(), ..Default::default() }, "origin");
        assert_invalid(AppConfig { origin: "ftp://localhost".into(), ..Default::default() }, "origin");
    }

    #[test]
    fn test_validate_static_suffixes() {
        assert_invalid(AppConfig { static_suffixes: Vec::new(), ..Default::default() }, "static_suffixes");
        assert_invalid(AppConfig { static_suffixes: vec!["css".into()], ..Default::default() }, "static_suffixes");
        assert_invalid(AppConfig { static_suffixes: vec![".".into()], ..Default::default() }, "static_suffixes");
    }

    #[test]
    fn test_validate_install_concurrency() {
        assert_invalid(AppConfig { install_concurrency: 0, ..Default::default() }, "install_concurrency");
        assert_invalid(AppConfig { install_concurrency: 33, ..Default::default() }, "install_concurrency");
    }

    #[test]
    fn test_validate_max_bytes() {
        assert_invalid(AppConfig { max_bytes: 0, ..Default::default() }, "max_bytes");
        assert_invalid(AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() }, "max_bytes");
    }

    #[test]
    fn test_validate_timeout() {
        assert_invalid(AppConfig { timeout_ms: 50, ..Default::default() }, "timeout_ms");
        assert_invalid(AppConfig { timeout_ms: 301_000, ..Default::default() }, "timeout_ms");
    }

    #[test]
    fn test_validate_empty_user_agent() {
        assert_invalid(AppConfig { user_agent: String::new(), ..Default::default() }, "user_agent");
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            max_bytes: 1,
            timeout_ms: 100,
            install_concurrency: 1,
            manifest: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig {
            max_bytes: 50 * 1024 * 1024,
            timeout_ms: 300_000,
            install_concurrency: 32,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
