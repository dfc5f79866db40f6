//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// What install does when a manifest URL cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InstallPolicy {
    /// Any failure aborts the install and nothing is cached.
    #[default]
    Strict,
    /// Failures are reported and the reachable URLs are cached.
    Lenient,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the active cache generation.
    ///
    /// Bumping it is the only way to invalidate previously cached entries.
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin that relative request and manifest URLs are resolved against.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// URLs pre-populated into the cache at install.
    ///
    /// Set via SWCACHE_MANIFEST environment variable (e.g. `["/", "/about/"]`).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Path suffixes that mark a request as a static asset.
    ///
    /// Set via SWCACHE_STATIC_SUFFIXES environment variable.
    #[serde(default = "default_static_suffixes")]
    pub static_suffixes: Vec<String>,

    /// Install failure policy: "strict" or "lenient".
    ///
    /// Set via SWCACHE_INSTALL_POLICY environment variable.
    #[serde(default)]
    pub install_policy: InstallPolicy,

    /// Maximum manifest fetches in flight during install.
    ///
    /// Set via SWCACHE_INSTALL_CONCURRENCY environment variable.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_version() -> String {
    "adiabatic-v1.0.0".into()
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/static/css/main.css",
        "/static/js/main.js",
        "/static/images/favicon.ico",
        "/catalog/",
        "/products/",
        "/about/",
        "/partners/",
        "/blog/",
        "/contacts/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_static_suffixes() -> Vec<String> {
    vec![".css".into(), ".js".into()]
}

fn default_install_concurrency() -> usize {
    4
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            origin: default_origin(),
            manifest: default_manifest(),
            static_suffixes: default_static_suffixes(),
            install_policy: InstallPolicy::Strict,
            install_concurrency: default_install_concurrency(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
