//! Cache version registry.
//!
//! The active generation name and the manifest are fixed when the worker is
//! built and read-only afterwards. Changing the version is the only way to
//! invalidate everything cached under the previous one.

use std::fmt;

use serde::Serialize;
use swcache_core::{AppConfig, Error, InstallPolicy};
use url::Url;

use super::classify::{RequestClass, classify};
use crate::fetch::{parse_origin, resolve};

/// Name of one cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(version: impl Into<String>) -> Result<Self, Error> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(Error::InvalidInput("cache version cannot be empty".into()));
        }
        Ok(Self(version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub version: CacheVersion,
    pub origin: Url,
    /// Manifest URLs, resolved against `origin`, in declaration order.
    pub manifest: Vec<Url>,
    pub static_suffixes: Vec<String>,
    pub install_policy: InstallPolicy,
    pub install_concurrency: usize,
}

impl WorkerConfig {
    /// Build a configuration with the default suffixes and a strict install.
    pub fn new(version: &str, origin: &str, manifest: &[&str]) -> Result<Self, Error> {
        let defaults = AppConfig::default();
        let origin = parse_origin(origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = resolve_manifest(&origin, manifest.iter().copied())?;
        Ok(Self {
            version: CacheVersion::new(version)?,
            origin,
            manifest,
            static_suffixes: defaults.static_suffixes,
            install_policy: defaults.install_policy,
            install_concurrency: defaults.install_concurrency,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = resolve_manifest(&origin, config.manifest.iter().map(String::as_str))?;
        Ok(Self {
            version: CacheVersion::new(config.cache_version.clone())?,
            origin,
            manifest,
            static_suffixes: config.static_suffixes.clone(),
            install_policy: config.install_policy,
            install_concurrency: config.install_concurrency.max(1),
        })
    }

    pub fn with_install_policy(mut self, policy: InstallPolicy) -> Self {
        self.install_policy = policy;
        self
    }

    /// Resolve a page-relative URL against the origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        classify(url, &self.static_suffixes)
    }
}

fn resolve_manifest<'a>(origin: &Url, entries: impl Iterator<Item = &'a str>) -> Result<Vec<Url>, Error> {
    let mut manifest: Vec<Url> = Vec::new();
    for entry in entries {
        let url = resolve(origin, entry).map_err(|e| Error::InvalidUrl(format!("manifest entry {entry:?}: {e}")))?;
        if !manifest.contains(&url) {
            manifest.push(url);
        }
    }
    Ok(manifest)
}
