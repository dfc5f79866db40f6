//! Offline cache manager.
//!
//! [`ServiceWorker`] owns one immutable [`WorkerConfig`] and reacts to the
//! three lifecycle triggers:
//!
//! - `install`: populate the configured generation with the manifest
//! - `handle_fetch`: route one request through the cache strategy
//! - `activate`: delete every generation except the configured one
//!
//! Deploying a new cache version means building a new worker with a new
//! config over the same storage, installing it, then activating it.

pub mod activate;
pub mod classify;
pub mod install;
pub mod intercept;
pub mod registry;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{CacheStorage, Error};
use tokio::sync::RwLock;

use crate::fetch::{Fetcher, Request};

pub use activate::ActivationReport;
pub use classify::{RequestClass, classify};
pub use install::{InstallFailure, InstallReport};
pub use intercept::{FetchOutcome, Responded, ResponseSource};
pub use registry::{CacheVersion, WorkerConfig};

use intercept::Interceptor;

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never activate.
    Redundant,
}

/// A worker bound to one cache version.
pub struct ServiceWorker {
    interceptor: Interceptor,
    state: RwLock<WorkerState>,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            interceptor: Interceptor { config: Arc::new(config), storage, fetcher },
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.interceptor.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.interceptor.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Move to `next` if the current state is one of `allowed`.
    async fn transition(&self, allowed: &[WorkerState], next: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.write().await;
        if !allowed.contains(&*state) {
            return Err(Error::InvalidState(format!("cannot move from {:?} to {:?}", *state, next)));
        }
        let previous = *state;
        *state = next;
        Ok(previous)
    }

    async fn set_state(&self, next: WorkerState) {
        *self.state.write().await = next;
    }

    /// Install trigger.
    ///
    /// Reinstalling the same version is allowed and leaves exactly the
    /// manifest entries in place.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(
            &[WorkerState::Parsed, WorkerState::Installed, WorkerState::Activated, WorkerState::Redundant],
            WorkerState::Installing,
        )
        .await?;
        tracing::info!(generation = %self.config().version, manifest = self.config().manifest.len(), "installing worker");

        let interceptor = &self.interceptor;
        match install::run(&interceptor.config, &interceptor.storage, &interceptor.fetcher).await {
            Ok(report) => {
                self.set_state(WorkerState::Installed).await;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(generation = %self.config().version, "install failed, worker is redundant: {e}");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Activate trigger. Requires a completed install.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let previous = self
            .transition(&[WorkerState::Installed, WorkerState::Activated], WorkerState::Activating)
            .await?;

        match activate::run(&self.config().version, self.storage()).await {
            Ok(report) => {
                self.set_state(WorkerState::Activated).await;
                tracing::info!(
                    generation = %report.active,
                    deleted = report.deleted.len(),
                    orphaned = report.orphaned.len(),
                    "worker activated"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(previous).await;
                Err(e)
            }
        }
    }

    /// Fetch trigger for one outgoing request.
    pub async fn handle_fetch(&self, request: Request) -> Result<Responded, Error> {
        self.interceptor.handle(request).await
    }

    /// Resolve `url` against the origin and handle it as a GET.
    pub async fn fetch_url(&self, url: &str) -> Result<Responded, Error> {
        let url = self.config().resolve(url)?;
        self.handle_fetch(Request::get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::{MockFetcher, memory_storage};
    use swcache_core::{InstallPolicy, RequestKey};

    const ORIGIN: &str = "http://localhost:8000";

    fn worker(version: &str, manifest: &[&str], storage: &Arc<dyn CacheStorage>, fetcher: &Arc<MockFetcher>) -> ServiceWorker {
        let config = WorkerConfig::new(version, ORIGIN, manifest).unwrap();
        ServiceWorker::new(config, Arc::clone(storage), fetcher.clone())
    }

    fn site() -> Arc<MockFetcher> {
        let fetcher = MockFetcher::new();
        fetcher.serve(&format!("{ORIGIN}/"), 200, "<html>home</html>");
        fetcher.serve(&format!("{ORIGIN}/static/css/main.css"), 200, "body{margin:0}");
        fetcher
    }

    #[tokio::test]
    async fn test_deploy_upgrade_scenario() {
        let storage = memory_storage().await;
        let fetcher = site();
        let manifest = ["/", "/static/css/main.css"];

        let v1 = worker("v1", &manifest, &storage, &fetcher);
        v1.install().await.unwrap();
        assert_eq!(storage.keys("v1").await.unwrap().len(), 2);

        fetcher.set_online(false);
        let responded = v1.fetch_url("/static/css/main.css").await.unwrap();
        assert_eq!(responded.outcome.source(), ResponseSource::Cache);
        assert_eq!(responded.outcome.response().unwrap().body.as_ref(), b"body{margin:0}");

        fetcher.set_online(true);
        let v2 = worker("v2", &manifest, &storage, &fetcher);
        v2.install().await.unwrap();
        let report = v2.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert_eq!(storage.names().await.unwrap(), vec!["v2".to_string()]);
        let keys = storage.keys("v2").await.unwrap();
        assert!(keys.contains(&RequestKey::get(format!("{ORIGIN}/"))));
        assert!(keys.contains(&RequestKey::get(format!("{ORIGIN}/static/css/main.css"))));
    }

    #[tokio::test]
    async fn test_lifecycle_states() {
        let storage = memory_storage().await;
        let sw = worker("v1", &["/"], &storage, &site());
        assert_eq!(sw.state().await, WorkerState::Parsed);

        sw.install().await.unwrap();
        assert_eq!(sw.state().await, WorkerState::Installed);

        sw.activate().await.unwrap();
        assert_eq!(sw.state().await, WorkerState::Activated);

        sw.activate().await.unwrap();
        assert_eq!(sw.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_before_install_rejected() {
        let storage = memory_storage().await;
        storage.open("v0").await.unwrap();
        let sw = worker("v1", &["/"], &storage, &site());

        assert!(matches!(sw.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(storage.names().await.unwrap(), vec!["v0".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_install_makes_worker_redundant() {
        let storage = memory_storage().await;
        storage.open("v1").await.unwrap();
        let fetcher = site();
        let sw = worker("v2", &["/", "/static/js/main.js"], &storage, &fetcher);

        assert!(matches!(sw.install().await, Err(Error::InstallFailed { .. })));
        assert_eq!(sw.state().await, WorkerState::Redundant);
        assert!(matches!(sw.activate().await, Err(Error::InvalidState(_))));
        assert!(storage.has("v1").await.unwrap());
        assert!(!storage.has("v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_lenient_install_activates() {
        let storage = memory_storage().await;
        let fetcher = site();
        let config = WorkerConfig::new("v1", ORIGIN, &["/", "/static/js/main.js"])
            .unwrap()
            .with_install_policy(InstallPolicy::Lenient);
        let sw = ServiceWorker::new(config, Arc::clone(&storage), fetcher);

        let report = sw.install().await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(sw.state().await, WorkerState::Installed);
        sw.activate().await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_url_rejects_bad_input() {
        let storage = memory_storage().await;
        let sw = worker("v1", &["/"], &storage, &site());

        assert!(matches!(sw.fetch_url("   ").await, Err(Error::InvalidUrl(_))));
        assert!(matches!(sw.fetch_url("ftp://localhost/file").await, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_refresh_then_offline_returns_newer_body() {
        let storage = memory_storage().await;
        let fetcher = site();
        let sw = worker("v1", &["/"], &storage, &fetcher);
        sw.install().await.unwrap();

        fetcher.serve(&format!("{ORIGIN}/"), 200, "<html>home v2</html>");
        sw.fetch_url("/").await.unwrap().wait_until().await;

        fetcher.set_online(false);
        let responded = sw.fetch_url("/").await.unwrap();
        assert_eq!(responded.outcome.source(), ResponseSource::CacheFallback);
        assert_eq!(responded.outcome.response().unwrap().body.as_ref(), b"<html>home v2</html>");
    }
}
