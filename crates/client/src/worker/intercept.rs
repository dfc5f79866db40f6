//! Fetch interceptor.
//!
//! Every request ends in exactly one [`FetchOutcome`] or an error:
//!
//! - Static assets are served cache-first. A miss goes to the network and a
//!   2xx response is written back; a miss with no network is an error.
//! - Everything else is served network-first. A 2xx response overwrites the
//!   cached copy; a rejected network attempt falls back to the cache, and
//!   with no cached copy the request gets no response.
//! - Non-GET requests go straight to the network and never touch the cache.
//!
//! Network attempts and cache writes run on spawned tasks, so a caller that
//! stops waiting does not cancel them. Writes never delay the response.

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{CacheStorage, Error, RequestKey, StoredResponse};
use tokio::task::JoinHandle;

use super::classify::RequestClass;
use super::registry::WorkerConfig;
use crate::fetch::{Fetcher, Request};

/// Where the response handed to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    CacheFallback,
    None,
}

/// Terminal outcome of one intercepted request.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Served from the active generation without touching the network.
    Cache(StoredResponse),
    /// Served from the network.
    Network(StoredResponse),
    /// Network rejected; served from the active generation.
    CacheFallback(StoredResponse),
    /// Network rejected and nothing cached.
    NoResponse,
}

impl FetchOutcome {
    pub fn source(&self) -> ResponseSource {
        match self {
            FetchOutcome::Cache(_) => ResponseSource::Cache,
            FetchOutcome::Network(_) => ResponseSource::Network,
            FetchOutcome::CacheFallback(_) => ResponseSource::CacheFallback,
            FetchOutcome::NoResponse => ResponseSource::None,
        }
    }

    pub fn response(&self) -> Option<&StoredResponse> {
        match self {
            FetchOutcome::Cache(r) | FetchOutcome::Network(r) | FetchOutcome::CacheFallback(r) => Some(r),
            FetchOutcome::NoResponse => None,
        }
    }

    pub fn into_response(self) -> Option<StoredResponse> {
        match self {
            FetchOutcome::Cache(r) | FetchOutcome::Network(r) | FetchOutcome::CacheFallback(r) => Some(r),
            FetchOutcome::NoResponse => None,
        }
    }
}

/// A handled request plus the cache write it scheduled, if any.
#[derive(Debug)]
pub struct Responded {
    pub class: RequestClass,
    pub outcome: FetchOutcome,
    write: Option<JoinHandle<()>>,
}

impl Responded {
    fn new(class: RequestClass, outcome: FetchOutcome, write: Option<JoinHandle<()>>) -> Self {
        Self { class, outcome, write }
    }

    pub fn has_pending_write(&self) -> bool {
        self.write.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Wait for the background cache write scheduled by this request.
    ///
    /// Write failures are logged by the task itself and not reported here.
    pub async fn wait_until(&mut self) {
        if let Some(write) = self.write.take()
            && let Err(e) = write.await
        {
            tracing::warn!("cache write task failed: {e}");
        }
    }
}

/// Everything a request handler needs, cheaply cloneable into tasks.
#[derive(Clone)]
pub(crate) struct Interceptor {
    pub(crate) config: Arc<WorkerConfig>,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
}

type NetworkResult = Result<(StoredResponse, Option<JoinHandle<()>>), Error>;

impl Interceptor {
    fn generation(&self) -> &str {
        self.config.version.as_str()
    }

    pub(crate) async fn handle(&self, request: Request) -> Result<Responded, Error> {
        let class = self.config.classify(&request.url);

        if request.method != reqwest::Method::GET {
            tracing::debug!("bypassing cache for {} {}", request.method, request.url);
            let response = self.fetcher.fetch(&request).await?;
            return Ok(Responded::new(class, FetchOutcome::Network(response), None));
        }

        match class {
            RequestClass::Static => self.cache_first(request).await,
            RequestClass::Dynamic => self.network_first(request).await,
        }
    }

    async fn cache_first(&self, request: Request) -> Result<Responded, Error> {
        let key = request.key();
        match self.storage.get(self.generation(), &key).await {
            Ok(Some(cached)) => {
                tracing::debug!("cache hit for {}", request.url);
                return Ok(Responded::new(RequestClass::Static, FetchOutcome::Cache(cached), None));
            }
            Ok(None) => tracing::debug!("cache miss for {}", request.url),
            Err(e) => tracing::warn!(url = %request.url, "cache lookup failed, treating as miss: {e}"),
        }

        let (response, write) = self.spawn_network(request).await.map_err(|e| Error::TaskFailed(e.to_string()))??;
        Ok(Responded::new(RequestClass::Static, FetchOutcome::Network(response), write))
    }

    async fn network_first(&self, request: Request) -> Result<Responded, Error> {
        let key = request.key();
        let network = self
            .spawn_network(request)
            .await
            .map_err(|e| Error::TaskFailed(e.to_string()))?;

        match network {
            Ok((response, write)) => Ok(Responded::new(RequestClass::Dynamic, FetchOutcome::Network(response), write)),
            Err(err) if err.is_network_failure() => {
                tracing::debug!(url = %key.url, "network failed, falling back to cache: {err}");
                let outcome = match self.storage.get(self.generation(), &key).await {
                    Ok(Some(cached)) => FetchOutcome::CacheFallback(cached),
                    Ok(None) => FetchOutcome::NoResponse,
                    Err(e) => {
                        tracing::warn!(url = %key.url, "cache fallback lookup failed: {e}");
                        FetchOutcome::NoResponse
                    }
                };
                Ok(Responded::new(RequestClass::Dynamic, outcome, None))
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch on a detached task; a 2xx response schedules a cache write.
    fn spawn_network(&self, request: Request) -> JoinHandle<NetworkResult> {
        let this = self.clone();
        tokio::spawn(async move {
            let response = this.fetcher.fetch(&request).await?;
            let write = if response.is_success() {
                Some(this.spawn_cache_write(request.key(), response.clone()))
            } else {
                tracing::debug!("not caching {} (status {})", request.url, response.status);
                None
            };
            Ok((response, write))
        })
    }

    fn spawn_cache_write(&self, key: RequestKey, response: StoredResponse) -> JoinHandle<()> {
        let storage = Arc::clone(&self.storage);
        let generation = self.generation().to_string();
        tokio::spawn(async move {
            match storage.put(&generation, &key, &response).await {
                Ok(()) => tracing::debug!("cached {} in {}", key.url, generation),
                Err(e) => tracing::warn!(url = %key.url, %generation, "cache write failed: {e}"),
            }
        })
    }
}
