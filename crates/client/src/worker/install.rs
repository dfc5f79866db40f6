//! Install handler: pre-populate the active generation with the manifest.
//!
//! Manifest fetches run concurrently with bounded parallelism. Successful
//! responses are committed in a single transaction after every fetch has
//! settled, so a strict install either caches the whole manifest or nothing.

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{CacheStorage, Error, InstallPolicy, RequestKey, StoredResponse};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::registry::WorkerConfig;
use crate::fetch::{Fetcher, Request};

/// A manifest URL that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallFailure {
    pub url: String,
    pub reason: String,
}

/// Result of a completed install.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub generation: String,
    pub policy: InstallPolicy,
    /// Cached URLs, in manifest order.
    pub cached: Vec<String>,
    /// Only populated under the lenient policy.
    pub failed: Vec<InstallFailure>,
}

type ManifestFetch = (usize, Request, Result<StoredResponse, Error>);

/// Fetch one manifest entry. Non-2xx statuses count as failures.
async fn fetch_entry(fetcher: &dyn Fetcher, request: &Request) -> Result<StoredResponse, Error> {
    let response = fetcher.fetch(request).await?;
    if !response.is_success() {
        return Err(Error::InstallFailed { url: request.url.to_string(), reason: format!("status {}", response.status) });
    }
    Ok(response)
}

fn failure_reason(err: &Error) -> String {
    match err {
        Error::InstallFailed { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

pub(crate) async fn run(
    config: &WorkerConfig, storage: &Arc<dyn CacheStorage>, fetcher: &Arc<dyn Fetcher>,
) -> Result<InstallReport, Error> {
    let generation = config.version.as_str();

    let semaphore = Arc::new(Semaphore::new(config.install_concurrency.max(1)));
    let mut tasks: JoinSet<ManifestFetch> = JoinSet::new();

    for (index, url) in config.manifest.iter().enumerate() {
        let fetcher = Arc::clone(fetcher);
        let semaphore = Arc::clone(&semaphore);
        let request = Request::get(url.clone());
        tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => fetch_entry(fetcher.as_ref(), &request).await,
                Err(e) => Err(Error::TaskFailed(e.to_string())),
            };
            (index, request, result)
        });
    }

    let mut fetched: Vec<(usize, RequestKey, StoredResponse)> = Vec::with_capacity(config.manifest.len());
    let mut failed: Vec<(usize, InstallFailure)> = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        let (index, request, result) = joined.map_err(|e| Error::TaskFailed(e.to_string()))?;
        match result {
            Ok(response) => fetched.push((index, request.key(), response)),
            Err(err) => {
                let reason = failure_reason(&err);
                tracing::warn!(url = %request.url, %reason, generation, "manifest fetch failed");

                if config.install_policy == InstallPolicy::Strict {
                    tasks.abort_all();
                    return Err(Error::InstallFailed { url: request.url.to_string(), reason });
                }
                failed.push((index, InstallFailure { url: request.url.to_string(), reason }));
            }
        }
    }

    fetched.sort_by_key(|(index, _, _)| *index);
    failed.sort_by_key(|(index, _)| *index);

    let cached: Vec<String> = fetched.iter().map(|(_, key, _)| key.url.clone()).collect();
    let entries: Vec<(RequestKey, StoredResponse)> =
        fetched.into_iter().map(|(_, key, response)| (key, response)).collect();

    // The generation is only created once the batch is known to commit.
    if entries.is_empty() {
        storage.open(generation).await?;
    } else {
        storage.put_all(generation, &entries).await?;
    }

    tracing::info!(
        generation,
        cached = cached.len(),
        failed = failed.len(),
        "install populated cache generation"
    );

    Ok(InstallReport {
        generation: generation.to_string(),
        policy: config.install_policy,
        cached,
        failed: failed.into_iter().map(|(_, failure)| failure).collect(),
    })
}
