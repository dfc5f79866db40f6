//! cache_get tool implementation.
//!
//! Looks up the stored entries for one URL across generations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::WorkerConfig;
use swcache_core::{CacheDb, CacheEntry, Error};

use crate::error::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached request; relative paths resolve against the configured origin.
    pub url: String,

    /// Restrict the lookup to one generation.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub entries: Vec<CacheEntry>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    cache: &CacheDb, config: &WorkerConfig, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = config.resolve(&params.url)?.to_string();
    let generation = params.generation.as_deref().map(str::trim).filter(|g| !g.is_empty());

    let entries = cache.find_entries(&url, generation).await?;
    if entries.is_empty() {
        return Err(Error::CacheMiss(url).into());
    }

    json_result(&CacheGetOutput { url, entries })
}
