//! cache_delete tool implementation.
//!
//! Drops one stale generation. The active generation is refused; activation
//! is the way to clean up around it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Error};

use crate::error::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Name of the generation to delete.
    pub generation: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub deleted: String,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(cache: &CacheDb, active: &str, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    let generation = params.generation.trim();
    if generation.is_empty() {
        return Err(Error::InvalidInput("generation cannot be empty".into()).into());
    }
    if generation == active {
        return Err(Error::InvalidInput(format!("{generation} is the active generation")).into());
    }

    if !cache.delete_cache(generation).await? {
        return Err(Error::CacheMiss(generation.to_string()).into());
    }
    tracing::info!(generation, "deleted cache generation on request");

    json_result(&CacheDeleteOutput { deleted: generation.to_string() })
}
