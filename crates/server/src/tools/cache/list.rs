//! cache_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, CacheSummary};

use crate::error::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Generation the running worker reads and writes.
    pub active: String,
    /// All generations present in storage, oldest first.
    pub caches: Vec<CacheSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb, active: &str) -> Result<CallToolResult, McpError> {
    let caches = cache.list_caches().await?;
    json_result(&CacheListOutput { active: active.to_string(), caches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::result_json;

    #[tokio::test]
    async fn test_list_empty() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let output = result_json(&list_impl(&cache, "v1").await.unwrap());
        assert_eq!(output["active"], "v1");
        assert_eq!(output["caches"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_counts_entries() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.create_cache("v0").await.unwrap();
        cache
            .put_entry(
                "v1",
                &swcache_core::RequestKey::get("http://localhost:8000/"),
                &swcache_core::StoredResponse::new("http://localhost:8000/", 200, "home"),
            )
            .await
            .unwrap();

        let output = result_json(&list_impl(&cache, "v1").await.unwrap());
        let caches = output["caches"].as_array().unwrap();
        assert_eq!(caches.len(), 2);
        let v1 = caches.iter().find(|c| c["name"] == "v1").unwrap();
        assert_eq!(v1["entries"], 1);
    }
}
