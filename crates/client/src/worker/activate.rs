//! Activation handler: garbage-collect stale cache generations.

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{CacheStorage, Error};

use super::registry::CacheVersion;

/// Result of an activation pass.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub active: String,
    pub deleted: Vec<String>,
    /// Stale generations whose deletion failed; retried on the next activation.
    pub orphaned: Vec<String>,
}

impl ActivationReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty()
    }
}

/// Delete every generation except `active`.
///
/// Listing failures abort activation. A failed delete is logged and the
/// generation is reported as orphaned.
pub(crate) async fn run(active: &CacheVersion, storage: &Arc<dyn CacheStorage>) -> Result<ActivationReport, Error> {
    let names = storage.names().await?;
    let mut deleted = Vec::new();
    let mut orphaned = Vec::new();

    for name in names.into_iter().filter(|name| name != active.as_str()) {
        match storage.delete(&name).await {
            Ok(_) => {
                tracing::info!(generation = %name, "deleted stale cache generation");
                deleted.push(name);
            }
            Err(e) => {
                tracing::warn!(generation = %name, "failed to delete stale cache generation: {e}");
                orphaned.push(name);
            }
        }
    }

    Ok(ActivationReport { active: active.to_string(), deleted, orphaned })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::mock::{FlakyStorage, memory_storage};

    #[tokio::test]
    async fn test_deletes_all_but_active() {
        let storage = memory_storage().await;
        for name in ["adiabatic-v0.9.0", "v1", "v2"] {
            storage.open(name).await.unwrap();
        }

        let report = run(&CacheVersion::new("v2").unwrap(), &storage).await.unwrap();
        assert_eq!(report.active, "v2");
        assert_eq!(report.deleted.len(), 2);
        assert!(report.is_clean());
        assert_eq!(storage.names().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_active_missing_leaves_storage_empty() {
        let storage = memory_storage().await;
        storage.open("v1").await.unwrap();

        let report = run(&CacheVersion::new("v2").unwrap(), &storage).await.unwrap();
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert!(storage.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_is_orphaned_then_retried() {
        let flaky = FlakyStorage::new(memory_storage().await);
        for name in ["v1", "v2", "v3"] {
            flaky.open(name).await.unwrap();
        }
        flaky.fail_delete("v1");
        let storage: Arc<dyn CacheStorage> = flaky.clone();

        let report = run(&CacheVersion::new("v3").unwrap(), &storage).await.unwrap();
        assert_eq!(report.deleted, vec!["v2".to_string()]);
        assert_eq!(report.orphaned, vec!["v1".to_string()]);
        assert!(!report.is_clean());

        flaky.heal();
        let report = run(&CacheVersion::new("v3").unwrap(), &storage).await.unwrap();
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert_eq!(storage.names().await.unwrap(), vec!["v3".to_string()]);
    }
}
