//! Named cache generations backed by SQLite.
//!
//! A cache store maps a request identity (method + absolute URL) to a full
//! response snapshot. Stores are addressed by generation name and are only
//! ever evicted as a whole. It supports:
//!
//! - Hash-addressed entries (SHA-256 of method and URL)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Transactional bulk writes for all-or-nothing installs

pub mod connection;
pub mod entry;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{CacheEntry, CacheSummary, RequestKey, StoredResponse};

use async_trait::async_trait;

/// Storage collaborator used by the worker.
///
/// Every method addresses a store by generation name. Implementations must
/// treat a `put` to an existing key as an overwrite.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Names of every store, in creation order.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Look up a stored response. `None` on a miss or an unknown store.
    async fn get(&self, name: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error>;

    /// Store one response, creating the store if needed.
    async fn put(&self, name: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error>;

    /// Store many responses atomically: either all are committed or none.
    async fn put_all(&self, name: &str, entries: &[(RequestKey, StoredResponse)]) -> Result<(), Error>;

    /// Delete a store and all of its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Request keys held by a store.
    async fn keys(&self, name: &str) -> Result<Vec<RequestKey>, Error>;
}
