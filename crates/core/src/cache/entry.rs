//! Request keys and response snapshots held in a cache store.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::hash::compute_request_key;

/// Identity of a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    /// Key for a GET request, the only method the worker caches.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), url: url.into() }
    }

    /// Hex digest used as the row key inside a store.
    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// Snapshot of an HTTP response.
///
/// The body is an owned buffer, so cloning a response before caching it
/// never consumes the copy handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// URL the response was served from.
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self { url: url.into(), status, headers: Vec::new(), body: body.into() }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// A row of a cache store, as returned by inspection queries.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntry {
    pub cache_name: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub stored_at: String,
}

/// One cache generation and the number of entries it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_get() {
        let key = RequestKey::get("http://localhost:8000/");
        assert_eq!(key.method, "GET");
        assert_eq!(key.hash(), RequestKey::get("http://localhost:8000/").hash());
        assert_ne!(key.hash(), RequestKey::get("http://localhost:8000/about/").hash());
    }

    #[test]
    fn test_success_range() {
        assert!(StoredResponse::new("/", 200, "ok").is_success());
        assert!(StoredResponse::new("/", 204, "").is_success());
        assert!(!StoredResponse::new("/", 304, "").is_success());
        assert!(!StoredResponse::new("/", 404, "missing").is_success());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let mut response = StoredResponse::new("/static/css/main.css", 200, "body{}");
        response.headers.push(("Content-Type".into(), "text/css".into()));
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn test_clone_is_independent_copy() {
        let original = StoredResponse::new("/", 200, "home");
        let mut copy = original.clone();
        copy.body = Bytes::from_static(b"changed");
        assert_eq!(original.body, Bytes::from_static(b"home"));
    }
}
