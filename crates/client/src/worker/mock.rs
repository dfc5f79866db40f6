//! Scripted network and storage doubles for worker tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use swcache_core::{CacheDb, CacheStorage, Error, RequestKey, StoredResponse};

use crate::fetch::{Fetcher, Request};

pub(crate) async fn memory_storage() -> Arc<dyn CacheStorage> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

/// Serves canned responses by URL; unknown URLs get a 404.
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, (u16, Bytes)>>,
    online: AtomicBool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            delay: Mutex::new(None),
        })
    }

    pub(crate) fn serve(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, Bytes::from(body.to_string())));
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most fetches that were ever running at the same time.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &Request) -> Result<StoredResponse, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let url = request.url.to_string();
        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or((404, Bytes::from_static(b"not found")));
        Ok(StoredResponse::new(url, status, body))
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.respond(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Delegating storage that records every generation it is asked about and
/// can be told to fail writes or deletes.
pub(crate) struct FlakyStorage {
    inner: Arc<dyn CacheStorage>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_puts: AtomicBool,
    touched: Mutex<Vec<String>>,
}

impl FlakyStorage {
    pub(crate) fn new(inner: Arc<dyn CacheStorage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_deletes: Mutex::new(HashSet::new()),
            failing_puts: AtomicBool::new(false),
            touched: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn fail_delete(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_string());
    }

    pub(crate) fn fail_puts(&self, fail: bool) {
        self.failing_puts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn heal(&self) {
        self.failing_deletes.lock().unwrap().clear();
        self.fail_puts(false);
    }

    /// Generation names passed to per-store operations, in call order.
    pub(crate) fn touched(&self) -> Vec<String> {
        self.touched.lock().unwrap().clone()
    }

    fn touch(&self, name: &str) {
        self.touched.lock().unwrap().push(name.to_string());
    }

    fn check_put(&self) -> Result<(), Error> {
        if self.failing_puts.load(Ordering::SeqCst) {
            return Err(Error::CorruptEntry("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.touch(name);
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.touch(name);
        self.inner.has(name).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.inner.names().await
    }

    async fn get(&self, name: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.touch(name);
        self.inner.get(name, key).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        self.touch(name);
        self.check_put()?;
        self.inner.put(name, key, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(RequestKey, StoredResponse)]) -> Result<(), Error> {
        self.touch(name);
        self.check_put()?;
        self.inner.put_all(name, entries).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.failing_deletes.lock().unwrap().contains(name) {
            return Err(Error::CorruptEntry(format!("injected delete failure for {name}")));
        }
        self.inner.delete(name).await
    }

    async fn keys(&self, name: &str) -> Result<Vec<RequestKey>, Error> {
        self.touch(name);
        self.inner.keys(name).await
    }
}
