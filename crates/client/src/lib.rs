//! Client code for swcache.
//!
//! This crate provides the HTTP fetch pipeline and the offline cache
//! manager (install, fetch interception, activation) built on top of it.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Fetcher, Method, Request};
pub use worker::{
    ActivationReport, CacheVersion, FetchOutcome, InstallReport, RequestClass, Responded, ResponseSource,
    ServiceWorker, WorkerConfig, WorkerState,
};
