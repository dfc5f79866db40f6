//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Named cache generations with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheStorage, CacheSummary, RequestKey, StoredResponse};
pub use config::{AppConfig, ConfigError, InstallPolicy};
pub use error::Error;
