//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod cache;
pub mod lifecycle;
pub mod sw_fetch;

pub use lifecycle::{activate_impl, install_impl};
pub use sw_fetch::{SwFetchParams, fetch_impl};
