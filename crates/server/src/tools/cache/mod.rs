//! Cache inspection MCP tools.
//!
//! Read-only views of the cache generations plus manual deletion of a
//! stale generation.

pub mod delete;
pub mod get;
pub mod list;

pub use delete::{CacheDeleteParams, delete_impl};
pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
