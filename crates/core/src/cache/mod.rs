//! Versioned cache partitions of request -> response snapshots.
//!
//! This module provides the partition store the agent reads and writes. It
//! supports:
//!
//! - Named partitions scoped by a build version tag (`static-v3`, ...)
//! - Whole-entry replacement keyed by request identity (method + URL)
//! - A SQLite backend via tokio-rusqlite with automatic schema migrations
//! - An in-memory backend for ephemeral runs and tests

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod partitions;
pub mod snapshots;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::RequestKey;
pub use memory::MemoryStore;
pub use partitions::{CacheVersion, Role};
pub use snapshots::{EntryMeta, ResponseSnapshot};
pub use store::{CacheMatch, CacheStore, Partition};
