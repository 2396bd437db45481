//! Core types and shared functionality for the offline agent.
//!
//! This crate provides:
//! - Versioned cache partitions with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheStore, CacheVersion, MemoryStore, Partition, RequestKey, ResponseSnapshot};
pub use config::AgentConfig;
pub use error::Error;
