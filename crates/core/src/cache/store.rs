//! The partition store seam.
//!
//! Strategies only see [`CacheStore`]; the SQLite database and the in-memory
//! store both implement it. Each entry is replaced as a whole, so concurrent
//! readers observe either the previous snapshot, the new one, or a miss.

use super::connection::CacheDb;
use super::hash::RequestKey;
use super::snapshots::{EntryMeta, ResponseSnapshot};
use crate::Error;

/// A hit from a multi-partition lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMatch {
    pub partition: String,
    pub snapshot: ResponseSnapshot,
}

/// Named partitions of request -> response snapshots.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist.
    async fn open_partition(&self, name: &str) -> Result<(), Error>;

    async fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error>;

    /// Replace the entry for `key` wholesale.
    async fn put(&self, partition: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error>;

    async fn delete(&self, partition: &str, key: &RequestKey) -> Result<bool, Error>;

    async fn keys(&self, partition: &str) -> Result<Vec<EntryMeta>, Error>;

    /// Partition names in creation order.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    async fn delete_partition(&self, name: &str) -> Result<bool, Error>;

    /// First hit for `key` across `partitions`, in the given order.
    async fn match_in(&self, partitions: &[String], key: &RequestKey) -> Result<Option<CacheMatch>, Error> {
        for partition in partitions {
            if let Some(snapshot) = self.get(partition, key).await? {
                return Ok(Some(CacheMatch { partition: partition.clone(), snapshot }));
            }
        }
        Ok(None)
    }
}

/// Handle to one open partition.
pub struct Partition<'a> {
    store: &'a dyn CacheStore,
    name: String,
}

impl<'a> Partition<'a> {
    /// Open the partition named `name`, creating it if needed.
    pub async fn open(store: &'a dyn CacheStore, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        store.open_partition(&name).await?;
        Ok(Self { store, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.store.get(&self.name, key).await
    }

    pub async fn put(&self, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        self.store.put(&self.name, key, snapshot).await
    }

    pub async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        self.store.delete(&self.name, key).await
    }

    pub async fn keys(&self) -> Result<Vec<EntryMeta>, Error> {
        self.store.keys(&self.name).await
    }
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open_partition(&self, name: &str) -> Result<(), Error> {
        self.create_partition(name).await
    }

    async fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.get_entry(partition, key).await
    }

    async fn put(&self, partition: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        self.upsert_entry(partition, key, snapshot).await
    }

    async fn delete(&self, partition: &str, key: &RequestKey) -> Result<bool, Error> {
        self.remove_entry(partition, key).await
    }

    async fn keys(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        self.list_entries(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.list_partitions().await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        self.remove_partition(name).await
    }
}
