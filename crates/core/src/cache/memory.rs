//! In-memory partition store.
//!
//! Uses a Vec of partitions (creation order) with tokio RwLock for concurrent
//! access. Nothing survives the process.

use super::hash::RequestKey;
use super::snapshots::{EntryMeta, ResponseSnapshot};
use super::store::CacheStore;
use crate::Error;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct StoredEntry {
    snapshot: ResponseSnapshot,
    stored_at: String,
}

struct MemoryPartition {
    name: String,
    entries: BTreeMap<RequestKey, StoredEntry>,
}

/// Partition store kept entirely in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    partitions: Arc<RwLock<Vec<MemoryPartition>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all partitions.
    pub async fn len(&self) -> usize {
        self.partitions.read().await.iter().map(|p| p.entries.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn position(partitions: &[MemoryPartition], name: &str) -> Option<usize> {
    partitions.iter().position(|p| p.name == name)
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        if position(&partitions, name).is_none() {
            partitions.push(MemoryPartition { name: name.to_string(), entries: BTreeMap::new() });
        }
        Ok(())
    }

    async fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        let partitions = self.partitions.read().await;
        Ok(position(&partitions, partition)
            .and_then(|i| partitions[i].entries.get(key))
            .map(|entry| entry.snapshot.clone()))
    }

    async fn put(&self, partition: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        let index = match position(&partitions, partition) {
            Some(i) => i,
            None => {
                partitions.push(MemoryPartition { name: partition.to_string(), entries: BTreeMap::new() });
                partitions.len() - 1
            }
        };
        partitions[index].entries.insert(
            key.clone(),
            StoredEntry { snapshot: snapshot.clone(), stored_at: chrono::Utc::now().to_rfc3339() },
        );
        Ok(())
    }

    async fn delete(&self, partition: &str, key: &RequestKey) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        Ok(match position(&partitions, partition) {
            Some(i) => partitions[i].entries.remove(key).is_some(),
            None => false,
        })
    }

    async fn keys(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        let partitions = self.partitions.read().await;
        let Some(i) = position(&partitions, partition) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<EntryMeta> = partitions[i]
            .entries
            .iter()
            .map(|(key, entry)| EntryMeta {
                key: key.clone(),
                status: entry.snapshot.status,
                size: entry.snapshot.body.len(),
                stored_at: entry.stored_at.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.url.cmp(&b.key.url).then_with(|| a.key.method.cmp(&b.key.method)));
        Ok(entries)
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        Ok(self.partitions.read().await.iter().map(|p| p.name.clone()).collect())
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        Ok(partitions.len() != before)
    }
}
