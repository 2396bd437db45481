//! cache_list tool implementation.
//!
//! Lists partition names, or the entries of one partition.

use offline_core::cache::EntryMeta;
use offline_core::{CacheStore, CacheVersion, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// List the entries of this partition instead of the partition names.
    #[serde(default)]
    pub partition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    /// Whether the name carries the running version tag.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CacheListOutput {
    Partitions { partitions: Vec<PartitionInfo> },
    Entries { partition: String, entries: Vec<EntryMeta> },
}

/// Implementation of the cache_list tool.
pub async fn list_impl(
    store: &dyn CacheStore, version: &CacheVersion, params: CacheListParams,
) -> Result<CallToolResult, McpError> {
    let output = match params.partition {
        Some(name) => {
            if !store.partitions().await?.contains(&name) {
                return Err(Error::CacheMiss(format!("no partition named {name}")).into());
            }
            let entries = store.keys(&name).await?;
            CacheListOutput::Entries { partition: name, entries }
        }
        None => {
            let partitions = store
                .partitions()
                .await?
                .into_iter()
                .map(|name| PartitionInfo { current: version.is_current(&name), name })
                .collect();
            CacheListOutput::Partitions { partitions }
        }
    };

    json_result(&output)
}
