//! cache_purge tool implementation.
//!
//! Deletes one named partition, or every partition left by an older version.

use offline_core::{CacheStore, CacheVersion, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete this partition.
    #[serde(default)]
    pub partition: Option<String>,

    /// Delete every partition whose name lacks the running version tag.
    #[serde(default)]
    pub stale: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Names of the partitions deleted.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(
    store: &dyn CacheStore, version: &CacheVersion, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    if params.partition.is_none() && !params.stale {
        return Err(Error::InvalidInput("Either partition or stale must be specified".to_string()).into());
    }

    let mut deleted = Vec::new();

    if let Some(name) = params.partition
        && store.delete_partition(&name).await?
    {
        deleted.push(name);
    }

    if params.stale {
        for name in store.partitions().await? {
            if !version.is_current(&name) && store.delete_partition(&name).await? {
                tracing::info!(partition = %name, "purged stale partition");
                deleted.push(name);
            }
        }
    }

    json_result(&CachePurgeOutput { deleted })
}
