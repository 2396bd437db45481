//! Response snapshots and entry CRUD operations.
//!
//! A snapshot is an immutable copy of a response captured when it was cached.
//! Entries are never patched: a put replaces the whole row.

use super::connection::CacheDb;
use super::hash::RequestKey;
use super::partitions::ensure_partition;
use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    /// Header name/raw value pairs in the order they were received.
    ///
    /// Values are bytes: HTTP allows obs-text that is not valid UTF-8.
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: Vec<(String, Vec<u8>)>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers, body: body.into() }
    }
}

/// Header values are stored hex-encoded in `headers_json`.
fn encode_headers(headers: &[(String, Vec<u8>)]) -> Result<String, Error> {
    let encoded: Vec<(&str, String)> = headers.iter().map(|(name, value)| (name.as_str(), hex::encode(value))).collect();
    Ok(serde_json::to_string(&encoded)?)
}

fn decode_headers(json: &str) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let encoded: Vec<(String, String)> = serde_json::from_str(json)?;
    encoded
        .into_iter()
        .map(|(name, value)| {
            hex::decode(&value)
                .map(|value| (name, value))
                .map_err(|e| Error::CorruptEntry(format!("header value: {e}")))
        })
        .collect()
}

/// Listing metadata for one cached entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryMeta {
    pub key: RequestKey,
    pub status: u16,
    pub size: usize,
    pub stored_at: String,
}

impl CacheDb {
    /// Insert or replace the entry for `key` in `partition`.
    ///
    /// Creates the partition if it does not exist.
    pub async fn upsert_entry(&self, partition: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.clone();
        let headers_json = encode_headers(&snapshot.headers)?;
        let status = snapshot.status;
        let body = snapshot.body.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let partition_id = ensure_partition(conn, &partition)?;
                conn.execute(
                    "INSERT INTO entries (
                    partition_id, key_hash, method, url, status, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(partition_id, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![partition_id, key.hash(), &key.method, &key.url, status, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for `key` in `partition`.
    ///
    /// Returns None if either the partition or the entry doesn't exist.
    pub async fn get_entry(&self, partition: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.status, e.headers_json, e.body
                FROM entries e JOIN partitions p ON p.id = e.partition_id
                WHERE p.name = ?1 AND e.key_hash = ?2",
                )?;

                let result = stmt.query_row(params![partition, key_hash], |row| {
                    Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                match result {
                    Ok((status, headers_json, body)) => {
                        let headers = decode_headers(&headers_json)?;
                        Ok(Some(ResponseSnapshot { status, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for `key` in `partition`.
    ///
    /// Returns the number of deleted entries as a bool.
    pub async fn remove_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE key_hash = ?2
                    AND partition_id = (SELECT id FROM partitions WHERE name = ?1)",
                    params![partition, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of `partition`, ordered by URL.
    pub async fn list_entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.method, e.url, e.status, LENGTH(e.body), e.stored_at
                FROM entries e JOIN partitions p ON p.id = e.partition_id
                WHERE p.name = ?1
                ORDER BY e.url ASC, e.method ASC",
                )?;

                let entries = stmt
                    .query_map(params![partition], |row| {
                        Ok(EntryMeta {
                            key: RequestKey { method: row.get(0)?, url: row.get(1)? },
                            status: row.get(2)?,
                            size: row.get::<_, i64>(3)? as usize,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
