//! Partition naming and partition-level operations.
//!
//! A partition is named `{role}-{version}`. Exactly one partition per role is
//! current: the one carrying the active version tag. Everything else is stale
//! and is removed when a new version activates.

use super::connection::CacheDb;
use crate::Error;
use std::fmt;
use tokio_rusqlite::{params, rusqlite};

/// What a partition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Critical resources, stylesheets and script bundles.
    Static,
    /// Navigations and miscellaneous resources.
    Dynamic,
    /// The designated offline document.
    Offline,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Static => "static",
            Role::Dynamic => "dynamic",
            Role::Offline => "offline",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition naming for one deployed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheVersion {
    tag: String,
}

impl CacheVersion {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Current partition name for `role`.
    pub fn name(&self, role: Role) -> String {
        format!("{}-{}", role, self.tag)
    }

    pub fn static_name(&self) -> String {
        self.name(Role::Static)
    }

    pub fn dynamic_name(&self) -> String {
        self.name(Role::Dynamic)
    }

    pub fn offline_name(&self) -> String {
        self.name(Role::Offline)
    }

    /// Whether `name` belongs to this version.
    ///
    /// Matches on containment of the tag, so any partition name carrying the
    /// tag survives activation regardless of its role prefix.
    pub fn is_current(&self, name: &str) -> bool {
        name.contains(&self.tag)
    }

    /// Partitions consulted by cache lookups, most recently written role first.
    pub fn lookup_order(&self) -> Vec<String> {
        vec![self.dynamic_name(), self.static_name(), self.offline_name()]
    }
}

impl CacheDb {
    /// Create a partition if it does not exist yet.
    pub async fn create_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List partition names in creation order.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and, through the cascade, all of its entries.
    ///
    /// Returns false if no partition had that name.
    pub async fn remove_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

/// Insert the partition row if missing and return its id.
pub(crate) fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    let id = conn.query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| row.get(0))?;
    Ok(id)
}
