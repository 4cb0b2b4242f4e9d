//! Store-scoped entry operations.
//!
//! Provides CRUD for cached responses in the named stores, plus the
//! single-row manifest record in the manifest-record store.

use super::connection::CacheDb;
use super::{MANIFEST_KEY, MANIFEST_STORE};
use crate::{Error, ResourceManifest};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response body with the metadata needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Absolute request URL this entry was stored under.
    pub key: String,
    /// HTTP status code of the original response.
    pub status: u16,
    /// Content-Type header, if the response carried one.
    pub content_type: Option<String>,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// ISO8601 timestamp of when the response was fetched.
    pub fetched_at: String,
}

impl CachedResponse {
    /// Whether the recorded status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl CacheDb {
    /// Insert or replace an entry in the named store.
    pub async fn put(&self, store: &str, entry: &CachedResponse) -> Result<(), Error> {
        let store = store.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (store, key, status, content_type, body, fetched_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(store, key) DO UPDATE SET
                        status = excluded.status,
                        content_type = excluded.content_type,
                        body = excluded.body,
                        fetched_at = excluded.fetched_at",
                    params![store, entry.key, entry.status, entry.content_type, entry.body, entry.fetched_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry from the named store.
    ///
    /// Returns None if the key is not present in that store.
    pub async fn get(&self, store: &str, key: &str) -> Result<Option<CachedResponse>, Error> {
        let store = store.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT key, status, content_type, body, fetched_at
                     FROM entries WHERE store = ?1 AND key = ?2",
                    params![store, key],
                    |row| {
                        Ok(CachedResponse {
                            key: row.get(0)?,
                            status: row.get(1)?,
                            content_type: row.get(2)?,
                            body: row.get(3)?,
                            fetched_at: row.get(4)?,
                        })
                    },
                );

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// All keys currently present in the named store.
    pub async fn keys(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE store = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry from the named store.
    pub async fn delete(&self, store: &str, key: &str) -> Result<(), Error> {
        let store = store.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM entries WHERE store = ?1 AND key = ?2", params![store, key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry in the named store.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_store(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE store = ?1", params![store])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the named store.
    pub async fn store_len(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Read the persisted manifest from the manifest-record store.
    ///
    /// Returns None when no manifest was ever recorded (first activation).
    ///
    /// # Errors
    ///
    /// Returns `Error::CorruptManifestRecord` when a record exists but does
    /// not decode; the reconciler treats that as a reconciliation failure.
    pub async fn read_manifest_record(&self) -> Result<Option<ResourceManifest>, Error> {
        let Some(entry) = self.get(MANIFEST_STORE, MANIFEST_KEY).await? else {
            return Ok(None);
        };

        let manifest =
            serde_json::from_slice(&entry.body).map_err(|e| Error::CorruptManifestRecord(e.to_string()))?;
        Ok(Some(manifest))
    }

    /// Overwrite the manifest record with the given manifest.
    pub async fn write_manifest_record(&self, manifest: &ResourceManifest) -> Result<(), Error> {
        let body = serde_json::to_vec(manifest).map_err(|e| Error::CorruptManifestRecord(e.to_string()))?;
        let entry = CachedResponse {
            key: MANIFEST_KEY.to_string(),
            status: 200,
            content_type: Some("application/json".to_string()),
            body,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };
        self.put(MANIFEST_STORE, &entry).await
    }
}
