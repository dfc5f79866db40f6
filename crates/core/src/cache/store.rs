//! Cache store operations.
//!
//! Provides functions for creating, enumerating, and deleting named cache
//! generations, and for reading and writing the entries inside them.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::entry::{CacheEntry, CacheSummary, RequestKey, StoredResponse};
use super::CacheStorage;
use crate::Error;

/// A response serialized for a single row write.
struct EncodedEntry {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EncodedEntry {
    fn encode(key: &RequestKey, response: &StoredResponse) -> Result<Self, Error> {
        Ok(Self {
            key_hash: key.hash(),
            method: key.method.to_ascii_uppercase(),
            url: key.url.clone(),
            status: i64::from(response.status),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

fn insert_cache(conn: &rusqlite::Connection, name: &str, now: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![name, now],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, name: &str, entry: &EncodedEntry, now: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO entries (cache_name, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            name,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status,
            &entry.headers_json,
            &entry.body,
            now,
        ],
    )?;
    Ok(())
}

fn status_from_row(status: i64) -> Result<u16, Error> {
    u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status out of range: {status}")))
}

impl CacheDb {
    /// Create a cache generation if it doesn't already exist.
    pub async fn create_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                insert_cache(conn, &name, &now)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a cache generation exists.
    pub async fn cache_exists(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List cache generation names in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// List cache generations with their entry counts.
    pub async fn list_caches(&self) -> Result<Vec<CacheSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, c.created_at, COUNT(e.key_hash)
                     FROM caches c LEFT JOIN entries e ON e.cache_name = c.name
                     GROUP BY c.name, c.created_at
                     ORDER BY c.created_at ASC, c.name ASC",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(CacheSummary {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache generation and, by cascade, all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a stored response.
    ///
    /// Returns None if the generation or the entry doesn't exist.
    pub async fn get_entry(&self, name: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let name = name.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, headers_json, body FROM entries
                     WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                        ))
                    },
                );

                match result {
                    Ok((url, status, headers_json, body)) => Ok(Some(StoredResponse {
                        url,
                        status: status_from_row(status)?,
                        headers: serde_json::from_str(&headers_json)?,
                        body: body.into(),
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite a single entry, creating the generation if needed.
    pub async fn put_entry(&self, name: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        let name = name.to_string();
        let entry = EncodedEntry::encode(key, response)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_cache(&tx, &name, &now)?;
                upsert_entry(&tx, &name, &entry, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite many entries in one transaction.
    ///
    /// If any row fails, nothing is committed.
    pub async fn put_entries(&self, name: &str, entries: &[(RequestKey, StoredResponse)]) -> Result<(), Error> {
        let name = name.to_string();
        let encoded = entries
            .iter()
            .map(|(key, response)| EncodedEntry::encode(key, response))
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_cache(&tx, &name, &now)?;
                for entry in &encoded {
                    upsert_entry(&tx, &name, entry, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys stored in a generation, ordered by URL.
    pub async fn entry_keys(&self, name: &str) -> Result<Vec<RequestKey>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE cache_name = ?1 ORDER BY url ASC, method ASC")?;
                let keys = stmt
                    .query_map(params![name], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry metadata for every generation holding the given URL.
    ///
    /// When `name` is set, only that generation is searched.
    pub async fn find_entries(&self, url: &str, name: Option<&str>) -> Result<Vec<CacheEntry>, Error> {
        let url = url.to_string();
        let name = name.map(str::to_string);
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_name, method, url, status, headers_json, LENGTH(body), stored_at
                     FROM entries
                     WHERE url = ?1 AND (?2 IS NULL OR cache_name = ?2)
                     ORDER BY cache_name ASC, method ASC",
                )?;
                let rows = stmt
                    .query_map(params![url, name], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(cache_name, method, url, status, headers_json, body_len, stored_at)| -> Result<CacheEntry, Error> {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                        let content_type = headers
                            .iter()
                            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                            .map(|(_, v)| v.clone());
                        Ok(CacheEntry {
                            cache_name,
                            method,
                            url,
                            status: status_from_row(status)?,
                            content_type,
                            body_len: body_len.max(0) as usize,
                            stored_at,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.create_cache(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.cache_exists(name).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.cache_names().await
    }

    async fn get(&self, name: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.get_entry(name, key).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        self.put_entry(name, key, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(RequestKey, StoredResponse)]) -> Result<(), Error> {
        self.put_entries(name, entries).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_cache(name).await
    }

    async fn keys(&self, name: &str) -> Result<Vec<RequestKey>, Error> {
        self.entry_keys(name).await
    }
}
