//! On-disk HTTP response cache
//!
//! Successful responses are stored in SQLite so a relaunched crawl can
//! replay pages without touching the network. Entries are keyed by the
//! request fingerprint and may expire after a configured age.

use crate::crawler::FetchResult;
use crate::storage::schema::initialize_schema;
use crate::url::dedup_key;
use crate::HarvestError;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// File name of the cache database inside the cache directory
pub const CACHE_DB_NAME: &str = "responses.db";

#[derive(Debug)]
pub struct ResponseCache {
    conn: Mutex<Connection>,
    /// Maximum entry age; `None` never expires
    expiration: Option<Duration>,
}

impl ResponseCache {
    /// Opens (or creates) `<dir>/responses.db`
    ///
    /// `expiration_secs` of 0 means entries never expire.
    pub fn open(dir: &Path, expiration_secs: u64) -> Result<Self, HarvestError> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join(CACHE_DB_NAME))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::with_connection(conn, expiration_secs)
    }

    /// Creates an in-memory cache
    pub fn open_in_memory(expiration_secs: u64) -> Result<Self, HarvestError> {
        Self::with_connection(Connection::open_in_memory()?, expiration_secs)
    }

    fn with_connection(conn: Connection, expiration_secs: u64) -> Result<Self, HarvestError> {
        initialize_schema(&conn)?;

        let expiration = match expiration_secs {
            0 => None,
            secs => Some(Duration::seconds(secs.min(u64::from(u32::MAX)) as i64)),
        };

        Ok(Self {
            conn: Mutex::new(conn),
            expiration,
        })
    }

    /// Request fingerprint: hex SHA-256 of `"GET " + normalized URL`
    pub fn fingerprint(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"GET ");
        hasher.update(dedup_key(url).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Looks up a fresh cached response for `url`
    pub fn get(&self, url: &Url) -> Result<Option<FetchResult>, HarvestError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT final_url, status_code, content_type, body, stored_at
                 FROM responses WHERE fingerprint = ?1",
                params![Self::fingerprint(url)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((final_url, status_code, content_type, body, stored_at)) = row else {
            return Ok(None);
        };

        if self.is_expired(&stored_at) {
            return Ok(None);
        }

        Ok(Some(FetchResult {
            url: url.clone(),
            final_url: Url::parse(&final_url)?,
            status_code,
            content_type,
            body,
            from_cache: true,
        }))
    }

    /// Stores a 2xx response under the fingerprint of its requested URL
    ///
    /// Non-2xx results are ignored. An existing entry is overwritten.
    pub fn put(&self, result: &FetchResult) -> Result<(), HarvestError> {
        if !(200..300).contains(&result.status_code) {
            return Ok(());
        }

        self.lock()?.execute(
            "INSERT OR REPLACE INTO responses
             (fingerprint, url, final_url, status_code, content_type, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Self::fingerprint(&result.url),
                result.url.as_str(),
                result.final_url.as_str(),
                result.status_code,
                result.content_type,
                result.body,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Removes every entry, returning how many were dropped
    pub fn clear(&self) -> Result<usize, HarvestError> {
        Ok(self.lock()?.execute("DELETE FROM responses", [])?)
    }

    pub fn len(&self) -> Result<usize, HarvestError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, HarvestError> {
        Ok(self.len()? == 0)
    }

    fn is_expired(&self, stored_at: &str) -> bool {
        let Some(expiration) = self.expiration else {
            return false;
        };

        match DateTime::parse_from_rfc3339(stored_at) {
            Ok(stored) => Utc::now() - stored.with_timezone(&Utc) > expiration,
            // An unreadable timestamp is treated as stale
            Err(_) => true,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HarvestError> {
        self.conn
            .lock()
            .map_err(|e| HarvestError::Poisoned(format!("response cache: {}", e)))
    }

    #[cfg(test)]
    fn backdate(&self, url: &Url, age: Duration) {
        let stored_at = (Utc::now() - age).to_rfc3339();
        self.lock()
            .unwrap()
            .execute(
                "UPDATE responses SET stored_at = ?1 WHERE fingerprint = ?2",
                params![stored_at, Self::fingerprint(url)],
            )
            .unwrap();
    }
}
