//! Durable SQLite-backed document cache.
//!
//! One file in the platform cache directory, WAL mode, lazy expiration.
//! The schema version lives in the `user_version` pragma; opening a store
//! written by an older binary runs ordered migrations (additive ones
//! preserve rows), while a newer-than-known version drops and recreates.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::CacheStatus;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// TTL for Flutter/Dart API documents.
pub const TTL_API_DOCS_MS: i64 = 86_400_000;
/// TTL for pub.dev package documents.
pub const TTL_PACKAGE_MS: i64 = 43_200_000;
/// TTL for search results and version lists.
pub const TTL_SEARCH_MS: i64 = 3_600_000;

/// A cached row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDocument {
    pub key: String,
    pub content: String,
    pub tokens: usize,
    pub url: String,
    /// Unix milliseconds at write time
    pub fetched_at: i64,
    pub ttl_ms: i64,
    /// Resolved package version, when applicable
    pub version: Option<String>,
}

impl CachedDocument {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.fetched_at + self.ttl_ms < now_ms
    }

    pub fn ttl_remaining_ms(&self, now_ms: i64) -> i64 {
        (self.fetched_at + self.ttl_ms - now_ms).max(0)
    }
}

/// Durable key-value store for canonical documents.
pub struct CacheStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    /// Open (or create) the store at `path`, running migrations as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::CacheError(format!("creating {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::CacheError(format!("opening {}: {e}", path.display())))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(cache_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(cache_err)?;
        Self::migrate(&conn)?;
        info!(path = %path.display(), "cache store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(cache_err)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn migrate(conn: &Connection) -> Result<()> {
        let stored: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(cache_err)?;

        if stored > SCHEMA_VERSION {
            // Written by a newer binary; start over
            warn!(stored, current = SCHEMA_VERSION, "cache schema from the future, recreating");
            conn.execute_batch("DROP TABLE IF EXISTS doc_cache")
                .map_err(cache_err)?;
            Self::create_schema(conn)?;
            return Ok(());
        }

        if stored == 0 {
            Self::create_schema(conn)?;
            return Ok(());
        }

        if stored < SCHEMA_VERSION {
            // v1 -> v2: token accounting was added alongside the content.
            // Additive, so existing rows survive with a zero count and are
            // refreshed on their next natural expiry.
            if stored < 2 {
                conn.execute_batch("ALTER TABLE doc_cache ADD COLUMN tokens INTEGER NOT NULL DEFAULT 0")
                    .map_err(cache_err)?;
            }
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(cache_err)?;
            info!(from = stored, to = SCHEMA_VERSION, "cache schema migrated");
        }
        Ok(())
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS doc_cache (
                key        TEXT PRIMARY KEY NOT NULL,
                content    BLOB NOT NULL,
                tokens     INTEGER NOT NULL DEFAULT 0,
                url        TEXT NOT NULL DEFAULT '',
                fetched_at INTEGER NOT NULL,
                ttl_ms     INTEGER NOT NULL,
                version    TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_expires ON doc_cache (fetched_at, ttl_ms);",
        )
        .map_err(cache_err)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(cache_err)?;
        Ok(())
    }

    /// Read a row, treating expired rows as absent (and deleting them).
    pub async fn get(&self, key: &str) -> Result<Option<CachedDocument>> {
        let key = key.to_string();
        let now = now_ms();
        let row: Option<CachedDocument> = self
            .blocking(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT key, content, tokens, url, fetched_at, ttl_ms, version
                         FROM doc_cache WHERE key = ?1",
                        params![key],
                        |row| {
                            Ok(CachedDocument {
                                key: row.get(0)?,
                                content: String::from_utf8_lossy(&row.get::<_, Vec<u8>>(1)?)
                                    .into_owned(),
                                tokens: row.get::<_, i64>(2)? as usize,
                                url: row.get(3)?,
                                fetched_at: row.get(4)?,
                                ttl_ms: row.get(5)?,
                                version: row.get(6)?,
                            })
                        },
                    )
                    .optional()?;

                match found {
                    Some(doc) if doc.is_expired(now) => {
                        conn.execute("DELETE FROM doc_cache WHERE key = ?1", params![doc.key])?;
                        debug!(key = %doc.key, "cache row expired");
                        Ok(None)
                    }
                    other => Ok(other),
                }
            })
            .await?;

        if row.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(row)
    }

    /// Atomically write (replace) a row.
    pub async fn put(&self, doc: &CachedDocument) -> Result<()> {
        let doc = doc.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO doc_cache
                 (key, content, tokens, url, fetched_at, ttl_ms, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    doc.key,
                    doc.content.as_bytes(),
                    doc.tokens as i64,
                    doc.url,
                    doc.fetched_at,
                    doc.ttl_ms,
                    doc.version,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Delete all expired rows.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = now_ms();
        self.blocking(move |conn| {
            let n = conn.execute(
                "DELETE FROM doc_cache WHERE fetched_at + ttl_ms < ?1",
                params![now],
            )?;
            Ok(n)
        })
        .await
    }

    /// Delete every row matching `predicate`.
    pub async fn purge<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&CachedDocument) -> bool + Send + 'static,
    {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, content, tokens, url, fetched_at, ttl_ms, version FROM doc_cache",
            )?;
            let doomed: Vec<String> = stmt
                .query_map([], |row| {
                    Ok(CachedDocument {
                        key: row.get(0)?,
                        content: String::from_utf8_lossy(&row.get::<_, Vec<u8>>(1)?)
                            .into_owned(),
                        tokens: row.get::<_, i64>(2)? as usize,
                        url: row.get(3)?,
                        fetched_at: row.get(4)?,
                        ttl_ms: row.get(5)?,
                        version: row.get(6)?,
                    })
                })?
                .filter_map(|row| row.ok())
                .filter(|doc| predicate(doc))
                .map(|doc| doc.key)
                .collect();

            for key in &doomed {
                conn.execute("DELETE FROM doc_cache WHERE key = ?1", params![key])?;
            }
            Ok(doomed.len())
        })
        .await
    }

    /// Delete every row.
    pub async fn purge_all(&self) -> Result<usize> {
        self.blocking(|conn| {
            let n = conn.execute("DELETE FROM doc_cache", [])?;
            Ok(n)
        })
        .await
    }

    /// Entry count, byte size and process-lifetime hit rate.
    pub async fn stats(&self) -> Result<CacheStatus> {
        let (entries, size_bytes) = self
            .blocking(|conn| {
                conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(LENGTH(content)), 0) FROM doc_cache",
                    [],
                    |row| Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as u64)),
                )
            })
            .await?;

        Ok(CacheStatus {
            entries,
            size_bytes,
            hit_rate: self.hit_rate(),
        })
    }

    /// Hit rate since process start, in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&guard).map_err(cache_err)
        })
        .await
        .map_err(|e| Error::CacheError(format!("cache task failed: {e}")))?
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn cache_err(e: rusqlite::Error) -> Error {
    Error::CacheError(e.to_string())
}

/// Current time in unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
