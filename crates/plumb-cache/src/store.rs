//! [`AssetCache`] – versioned, cache-first asset storage over SQLite.
//!
//! # Lifecycle
//!
//! 1. **Install** – pre-cache the app shell into the current namespace.
//!    All-or-nothing: one failed or non-`2xx` asset aborts the install and
//!    nothing is stored.  A successful install requests immediate
//!    activation.
//! 2. **Activate** – delete every namespace except the current one.
//! 3. **Fetch** – cache first.  On a miss the network response is returned
//!    and, when it is a same-origin `200`, stored in the current namespace.
//!
//! Control messages ([`CacheMessage`]) can request immediate activation or
//! wipe every namespace.
//!
//! # Storage layout
//!
//! | table | columns |
//! |---|---|
//! | `cache_names` | `name` (PK), `created_at` |
//! | `cache_entries` | `cache_name`, `url` (PK together), `status`, `kind`, `content_type`, `body`, `stored_at` |
//!
//! # Example
//!
//! ```rust
//! use plumb_cache::{AssetCache, CACHE_NAME, CacheMessage};
//!
//! let mut cache = AssetCache::open_in_memory().unwrap();
//! assert_eq!(cache.name(), CACHE_NAME);
//!
//! cache.handle_message(CacheMessage::SkipWaiting).unwrap();
//! assert!(cache.skip_waiting());
//! ```

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetcher::{Fetcher, Response, ResponseKind};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Namespace of the current asset version.
pub const CACHE_NAME: &str = "spirit-level-v1.0.0";

/// Assets pre-cached on install.
pub const APP_SHELL: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/manifest.json",
    "/icon-72.png",
    "/icon-96.png",
    "/icon-128.png",
    "/icon-144.png",
    "/icon-152.png",
    "/icon-192.png",
    "/icon-384.png",
    "/icon-512.png",
];

// ─────────────────────────────────────────────────────────────────────────────
// Error & message types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from asset cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Install failed: {url} returned status {status}")]
    Install { url: String, status: u16 },
}

/// Control messages accepted by [`AssetCache::handle_message`].
///
/// Serialized as `{"type": "SKIP_WAITING"}` / `{"type": "CLEAR_CACHE"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheMessage {
    SkipWaiting,
    ClearCache,
}

/// Result of a cache-first fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub response: Response,
    pub from_cache: bool,
    /// `true` when a network response was written to the cache.
    pub stored: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// AssetCache
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed versioned asset cache.
pub struct AssetCache {
    conn: Connection,
    name: String,
    skip_waiting: bool,
    active: bool,
}

impl AssetCache {
    /// Open (or create) a persistent cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Open a temporary in-memory cache (useful for testing).
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        let cache = Self {
            conn,
            name: CACHE_NAME.to_string(),
            skip_waiting: false,
            active: false,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<(), CacheError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_names (
                name       TEXT NOT NULL PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_name   TEXT NOT NULL,
                url          TEXT NOT NULL,
                status       INTEGER NOT NULL,
                kind         TEXT NOT NULL,
                content_type TEXT,
                body         BLOB NOT NULL,
                stored_at    TEXT NOT NULL,
                PRIMARY KEY (cache_name, url)
            );",
        )?;
        Ok(())
    }

    /// Use a different namespace than [`CACHE_NAME`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The current namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` once immediate activation has been requested.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Pre-cache `manifest` into the current namespace.
    ///
    /// Returns the number of assets stored.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Network`] – an asset could not be fetched.
    /// - [`CacheError::Install`] – an asset returned a non-`2xx` status.
    ///
    /// Either way nothing from this install is kept.
    pub async fn install<F>(&mut self, fetcher: &F, manifest: &[&str]) -> Result<usize, CacheError>
    where
        F: Fetcher + ?Sized,
    {
        info!(cache = %self.name, assets = manifest.len(), "installing app shell");

        let mut fetched = Vec::with_capacity(manifest.len());
        for url in manifest {
            let response = fetcher.fetch(url).await.inspect_err(|e| {
                warn!(url, error = %e, "install failed");
            })?;
            if !response.is_success() {
                warn!(url, status = response.status, "install failed");
                return Err(CacheError::Install {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            fetched.push((*url, response));
        }

        let tx = self.conn.transaction()?;
        ensure_namespace(&tx, &self.name)?;
        for (url, response) in &fetched {
            put(&tx, &self.name, url, response)?;
        }
        tx.commit()?;

        self.skip_waiting = true;
        info!(cache = %self.name, stored = fetched.len(), "install complete");
        Ok(fetched.len())
    }

    /// Delete every namespace other than the current one.
    ///
    /// Returns the evicted namespace names.
    pub fn activate(&mut self) -> Result<Vec<String>, CacheError> {
        let stale: Vec<String> = self
            .cache_names()?
            .into_iter()
            .filter(|name| *name != self.name)
            .collect();

        let tx = self.conn.transaction()?;
        for name in &stale {
            info!(cache = %name, "deleting old cache");
            delete_namespace(&tx, name)?;
        }
        tx.commit()?;

        self.active = true;
        info!(cache = %self.name, evicted = stale.len(), "activation complete");
        Ok(stale)
    }

    /// Serve `url` from any namespace, falling back to `fetcher`.
    ///
    /// The current namespace wins when several hold the URL.
    ///
    /// # Errors
    ///
    /// Network failures on a cache miss are returned unchanged.
    pub async fn fetch<F>(&mut self, fetcher: &F, url: &str) -> Result<FetchOutcome, CacheError>
    where
        F: Fetcher + ?Sized,
    {
        if let Some(response) = self.lookup(url)? {
            debug!(url, "serving from cache");
            return Ok(FetchOutcome {
                response,
                from_cache: true,
                stored: false,
            });
        }

        debug!(url, "fetching from network");
        let response = fetcher.fetch(url).await.inspect_err(|e| {
            warn!(url, error = %e, "fetch failed");
        })?;

        let stored = response.is_cacheable();
        if stored {
            let tx = self.conn.transaction()?;
            ensure_namespace(&tx, &self.name)?;
            put(&tx, &self.name, url, &response)?;
            tx.commit()?;
        }

        Ok(FetchOutcome {
            response,
            from_cache: false,
            stored,
        })
    }

    /// Apply a control message.
    pub fn handle_message(&mut self, message: CacheMessage) -> Result<(), CacheError> {
        match message {
            CacheMessage::SkipWaiting => {
                self.skip_waiting = true;
                Ok(())
            }
            CacheMessage::ClearCache => {
                let names = self.cache_names()?;
                let tx = self.conn.transaction()?;
                for name in &names {
                    delete_namespace(&tx, name)?;
                }
                tx.commit()?;
                info!(cleared = names.len(), "all caches cleared");
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Every namespace, oldest first.
    pub fn cache_names(&self) -> Result<Vec<String>, CacheError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM cache_names ORDER BY created_at ASC, rowid ASC")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Number of entries stored under `cache_name`.
    pub fn entry_count(&self, cache_name: &str) -> Result<usize, CacheError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
            params![cache_name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Find `url` in any namespace without touching the network.
    pub fn lookup(&self, url: &str) -> Result<Option<Response>, CacheError> {
        let row = self
            .conn
            .query_row(
                "SELECT status, kind, content_type, body
                 FROM cache_entries
                 WHERE url = ?1
                 ORDER BY (cache_name = ?2) DESC, rowid ASC
                 LIMIT 1",
                params![url, self.name],
                |row| {
                    let status: u16 = row.get(0)?;
                    let kind: String = row.get(1)?;
                    let content_type: Option<String> = row.get(2)?;
                    let body: Vec<u8> = row.get(3)?;
                    Ok(Response {
                        status,
                        kind: kind_from_str(&kind),
                        content_type,
                        body,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_namespace(conn: &Connection, name: &str) -> Result<(), CacheError> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_names (name, created_at) VALUES (?1, ?2)",
        params![name, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn delete_namespace(conn: &Connection, name: &str) -> Result<(), CacheError> {
    conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![name])?;
    conn.execute("DELETE FROM cache_names WHERE name = ?1", params![name])?;
    Ok(())
}

fn put(conn: &Connection, cache_name: &str, url: &str, response: &Response) -> Result<(), CacheError> {
    conn.execute(
        "INSERT OR REPLACE INTO cache_entries
             (cache_name, url, status, kind, content_type, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            cache_name,
            url,
            response.status,
            kind_to_str(response.kind),
            response.content_type,
            response.body,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn kind_to_str(kind: ResponseKind) -> &'static str {
    match kind {
        ResponseKind::Basic => "basic",
        ResponseKind::Cors => "cors",
        ResponseKind::Opaque => "opaque",
    }
}

fn kind_from_str(kind: &str) -> ResponseKind {
    match kind {
        "basic" => ResponseKind::Basic,
        "cors" => ResponseKind::Cors,
        _ => ResponseKind::Opaque,
    }
}
