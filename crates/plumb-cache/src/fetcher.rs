//! Network seam for the asset cache.
//!
//! The cache never opens a socket.  It asks a [`Fetcher`] for a URL and gets
//! back a [`Response`] tagged with a [`ResponseKind`]; only same-origin
//! ([`ResponseKind::Basic`]) `200` responses are ever stored.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::CacheError;

/// Origin class of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Same-origin.
    Basic,
    /// Cross-origin with CORS headers.
    Cors,
    /// Cross-origin without CORS; body unreadable.
    Opaque,
}

/// A fetched (or cached) asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    /// A same-origin `200 OK`.
    pub fn ok(body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            status: 200,
            kind: ResponseKind::Basic,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            kind: ResponseKind::Basic,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// `true` for a `2xx` status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` when the cache may store this response.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }
}

/// Retrieves assets from the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// # Errors
    ///
    /// [`CacheError::Network`] when no response could be obtained at all.
    /// HTTP error statuses are `Ok` responses, not errors.
    async fn fetch(&self, url: &str) -> Result<Response, CacheError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// DirFetcher
// ─────────────────────────────────────────────────────────────────────────────

/// Serves a local directory as the app's origin.
///
/// `/` maps to `index.html`.  Paths that try to leave the root get a `404`.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let relative = path.trim_start_matches('/');
        let relative = if relative.is_empty() {
            "index.html"
        } else {
            relative
        };

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl Fetcher for DirFetcher {
    async fn fetch(&self, url: &str) -> Result<Response, CacheError> {
        let Some(path) = self.resolve(url) else {
            debug!(url, "rejected path outside the asset root");
            return Ok(Response::not_found());
        };

        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Response::ok(body, content_type_for(&path))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Response::not_found()),
            Err(e) => Err(CacheError::Network(format!("{}: {e}", path.display()))),
        }
    }
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    Some(match ext {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => return None,
    })
}
