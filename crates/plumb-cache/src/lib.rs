//! `plumb-cache` – offline-first static asset cache
//!
//! Keeps the level's app shell available without a network.  Assets live in
//! versioned namespaces inside a local SQLite database; bumping the version
//! and activating evicts everything cached by older versions.
//!
//! # Modules
//!
//! - [`store`] – [`AssetCache`][store::AssetCache]: install, activate,
//!   cache-first fetch and control messages over `rusqlite`.
//! - [`fetcher`] – the [`Fetcher`][fetcher::Fetcher] network trait, the
//!   [`Response`][fetcher::Response] it returns, and
//!   [`DirFetcher`][fetcher::DirFetcher], which serves a local asset
//!   directory as same-origin responses.

pub mod fetcher;
pub mod store;

pub use fetcher::{DirFetcher, Fetcher, Response, ResponseKind};
pub use store::{APP_SHELL, AssetCache, CACHE_NAME, CacheError, CacheMessage, FetchOutcome};
