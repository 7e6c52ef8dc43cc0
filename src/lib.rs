//! Concurrency-safe, in-process cache tables with per-entry expiration.
//!
//! A [`CacheTable`] is an independently synchronised key/value store. Every
//! entry carries its own life span, access metadata and observer list; a
//! background janitor sweeps expired entries on a configurable interval. A
//! table can be given a data loader, in which case `get` becomes a
//! read-through: concurrent misses for the same key are deduplicated so the
//! loader runs at most once per flight.
//!
//! Tables can be constructed directly, or looked up by name through the
//! process-wide [`registry`].

mod entry;
mod error;
mod loader;
mod shared;
mod table;
mod task;

pub mod registry;

pub use entry::{CacheEntry, EntryCallback, KeyCallback};
pub use error::CacheError;
pub use loader::{LoadError, LoaderFn};
pub use table::CacheTable;

/// Target used for all log events emitted by this crate.
pub(crate) const LOG_TARGET: &str = "cachetable";
