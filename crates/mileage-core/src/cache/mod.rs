//! Local caching module for instant startup and offline use.
//!
//! `CacheManager` stores the config snapshot, the week index and one record
//! per (week, person) detail, each wrapped in `CachedData` with its write
//! timestamp. Records are JSON; the backing store is a `KeyValueStore`
//! (one file per key on disk, or memory).

pub mod manager;
pub mod store;

pub use manager::{CacheManager, CachedData};
pub use store::{FileStore, KeyValueStore, MemoryStore};
