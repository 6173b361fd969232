//! Cache storage for offline responses.
//!
//! `CacheStorage` is the seam the proxy talks to: named namespaces holding
//! request/response pairs, with atomic open/match/put/delete operations.
//!
//! Implementations:
//! - `MemoryCacheStorage`: in-process, for tests and embedding
//! - `DiskCacheStorage`: JSON index per namespace under the cache directory

pub mod disk;
pub mod entry;
pub mod memory;
pub mod storage;

pub use disk::DiskCacheStorage;
pub use entry::{CacheEntry, CachedData};
pub use memory::MemoryCacheStorage;
pub use storage::CacheStorage;
