//! FamilyVault offline cache proxy.
//!
//! Pre-caches the app shell on install, evicts stale cache versions on
//! activate and answers fetches cache-first with a network fallback. Calls
//! to the Apps Script backend are never intercepted.

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod network;
pub mod proxy;

pub use cache::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
pub use config::Config;
pub use error::{CacheError, NetworkError};
pub use manifest::{AssetManifest, CacheNamespace};
pub use models::{Request, RequestMode, Response, ResponseType};
pub use network::{HttpNetwork, Network};
pub use proxy::{
    ActivateReport, ClientHost, FetchOutcome, FetchState, InstallReport, OfflineCacheProxy,
    WorkerLifecycle, WorkerPhase,
};
