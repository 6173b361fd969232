//! Offline cache proxy for the FamilyVault page.
//!
//! `OfflineCacheProxy` handles the three lifecycle events:
//! - install: open the current namespace and pre-cache the asset manifest
//! - activate: evict every namespace from an older version
//! - fetch: cache-first, network fallback, synthesized 503 when offline
//!
//! Lifecycle directives (skip-waiting, claim-clients) go to a `ClientHost`.

pub mod lifecycle;
pub mod worker;

pub use lifecycle::{ClientHost, WorkerLifecycle, WorkerPhase};
pub use worker::{ActivateReport, FetchOutcome, FetchState, InstallReport, OfflineCacheProxy};
