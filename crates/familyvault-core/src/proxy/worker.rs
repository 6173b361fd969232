//! The offline cache proxy: install, activate and fetch handlers.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::error::{CacheError, NetworkError};
use crate::manifest::{AssetManifest, CacheNamespace};
use crate::models::{Request, RequestMode, Response};
use crate::network::Network;

use super::lifecycle::{ClientHost, WorkerPhase};

/// Per-request states. A request only ever moves forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Excluded URL; the host performs the request itself
    NotIntercepted,
    Lookup,
    /// Cache hit, served without touching the network
    Served,
    Fetching,
    CachedAndServed,
    ServedUncached,
    /// Miss plus network failure; answered with the synthesized 503
    Offline,
}

impl FetchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchState::NotIntercepted => "not-intercepted",
            FetchState::Lookup => "lookup",
            FetchState::Served => "served",
            FetchState::Fetching => "fetching",
            FetchState::CachedAndServed => "cached-and-served",
            FetchState::ServedUncached => "served-uncached",
            FetchState::Offline => "offline",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchState::Lookup | FetchState::Fetching)
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub state: FetchState,
    /// `None` when the request was not intercepted
    pub response: Option<Response>,
}

impl FetchOutcome {
    fn not_intercepted() -> Self {
        Self {
            state: FetchState::NotIntercepted,
            response: None,
        }
    }

    fn respond(state: FetchState, response: Response) -> Self {
        Self {
            state,
            response: Some(response),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub namespace: String,
    /// URLs stored by the bulk add; empty when it was skipped
    pub precached: Vec<String>,
    /// Why the bulk add stored nothing, if it failed
    pub precache_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

pub struct OfflineCacheProxy {
    namespace: CacheNamespace,
    manifest: AssetManifest,
    scope: Url,
    excluded: String,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    host: Arc<dyn ClientHost>,
}

impl OfflineCacheProxy {
    pub fn new(
        config: &Config,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        host: Arc<dyn ClientHost>,
    ) -> Result<Self, NetworkError> {
        let scope = Url::parse(&config.scope)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", config.scope, e)))?;
        Ok(Self {
            namespace: CacheNamespace::new(config.cache_version.clone()),
            manifest: AssetManifest::new(config.assets.iter().cloned()),
            scope,
            excluded: config.excluded_domain.clone(),
            storage,
            network,
            host,
        })
    }

    pub fn namespace(&self) -> &CacheNamespace {
        &self.namespace
    }

    /// Plain substring match anywhere in the URL, query string included
    pub fn is_excluded(&self, request: &Request) -> bool {
        !self.excluded.is_empty() && request.url.contains(&self.excluded)
    }

    // ===== Install =====

    /// Open the current namespace and pre-cache the manifest.
    ///
    /// A failed bulk add is logged and reported, never returned as an error;
    /// only failing to open the namespace fails the install.
    pub async fn on_install(&self) -> Result<InstallReport, CacheError> {
        self.host.transition(WorkerPhase::Installing);
        let result = self.install().await;
        self.host.skip_waiting();

        match result {
            Ok(report) => {
                self.host.transition(WorkerPhase::Installed);
                Ok(report)
            }
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Install failed");
                self.host.transition(WorkerPhase::Redundant);
                Err(e)
            }
        }
    }

    async fn install(&self) -> Result<InstallReport, CacheError> {
        self.storage.open(self.namespace.as_str()).await?;

        let mut report = InstallReport {
            namespace: self.namespace.to_string(),
            precached: Vec::new(),
            precache_error: None,
        };
        match self.add_all().await {
            Ok(urls) => {
                info!(namespace = %self.namespace, count = urls.len(), "Pre-cached assets");
                report.precached = urls;
            }
            Err(reason) => {
                warn!(namespace = %self.namespace, reason = %reason, "Pre-caching skipped");
                report.precache_error = Some(reason);
            }
        }
        Ok(report)
    }

    /// Fetch every manifest URL concurrently and store them in one batch.
    /// Any failed fetch or non-2xx response stores nothing.
    async fn add_all(&self) -> Result<Vec<String>, String> {
        let urls = self.manifest.resolve(&self.scope).map_err(|e| e.to_string())?;
        let requests: Vec<Request> = urls
            .iter()
            .map(|url| Request::get(url.clone()).with_mode(RequestMode::Cors))
            .collect();

        let responses = join_all(requests.iter().map(|req| self.network.fetch(req))).await;

        let mut entries = Vec::with_capacity(requests.len());
        for (request, response) in requests.into_iter().zip(responses) {
            let response =
                response.map_err(|e| format!("Failed to fetch {}: {}", request.url, e))?;
            if !response.ok() {
                return Err(format!("{} returned status {}", request.url, response.status));
            }
            entries.push((request, response));
        }

        self.storage
            .put_all(self.namespace.as_str(), entries)
            .await
            .map_err(|e| e.to_string())?;
        Ok(urls)
    }

    // ===== Activate =====

    /// Delete every namespace other than the current one, then claim open pages.
    pub async fn on_activate(&self) -> Result<ActivateReport, CacheError> {
        self.host.transition(WorkerPhase::Activating);
        let result = self.evict_stale().await;
        self.host.claim_clients();
        self.host.transition(WorkerPhase::Activated);
        result
    }

    async fn evict_stale(&self) -> Result<ActivateReport, CacheError> {
        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| self.namespace.supersedes(name))
            .collect();

        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut report = ActivateReport::default();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    info!(namespace = %name, "Evicted stale cache namespace");
                    report.deleted.push(name);
                }
                Err(e) => {
                    warn!(namespace = %name, error = %e, "Failed to evict cache namespace");
                    report.failed.push(name);
                }
            }
        }
        Ok(report)
    }

    // ===== Fetch =====

    /// Decide how to answer one intercepted request.
    pub async fn on_fetch(&self, request: &Request) -> FetchOutcome {
        if self.is_excluded(request) {
            debug!(url = %request.url, "Request bypasses the cache");
            return FetchOutcome::not_intercepted();
        }

        let mut state = FetchState::Lookup;
        debug!(url = %request.url, state = state.as_str(), "Fetch event");

        let cached = match self.storage.match_request(request).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        };
        if let Some(response) = cached {
            debug!(url = %request.url, "Serving from cache");
            return FetchOutcome::respond(FetchState::Served, response);
        }

        state = FetchState::Fetching;
        debug!(url = %request.url, state = state.as_str(), "Cache miss");

        match self.network.fetch(request).await {
            Ok(response) if response.is_cacheable() && request.cache_key().is_some() => {
                let copy = response.clone();
                match self.storage.put(self.namespace.as_str(), request, copy).await {
                    Ok(()) => FetchOutcome::respond(FetchState::CachedAndServed, response),
                    Err(e) => {
                        warn!(url = %request.url, error = %e, "Failed to cache response");
                        FetchOutcome::respond(FetchState::ServedUncached, response)
                    }
                }
            }
            Ok(response) => {
                debug!(
                    url = %request.url,
                    status = response.status,
                    response_type = response.response_type.as_str(),
                    "Response not cacheable"
                );
                FetchOutcome::respond(FetchState::ServedUncached, response)
            }
            Err(e) => {
                // A hit already returned above, so there is nothing to fall back to.
                debug!(url = %request.url, error = %e, "Network failed on cache miss");
                FetchOutcome::respond(FetchState::Offline, Response::offline())
            }
        }
    }

    /// Answer a request the way the page sees it: excluded requests go
    /// straight to the network and their failures surface to the caller.
    pub async fn respond(&self, request: &Request) -> Result<(FetchState, Response), NetworkError> {
        let outcome = self.on_fetch(request).await;
        match outcome.response {
            Some(response) => Ok((outcome.state, response)),
            None => {
                let response = self.network.fetch(request).await?;
                Ok((outcome.state, response))
            }
        }
    }
}
