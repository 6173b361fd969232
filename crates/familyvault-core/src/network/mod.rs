//! Network access for cache misses and asset pre-caching.
//!
//! `Network` is the seam the proxy fetches through; `HttpNetwork` is the
//! reqwest-backed implementation that classifies responses the way a
//! browser would (`basic` for same-origin, `cors` or `opaque` otherwise).

pub mod client;

use async_trait::async_trait;

use crate::error::NetworkError;
use crate::models::{Request, Response};

pub use client::HttpNetwork;

#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. `Err` means no response was received at all.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}
