//! Data models shared by the proxy, the cache store and the network.
//!
//! - `Request`, `Response`: buffered fetch snapshots
//! - `ResponseType`, `RequestMode`: fetch classification used by the
//!   caching decision

pub mod http;

pub use http::{Request, RequestMode, Response, ResponseType, OFFLINE_BODY, OFFLINE_STATUS};
