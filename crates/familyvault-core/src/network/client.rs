//! HTTP network backend built on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

use crate::error::NetworkError;
use crate::models::{Request, RequestMode, Response, ResponseType};

use super::Network;

/// Network backend for a proxy serving `scope`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    scope: Url,
}

impl HttpNetwork {
    pub fn new(scope: &str, timeout_secs: u64) -> Result<Self, NetworkError> {
        let scope = Url::parse(scope)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", scope, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, scope })
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.scope.origin()
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let url = Url::parse(&request.url)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", request.url, e)))?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::InvalidMethod(request.method.clone()))?;

        let cross_origin = !self.is_same_origin(&url);
        if cross_origin && request.mode == RequestMode::SameOrigin {
            return Err(NetworkError::CrossOriginBlocked(request.url.clone()));
        }

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;

        if cross_origin && request.mode == RequestMode::NoCors {
            debug!(url = %request.url, "Cross-origin no-cors response is opaque");
            return Ok(Response::opaque(request.url.clone()));
        }

        let final_url = response.url().clone();
        let status = response.status();
        let response_type = if self.is_same_origin(&final_url) {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        };
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(
            url = %request.url,
            status = status.as_u16(),
            response_type = response_type.as_str(),
            bytes = body.len(),
            "Network response received"
        );

        Ok(Response {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body,
        })
    }
}
