use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache namespace: {0}")]
    InvalidNamespace(String),

    #[error("Cache namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Request method '{0}' cannot be cached")]
    UnsupportedMethod(String),

    #[error("Request URL has no cache identity: {0}")]
    InvalidRequestUrl(String),

    #[error("Cache storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid request method: {0}")]
    InvalidMethod(String),

    #[error("Cross-origin request blocked in same-origin mode: {0}")]
    CrossOriginBlocked(String),

    #[error("Network unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::InvalidNamespace("../etc".to_string());
        assert_eq!(err.to_string(), "Invalid cache namespace: ../etc");
    }

    #[test]
    fn test_network_error_display() {
        let err = NetworkError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Network unavailable: connection refused");
    }
}
