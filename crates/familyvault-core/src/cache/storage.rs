use async_trait::async_trait;

use crate::error::CacheError;
use crate::models::{Request, Response};

use super::CacheEntry;

/// Key-value store of named cache buckets, keyed by request identity.
///
/// Every operation is atomic on its own; callers never hold locks across
/// operations. `put` and `put_all` create the namespace when it is absent,
/// the way opening a cache before writing to it would.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the namespace if it does not exist yet
    async fn open(&self, namespace: &str) -> Result<(), CacheError>;

    async fn has(&self, namespace: &str) -> Result<bool, CacheError>;

    /// Names of every namespace currently stored
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Remove a namespace and all its entries. Returns false when it did not exist.
    async fn delete(&self, namespace: &str) -> Result<bool, CacheError>;

    /// Look the request up across all namespaces
    async fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError>;

    async fn put(
        &self,
        namespace: &str,
        request: &Request,
        response: Response,
    ) -> Result<(), CacheError>;

    /// Store every pair or none of them
    async fn put_all(
        &self,
        namespace: &str,
        entries: Vec<(Request, Response)>,
    ) -> Result<(), CacheError>;

    /// Entries of one namespace, ordered by request key
    async fn entries(&self, namespace: &str) -> Result<Vec<CacheEntry>, CacheError>;
}

/// Identity a request is stored under; non-GET requests cannot be stored.
pub(crate) fn storage_key(request: &Request) -> Result<String, CacheError> {
    if !request.method.eq_ignore_ascii_case("GET") {
        return Err(CacheError::UnsupportedMethod(request.method.clone()));
    }
    request
        .cache_key()
        .ok_or_else(|| CacheError::InvalidRequestUrl(request.url.clone()))
}

/// Namespaces double as directory names, so keep them to a safe alphabet.
pub(crate) fn validate_namespace(namespace: &str) -> Result<(), CacheError> {
    let valid = !namespace.is_empty()
        && !namespace.starts_with('.')
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidNamespace(namespace.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_namespace() {
        assert!(validate_namespace("familyvault-v2").is_ok());
        assert!(validate_namespace("app_cache.3").is_ok());

        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("..").is_err());
        assert!(validate_namespace(".hidden").is_err());
        assert!(validate_namespace("a/b").is_err());
        assert!(validate_namespace("v 2").is_err());
    }

    #[test]
    fn test_storage_key_rejects_post() {
        let req = Request::get("http://localhost:8080/api").with_method("POST");
        assert!(matches!(storage_key(&req), Err(CacheError::UnsupportedMethod(m)) if m == "POST"));
    }

    #[test]
    fn test_storage_key_rejects_relative_url() {
        let req = Request::get("./index.html");
        assert!(matches!(storage_key(&req), Err(CacheError::InvalidRequestUrl(_))));
    }

    #[test]
    fn test_storage_key_is_normalized() {
        let req = Request::get("HTTP://localhost:8080");
        assert_eq!(storage_key(&req).unwrap(), "http://localhost:8080/");
    }
}
