use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::models::{Request, Response};

use super::storage::{storage_key, validate_namespace};
use super::{CacheEntry, CacheStorage, CachedData};

#[derive(Debug)]
struct Bucket {
    name: String,
    entries: Vec<(String, CachedData<Response>)>,
}

impl Bucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, key: String, response: Response) {
        let cached = CachedData::new(response);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = cached,
            None => self.entries.push((key, cached)),
        }
    }
}

/// In-process cache store. Namespaces are matched in creation order.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<Vec<Bucket>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bucket_mut<'a>(buckets: &'a mut Vec<Bucket>, namespace: &str) -> &'a mut Bucket {
    let pos = match buckets.iter().position(|b| b.name == namespace) {
        Some(pos) => pos,
        None => {
            buckets.push(Bucket::new(namespace));
            buckets.len() - 1
        }
    };
    &mut buckets[pos]
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, namespace: &str) -> Result<(), CacheError> {
        validate_namespace(namespace)?;
        let mut buckets = self.buckets.write().await;
        bucket_mut(&mut buckets, namespace);
        Ok(())
    }

    async fn has(&self, namespace: &str) -> Result<bool, CacheError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().any(|b| b.name == namespace))
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().map(|b| b.name.clone()).collect())
    }

    async fn delete(&self, namespace: &str) -> Result<bool, CacheError> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|b| b.name != namespace);
        Ok(buckets.len() != before)
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        let Some(key) = request.cache_key() else {
            return Ok(None);
        };
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().find_map(|b| {
            b.entries
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, cached)| cached.data.clone())
        }))
    }

    async fn put(
        &self,
        namespace: &str,
        request: &Request,
        response: Response,
    ) -> Result<(), CacheError> {
        validate_namespace(namespace)?;
        let key = storage_key(request)?;
        let mut buckets = self.buckets.write().await;
        bucket_mut(&mut buckets, namespace).insert(key, response);
        Ok(())
    }

    async fn put_all(
        &self,
        namespace: &str,
        entries: Vec<(Request, Response)>,
    ) -> Result<(), CacheError> {
        validate_namespace(namespace)?;
        let keyed = entries
            .into_iter()
            .map(|(req, res)| storage_key(&req).map(|key| (key, res)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut buckets = self.buckets.write().await;
        let bucket = bucket_mut(&mut buckets, namespace);
        for (key, response) in keyed {
            bucket.insert(key, response);
        }
        Ok(())
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<CacheEntry>, CacheError> {
        let buckets = self.buckets.read().await;
        let bucket = buckets
            .iter()
            .find(|b| b.name == namespace)
            .ok_or_else(|| CacheError::NamespaceNotFound(namespace.to_string()))?;
        let mut entries: Vec<CacheEntry> = bucket
            .entries
            .iter()
            .map(|(key, cached)| CacheEntry {
                key: key.clone(),
                response: cached.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
