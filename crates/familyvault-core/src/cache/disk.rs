use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CacheError;
use crate::models::{Request, Response};

use super::storage::{storage_key, validate_namespace};
use super::{CacheEntry, CacheStorage, CachedData};

/// Index file inside each namespace directory
const ENTRIES_FILE: &str = "entries.json";

type EntryIndex = BTreeMap<String, CachedData<Response>>;

/// Cache store persisted as one directory per namespace.
///
/// Each directory holds an `entries.json` index mapping request keys to
/// response snapshots. Index writes go through a temp file and a rename, so
/// readers only ever see a complete index. Namespaces are listed and matched
/// in name order.
///
/// Indexes are parsed once and kept in memory afterwards; the store assumes
/// it is the only writer of its directory.
pub struct DiskCacheStorage {
    cache_dir: PathBuf,
    indexes: Mutex<HashMap<String, EntryIndex>>,
}

impl DiskCacheStorage {
    pub fn new(cache_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            indexes: Mutex::new(HashMap::new()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.cache_dir.join(namespace)
    }

    fn index_path(&self, namespace: &str) -> PathBuf {
        self.namespace_dir(namespace).join(ENTRIES_FILE)
    }

    async fn read_index(&self, namespace: &str) -> Result<Option<EntryIndex>, CacheError> {
        match fs::read_to_string(self.index_path(namespace)).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_index(&self, namespace: &str, index: &EntryIndex) -> Result<(), CacheError> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir).await?;
        let tmp = dir.join(format!("{}.tmp", ENTRIES_FILE));
        let contents = serde_json::to_string(index)?;
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, self.index_path(namespace)).await?;
        Ok(())
    }

    /// Index for `namespace`, loading it from disk on first use
    async fn index_mut<'a>(
        &self,
        indexes: &'a mut HashMap<String, EntryIndex>,
        namespace: &str,
    ) -> Result<Option<&'a mut EntryIndex>, CacheError> {
        if !indexes.contains_key(namespace) {
            match self.read_index(namespace).await? {
                Some(index) => {
                    indexes.insert(namespace.to_string(), index);
                }
                None => return Ok(None),
            }
        }
        Ok(indexes.get_mut(namespace))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, CacheError> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_namespace(&name).is_ok()
                && fs::try_exists(entry.path().join(ENTRIES_FILE)).await?
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, namespace: &str) -> Result<(), CacheError> {
        validate_namespace(namespace)?;
        let mut indexes = self.indexes.lock().await;
        if self.index_mut(&mut indexes, namespace).await?.is_none() {
            debug!(namespace = namespace, "Creating cache namespace");
            let index = EntryIndex::new();
            self.write_index(namespace, &index).await?;
            indexes.insert(namespace.to_string(), index);
        }
        Ok(())
    }

    async fn has(&self, namespace: &str) -> Result<bool, CacheError> {
        if validate_namespace(namespace).is_err() {
            return Ok(false);
        }
        Ok(fs::try_exists(self.index_path(namespace)).await?)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.list_namespaces().await
    }

    async fn delete(&self, namespace: &str) -> Result<bool, CacheError> {
        validate_namespace(namespace)?;
        let mut indexes = self.indexes.lock().await;
        indexes.remove(namespace);
        match fs::remove_dir_all(self.namespace_dir(namespace)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        let Some(key) = request.cache_key() else {
            return Ok(None);
        };
        let namespaces = self.list_namespaces().await?;
        let mut indexes = self.indexes.lock().await;
        for namespace in namespaces {
            if let Some(index) = self.index_mut(&mut indexes, &namespace).await? {
                if let Some(cached) = index.get(&key) {
                    return Ok(Some(cached.data.clone()));
                }
            }
        }
        Ok(None)
    }

    async fn put(
        &self,
        namespace: &str,
        request: &Request,
        response: Response,
    ) -> Result<(), CacheError> {
        self.put_all(namespace, vec![(request.clone(), response)]).await
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

        let mut indexes = self.indexes.lock().await;
        let mut index = match self.index_mut(&mut indexes, namespace).await? {
            Some(index) => index.clone(),
            None => EntryIndex::new(),
        };
        for (key, response) in keyed {
            index.insert(key, CachedData::new(response));
        }
        // Only publish the new index in memory once it is on disk
        self.write_index(namespace, &index).await?;
        indexes.insert(namespace.to_string(), index);
        Ok(())
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<CacheEntry>, CacheError> {
        validate_namespace(namespace)?;
        let mut indexes = self.indexes.lock().await;
        let index = self
            .index_mut(&mut indexes, namespace)
            .await?
            .ok_or_else(|| CacheError::NamespaceNotFound(namespace.to_string()))?;
        Ok(index
            .iter()
            .map(|(key, response)| CacheEntry {
                key: key.clone(),
                response: response.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResponseType;

    fn ok_response(url: &str, body: &str) -> Response {
        Response::new(url, 200, ResponseType::Basic)
            .with_header("content-type", "text/html")
            .with_body(body)
    }

    #[tokio::test]
    async fn test_open_creates_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        store.open("familyvault-v2").await.unwrap();

        assert!(dir.path().join("familyvault-v2").join(ENTRIES_FILE).exists());
        assert_eq!(store.keys().await.unwrap(), vec!["familyvault-v2"]);
        assert!(store.entries("familyvault-v2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::get("http://localhost:8080/index.html");
        {
            let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
            store.put("v2", &req, ok_response(&req.url, "<html>")).await.unwrap();
        }

        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        let hit = store.match_request(&req).await.unwrap().expect("expected hit");
        assert_eq!(hit.text(), "<html>");
        assert_eq!(hit.header("content-type"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_keys_ignore_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        store.open("v1").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join("empty-dir")).unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_delete_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        store.open("v1").await.unwrap();
        store.open("v2").await.unwrap();

        assert!(store.delete("v1").await.unwrap());
        assert!(!dir.path().join("v1").exists());
        assert!(!store.delete("v1").await.unwrap());
        assert_eq!(store.keys().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_put_all_is_single_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        let a = Request::get("http://localhost:8080/a.js");
        let b = Request::get("http://localhost:8080/b.js");
        store
            .put_all(
                "v2",
                vec![
                    (a.clone(), ok_response(&a.url, "a")),
                    (b.clone(), ok_response(&b.url, "b")),
                ],
            )
            .await
            .unwrap();

        let keys: Vec<String> = store
            .entries("v2")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["http://localhost:8080/a.js", "http://localhost:8080/b.js"]);
        assert!(!dir.path().join("v2").join("entries.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_index_stores_body_as_base64() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        let req = Request::get("http://localhost:8080/");
        store.put("v2", &req, ok_response(&req.url, "home")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("v2").join(ENTRIES_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            json["http://localhost:8080/"]["data"]["body"],
            serde_json::Value::String("aG9tZQ==".to_string())
        );
    }

    #[tokio::test]
    async fn test_put_after_delete_recreates_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        let a = Request::get("http://localhost:8080/a.js");
        let b = Request::get("http://localhost:8080/b.js");
        store.put("v2", &a, ok_response(&a.url, "a")).await.unwrap();
        assert!(store.delete("v2").await.unwrap());

        store.put("v2", &b, ok_response(&b.url, "b")).await.unwrap();
        let entries = store.entries("v2").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "http://localhost:8080/b.js");
    }

    #[tokio::test]
    async fn test_has_rejects_unsafe_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(!store.has("../etc").await.unwrap());
        assert!(matches!(
            store.delete("../etc").await,
            Err(CacheError::InvalidNamespace(_))
        ));
    }
}
