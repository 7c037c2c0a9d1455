use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use super::{CachedResponse, StorageError};

/// Named, versioned buckets of cached responses keyed by request URL.
///
/// Implementations are shared between concurrent fetch handlers and the
/// background cache writes, so they are cheap to clone and synchronise
/// internally. Each write is an independent per-key put.
pub trait CacheStorage: Clone + Send + Sync + 'static {
    /// Create the bucket if it does not exist yet
    fn open(&self, bucket: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Names of every existing bucket, sorted
    fn keys(&self) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    fn has(&self, bucket: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Remove a bucket and everything in it. Returns false if it did not exist.
    fn delete(&self, bucket: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Store one response, creating the bucket if needed
    fn put(
        &self,
        bucket: &str,
        url: &str,
        response: CachedResponse,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Store several responses at once. Either all of them land or none do.
    fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(String, CachedResponse)>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn match_bucket(
        &self,
        bucket: &str,
        url: &str,
    ) -> impl Future<Output = Result<Option<CachedResponse>, StorageError>> + Send;

    /// Cached URLs of one bucket, sorted. Empty if the bucket does not exist.
    fn bucket_urls(&self, bucket: &str) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Look a URL up in every bucket, in name order.
    /// A bucket that fails to read is skipped.
    fn match_any(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<CachedResponse>, StorageError>> + Send {
        async move {
            for bucket in self.keys().await? {
                match self.match_bucket(&bucket, url).await {
                    Ok(Some(response)) => return Ok(Some(response)),
                    Ok(None) => {}
                    Err(e) => warn!(bucket = %bucket, url = url, error = %e, "Skipping unreadable bucket"),
                }
            }
            Ok(None)
        }
    }
}

type Buckets = BTreeMap<String, BTreeMap<String, CachedResponse>>;

/// In-process cache storage. Clones share the same buckets.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    buckets: Arc<RwLock<Buckets>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, bucket: &str) -> Result<(), StorageError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn has(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn delete(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    async fn put(&self, bucket: &str, url: &str, response: CachedResponse) -> Result<(), StorageError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(url.to_string(), response);
        Ok(())
    }

    async fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(String, CachedResponse)>,
    ) -> Result<(), StorageError> {
        // Single write lock, so readers never observe a partial batch
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().extend(entries);
        Ok(())
    }

    async fn match_bucket(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|entries| entries.get(url))
            .cloned())
    }

    async fn bucket_urls(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::ResponseKind;

    fn response(url: &str, body: &str) -> CachedResponse {
        CachedResponse::new(url, 200, ResponseKind::Basic, body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_open_creates_empty_bucket() {
        let storage = MemoryCacheStorage::new();
        assert!(!storage.has("v1").await.unwrap());

        storage.open("v1").await.unwrap();
        assert!(storage.has("v1").await.unwrap());
        assert!(storage.bucket_urls("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = MemoryCacheStorage::new();
        storage.put("v1", "https://a.test/x.css", response("https://a.test/x.css", "body")).await.unwrap();

        let hit = storage.match_bucket("v1", "https://a.test/x.css").await.unwrap();
        assert_eq!(hit.map(|r| r.body), Some(b"body".to_vec()));
        assert!(storage.match_bucket("v2", "https://a.test/x.css").await.unwrap().is_none());
        assert!(storage.match_bucket("v1", "https://a.test/y.css").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_any_searches_all_buckets() {
        let storage = MemoryCacheStorage::new();
        storage.put("b", "https://a.test/1", response("https://a.test/1", "from b")).await.unwrap();
        storage.put("a", "https://a.test/2", response("https://a.test/2", "from a")).await.unwrap();

        let one = storage.match_any("https://a.test/1").await.unwrap();
        assert_eq!(one.map(|r| r.body), Some(b"from b".to_vec()));
        let two = storage.match_any("https://a.test/2").await.unwrap();
        assert_eq!(two.map(|r| r.body), Some(b"from a".to_vec()));
        assert!(storage.match_any("https://a.test/3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_keys() {
        let storage = MemoryCacheStorage::new();
        storage.open("v2").await.unwrap();
        storage.open("v1").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["v1", "v2"]);

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_put_all_overwrites_existing() {
        let storage = MemoryCacheStorage::new();
        storage.put("v1", "https://a.test/", response("https://a.test/", "old")).await.unwrap();
        storage
            .put_all(
                "v1",
                vec![
                    ("https://a.test/".to_string(), response("https://a.test/", "new")),
                    ("https://a.test/level1".to_string(), response("https://a.test/level1", "l1")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            storage.bucket_urls("v1").await.unwrap(),
            vec!["https://a.test/", "https://a.test/level1"]
        );
        let home = storage.match_bucket("v1", "https://a.test/").await.unwrap();
        assert_eq!(home.map(|r| r.body), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_clones_share_buckets() {
        let storage = MemoryCacheStorage::new();
        let other = storage.clone();
        other.open("shared").await.unwrap();
        assert!(storage.has("shared").await.unwrap());
    }
}
