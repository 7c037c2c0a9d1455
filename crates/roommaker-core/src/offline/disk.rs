//! On-disk cache buckets.
//!
//! Each bucket is a directory under the cache root holding an `index.json`
//! (bucket name, URL → response metadata) and one `.body` file per cached
//! response. The index is always rewritten through a temp file and rename, so
//! a batch written by `put_all` becomes visible all at once.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::{CachedResponse, StorageError};

const INDEX_FILE: &str = "index.json";
const BODY_EXTENSION: &str = "body";

#[derive(Debug, Serialize, Deserialize)]
struct BucketIndex {
    name: String,
    next_id: u64,
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    response: CachedResponse,
    body_file: String,
}

impl BucketIndex {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }

    fn allocate_body_file(&mut self) -> String {
        let file = format!("{:08}.{}", self.next_id, BODY_EXTENSION);
        self.next_id += 1;
        file
    }
}

/// Cache storage persisted under a directory. Clones share one lock.
#[derive(Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl DiskCacheStorage {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Arc::new(RwLock::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a bucket name to a filename-safe directory name.
    /// Bytes outside `[A-Za-z0-9.-]` become `_XX`, so distinct names never
    /// share a directory.
    fn dir_name(bucket: &str) -> String {
        if bucket.is_empty() {
            return "_".to_string();
        }
        let mut name = String::with_capacity(bucket.len());
        for (i, byte) in bucket.bytes().enumerate() {
            let keep = byte.is_ascii_alphanumeric() || byte == b'-' || (byte == b'.' && i > 0);
            if keep {
                name.push(byte as char);
            } else {
                name.push_str(&format!("_{:02X}", byte));
            }
        }
        name
    }

    /// Inverse of `dir_name`. None for directories this storage did not create.
    fn bucket_name(dir: &str) -> Option<String> {
        if dir == "_" {
            return Some(String::new());
        }
        let mut bytes = Vec::with_capacity(dir.len());
        let mut rest = dir.as_bytes();
        while let Some((&byte, tail)) = rest.split_first() {
            if byte == b'_' {
                let hex = std::str::from_utf8(tail.get(..2)?).ok()?;
                bytes.push(u8::from_str_radix(hex, 16).ok()?);
                rest = &tail[2..];
            } else {
                bytes.push(byte);
                rest = tail;
            }
        }
        let name = String::from_utf8(bytes).ok()?;
        (Self::dir_name(&name) == dir).then_some(name)
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(Self::dir_name(bucket))
    }

    async fn read_index_at(dir: &Path) -> Result<Option<BucketIndex>, StorageError> {
        match fs::read_to_string(dir.join(INDEX_FILE)).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Index of the named bucket, if it exists
    async fn read_index(&self, bucket: &str) -> Result<Option<BucketIndex>, StorageError> {
        let index = Self::read_index_at(&self.bucket_dir(bucket)).await?;
        Ok(index.filter(|idx| idx.name == bucket))
    }

    async fn write_index(&self, index: &BucketIndex) -> Result<(), StorageError> {
        let dir = self.bucket_dir(&index.name);
        fs::create_dir_all(&dir).await?;
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        fs::write(&tmp, serde_json::to_string_pretty(index)?).await?;
        fs::rename(&tmp, dir.join(INDEX_FILE)).await?;
        Ok(())
    }

    async fn remove_bodies(&self, bucket: &str, files: Vec<String>) {
        let dir = self.bucket_dir(bucket);
        for file in files {
            if let Err(e) = fs::remove_file(dir.join(&file)).await {
                debug!(bucket = bucket, file = %file, error = %e, "Failed to remove replaced body");
            }
        }
    }

    /// Write bodies for `entries` and record them in `index`.
    /// Returns the body files that were replaced.
    async fn stage_entries(
        &self,
        index: &mut BucketIndex,
        entries: Vec<(String, CachedResponse)>,
    ) -> Result<Vec<String>, StorageError> {
        let dir = self.bucket_dir(&index.name);
        fs::create_dir_all(&dir).await?;

        let mut replaced = Vec::new();
        for (url, response) in entries {
            let body_file = index.allocate_body_file();
            fs::write(dir.join(&body_file), &response.body).await?;
            if let Some(old) = index.entries.insert(url, IndexEntry { response, body_file }) {
                replaced.push(old.body_file);
            }
        }
        Ok(replaced)
    }

    async fn put_entries(
        &self,
        bucket: &str,
        entries: Vec<(String, CachedResponse)>,
    ) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;

        let mut index = self
            .read_index(bucket)
            .await?
            .unwrap_or_else(|| BucketIndex::new(bucket));
        let replaced = self.stage_entries(&mut index, entries).await?;
        self.write_index(&index).await?;
        self.remove_bodies(bucket, replaced).await;
        Ok(())
    }
}

impl CacheStorage for DiskCacheStorage {
    async fn open(&self, bucket: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        if self.read_index(bucket).await?.is_none() {
            self.write_index(&BucketIndex::new(bucket)).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock.read().await;

        let mut names = Vec::new();
        let mut dirs = match fs::read_dir(&self.root).await {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dirs.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match Self::read_index_at(&entry.path()).await {
                Ok(Some(index)) => names.push(index.name),
                Ok(None) => {}
                // Still listed so activation can evict it
                Err(e) => {
                    let dir = entry.file_name();
                    match dir.to_str().and_then(Self::bucket_name) {
                        Some(name) => {
                            warn!(bucket = %name, error = %e, "Unreadable bucket index");
                            names.push(name);
                        }
                        None => {
                            warn!(dir = ?dir, error = %e, "Skipping unreadable cache directory");
                        }
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn has(&self, bucket: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.read().await;
        Ok(self.read_index(bucket).await?.is_some())
    }

    async fn delete(&self, bucket: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.write().await;
        match self.read_index(bucket).await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(false),
            Err(StorageError::Serialize(e)) => {
                warn!(bucket = bucket, error = %e, "Deleting bucket with corrupt index");
            }
            Err(e) => return Err(e),
        }
        fs::remove_dir_all(self.bucket_dir(bucket)).await?;
        Ok(true)
    }

    async fn put(&self, bucket: &str, url: &str, response: CachedResponse) -> Result<(), StorageError> {
        self.put_entries(bucket, vec![(url.to_string(), response)]).await
    }

    async fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(String, CachedResponse)>,
    ) -> Result<(), StorageError> {
        self.put_entries(bucket, entries).await
    }

    async fn match_bucket(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        let _guard = self.lock.read().await;

        let Some(mut index) = self.read_index(bucket).await? else {
            return Ok(None);
        };
        let Some(entry) = index.entries.remove(url) else {
            return Ok(None);
        };

        let body = match fs::read(self.bucket_dir(bucket).join(&entry.body_file)).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::MissingBody {
                    bucket: bucket.to_string(),
                    file: entry.body_file,
                });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CachedResponse {
            body,
            ..entry.response
        }))
    }

    async fn bucket_urls(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock.read().await;
        Ok(self
            .read_index(bucket)
            .await?
            .map(|index| index.entries.into_keys().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::ResponseKind;

    fn response(url: &str, body: &[u8]) -> CachedResponse {
        CachedResponse::new(url, 200, ResponseKind::Basic, body.to_vec())
            .with_header("Content-Type", "application/octet-stream")
    }

    fn storage() -> (tempfile::TempDir, DiskCacheStorage) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storage = DiskCacheStorage::new(dir.path().join("buckets")).expect("create storage");
        (dir, storage)
    }

    #[test]
    fn test_dir_name() {
        assert_eq!(DiskCacheStorage::dir_name("room-maker-cache-v1"), "room-maker-cache-v1");
        assert_eq!(DiskCacheStorage::dir_name("a/b c"), "a_2Fb_20c");
        assert_eq!(DiskCacheStorage::dir_name("a_b"), "a_5Fb");
        assert_eq!(DiskCacheStorage::dir_name(".."), "_2E.");
        assert_eq!(DiskCacheStorage::dir_name(""), "_");
    }

    #[test]
    fn test_bucket_name_inverts_dir_name() {
        for name in ["room-maker-cache-v1", "a/b c", "a_b", "..", "", "快取"] {
            let dir = DiskCacheStorage::dir_name(name);
            assert_eq!(DiskCacheStorage::bucket_name(&dir).as_deref(), Some(name));
        }
        assert_eq!(DiskCacheStorage::bucket_name("a_2"), None);
        assert_eq!(DiskCacheStorage::bucket_name("a_ZZ"), None);
        assert_eq!(DiskCacheStorage::bucket_name("a_2fb"), None);
        assert_eq!(DiskCacheStorage::bucket_name(".hidden"), None);
    }

    #[tokio::test]
    async fn test_corrupt_bucket_is_listed_and_deletable() {
        let (_dir, storage) = storage();
        let url = "https://a.test/level1";
        storage.put("v2", url, response(url, b"level one")).await.unwrap();
        let old = storage.root().join("old");
        std::fs::create_dir_all(&old).expect("create old bucket");
        std::fs::write(old.join(INDEX_FILE), "{not json").expect("write corrupt index");

        assert_eq!(storage.keys().await.unwrap(), vec!["old", "v2"]);
        let hit = storage.match_any(url).await.unwrap();
        assert_eq!(hit.map(|r| r.body), Some(b"level one".to_vec()));

        assert!(storage.delete("old").await.unwrap());
        assert!(!old.exists());
        assert_eq!(storage.keys().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_put_and_match_round_trip_body() {
        let (_dir, storage) = storage();
        let font = vec![0u8, 1, 2, 255, 254];
        storage
            .put("v1", "https://a.test/fonts/f.ttf", response("https://a.test/fonts/f.ttf", &font))
            .await
            .unwrap();

        let hit = storage
            .match_bucket("v1", "https://a.test/fonts/f.ttf")
            .await
            .unwrap()
            .expect("cached font");
        assert_eq!(hit.body, font);
        assert_eq!(hit.header("content-type"), Some("application/octet-stream"));
        assert_eq!(hit.kind, ResponseKind::Basic);
    }

    #[tokio::test]
    async fn test_keys_use_original_names() {
        let (_dir, storage) = storage();
        storage.open("room maker/v2").await.unwrap();
        storage.open("room-maker-cache-v1").await.unwrap();

        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["room maker/v2", "room-maker-cache-v1"]
        );
        assert!(storage.has("room maker/v2").await.unwrap());
        assert!(!storage.has("room_maker_v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_removes_old_body() {
        let (_dir, storage) = storage();
        let url = "https://a.test/app.js";
        storage.put("v1", url, response(url, b"one")).await.unwrap();
        storage.put("v1", url, response(url, b"two")).await.unwrap();

        let hit = storage.match_bucket("v1", url).await.unwrap().expect("cached script");
        assert_eq!(hit.body, b"two".to_vec());

        let mut bodies = 0;
        let mut entries = std::fs::read_dir(storage.root().join("v1")).expect("bucket dir");
        while let Some(Ok(entry)) = entries.next() {
            if entry.path().extension().and_then(|e| e.to_str()) == Some(BODY_EXTENSION) {
                bodies += 1;
            }
        }
        assert_eq!(bodies, 1);
    }

    #[tokio::test]
    async fn test_delete_bucket() {
        let (_dir, storage) = storage();
        storage.put("v1", "https://a.test/", response("https://a.test/", b"home")).await.unwrap();
        storage.open("v2").await.unwrap();

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["v2"]);
        assert!(!storage.root().join("v1").exists());
    }

    #[tokio::test]
    async fn test_put_all_and_urls() {
        let (_dir, storage) = storage();
        storage
            .put_all(
                "v1",
                vec![
                    ("https://a.test/level1".to_string(), response("https://a.test/level1", b"1")),
                    ("https://a.test/".to_string(), response("https://a.test/", b"home")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            storage.bucket_urls("v1").await.unwrap(),
            vec!["https://a.test/", "https://a.test/level1"]
        );
        assert!(storage.bucket_urls("v9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buckets_survive_reopen() {
        let (dir, storage) = storage();
        storage.put("v1", "https://a.test/", response("https://a.test/", b"home")).await.unwrap();
        drop(storage);

        let reopened = DiskCacheStorage::new(dir.path().join("buckets")).expect("reopen storage");
        let hit = reopened.match_any("https://a.test/").await.unwrap();
        assert_eq!(hit.map(|r| r.body), Some(b"home".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_body_is_reported() {
        let (_dir, storage) = storage();
        let url = "https://a.test/x.css";
        storage.put("v1", url, response(url, b"x")).await.unwrap();
        std::fs::remove_file(storage.root().join("v1").join("00000000.body")).expect("remove body");

        let result = storage.match_bucket("v1", url).await;
        assert!(matches!(result, Err(StorageError::MissingBody { .. })));
    }
}
