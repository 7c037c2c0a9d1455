//! Offline asset cache for the game's static routes and media.
//!
//! This module provides the `OfflineCacheManager`, which mirrors the browser
//! service-worker lifecycle:
//!
//! - install: pre-cache every manifest route into the current versioned bucket
//! - activate: delete buckets left behind by earlier versions
//! - fetch: answer from cache first, otherwise from the network, keeping a copy
//!   of images, item art, fonts, stylesheets and scripts
//!
//! Storage and network access sit behind the `CacheStorage` and `Network`
//! traits so the manager can run against disk + HTTP or in memory.

pub mod disk;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod network;
pub mod request;
pub mod storage;

pub use disk::DiskCacheStorage;
pub use error::{NetworkError, OfflineError, StorageError};
pub use manager::{
    ActivateOutcome, CacheLifecycle, FetchResponse, InstallOutcome, LifecycleState,
    OfflineCacheManager, OfflineConfig, ResponseSource,
};
pub use manifest::{is_cacheable_response, should_cache_dynamically, Manifest};
pub use network::{HttpNetwork, Network};
pub use request::{CachedResponse, Request, ResponseKind};
pub use storage::{CacheStorage, MemoryCacheStorage};
