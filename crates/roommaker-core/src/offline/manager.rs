//! Service-worker style lifecycle over a versioned cache bucket.

use std::future::Future;
use std::sync::Mutex;

use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::manifest::{is_cacheable_response, should_cache_dynamically, Manifest};
use super::network::Network;
use super::storage::CacheStorage;
use super::{CachedResponse, OfflineError, Request};

// ============================================================================
// Constants
// ============================================================================

/// Maximum manifest requests in flight during install.
const MAX_CONCURRENT_INSTALL_FETCHES: usize = 8;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineConfig {
    /// Name of the current bucket; bumping it invalidates every older bucket
    pub cache_name: String,
    pub origin: Url,
    pub manifest: Manifest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub cache_name: String,
    pub cached: usize,
    /// The new version takes over without waiting for old sessions to close
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOutcome {
    pub deleted: Vec<String>,
    /// Already-open sessions are controlled immediately, without a reload
    pub clients_claimed: bool,
}

/// The three lifecycle events a host dispatches to the cache.
///
/// The host guarantees install and activate never overlap and that activate
/// starts only after install settled. Fetches may overlap each other.
pub trait CacheLifecycle {
    fn on_install(&self) -> impl Future<Output = Result<InstallOutcome, OfflineError>> + Send;

    fn on_activate(&self) -> impl Future<Output = Result<ActivateOutcome, OfflineError>> + Send;

    fn on_fetch(&self, request: Request) -> impl Future<Output = Result<FetchResponse, OfflineError>> + Send;
}

// ============================================================================
// Manager
// ============================================================================

pub struct OfflineCacheManager<S, N> {
    config: OfflineConfig,
    storage: S,
    network: N,
    state: Mutex<LifecycleState>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: CacheStorage, N: Network> OfflineCacheManager<S, N> {
    pub fn new(config: OfflineConfig, storage: S, network: N) -> Self {
        Self {
            config,
            storage,
            network,
            state: Mutex::new(LifecycleState::Uninstalled),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: LifecycleState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Wait for every background cache write started so far
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.pending_writes.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background cache write task failed");
            }
        }
    }

    /// Fetch every manifest entry. Nothing is returned unless all succeed.
    async fn fetch_manifest(&self) -> Result<Vec<(String, CachedResponse)>, OfflineError> {
        let requests = self.config.manifest.requests(&self.config.origin)?;

        stream::iter(requests)
            .map(|request| {
                let network = self.network.clone();
                async move {
                    let url = request.cache_key();
                    let response = network
                        .fetch(request)
                        .await
                        .map_err(|source| OfflineError::InstallFetch {
                            url: url.clone(),
                            source,
                        })?;
                    if !response.is_ok() {
                        return Err(OfflineError::InstallStatus {
                            url,
                            status: response.status,
                        });
                    }
                    Ok::<_, OfflineError>((url, response))
                }
            })
            .buffer_unordered(MAX_CONCURRENT_INSTALL_FETCHES)
            .try_collect()
            .await
    }

    async fn install(&self) -> Result<InstallOutcome, OfflineError> {
        let cache_name = self.config.cache_name.clone();
        self.storage.open(&cache_name).await?;
        info!(cache = %cache_name, "Opened cache");

        let entries = self.fetch_manifest().await?;
        let cached = entries.len();
        self.storage.put_all(&cache_name, entries).await?;

        info!(cache = %cache_name, assets = cached, "Pre-cached manifest");
        Ok(InstallOutcome {
            cache_name,
            cached,
            skip_waiting: true,
        })
    }

    async fn activate(&self) -> Result<ActivateOutcome, OfflineError> {
        let mut deleted = Vec::new();

        for name in self.storage.keys().await? {
            if name == self.config.cache_name {
                continue;
            }
            // A bucket that fails to delete is retried on the next activation
            match self.storage.delete(&name).await {
                Ok(true) => {
                    info!(cache = %name, "Deleting old cache");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => warn!(cache = %name, error = %e, "Failed to delete old cache"),
            }
        }

        Ok(ActivateOutcome {
            deleted,
            clients_claimed: true,
        })
    }

    /// Cache lookup. A storage read error counts as a miss.
    async fn lookup(&self, request: &Request) -> Option<CachedResponse> {
        if !request.is_cacheable_method() {
            return None;
        }
        match self.storage.match_any(&request.cache_key()).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Cache lookup failed, going to network");
                None
            }
        }
    }

    /// Store a copy of `response` in the current bucket without blocking the caller
    fn spawn_cache_write(&self, url: String, response: CachedResponse) {
        let storage = self.storage.clone();
        let cache_name = self.config.cache_name.clone();

        let handle = tokio::spawn(async move {
            match storage.put(&cache_name, &url, response).await {
                Ok(()) => debug!(cache = %cache_name, url = %url, "Cached fetched asset"),
                Err(e) => warn!(cache = %cache_name, url = %url, error = %e, "Failed to cache fetched asset"),
            }
        });

        let mut pending = self.pending_writes.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    async fn fetch(&self, request: Request) -> Result<FetchResponse, OfflineError> {
        if let Some(response) = self.lookup(&request).await {
            debug!(url = %request.url, "Cache hit");
            return Ok(FetchResponse {
                response,
                source: ResponseSource::Cache,
            });
        }

        debug!(url = %request.url, "Cache miss");
        let response = self.network.fetch(request.clone()).await?;

        if is_cacheable_response(&response)
            && request.is_cacheable_method()
            && should_cache_dynamically(&request.url)
        {
            self.spawn_cache_write(request.cache_key(), response.clone());
        }

        Ok(FetchResponse {
            response,
            source: ResponseSource::Network,
        })
    }
}

impl<S: CacheStorage, N: Network> CacheLifecycle for OfflineCacheManager<S, N> {
    async fn on_install(&self) -> Result<InstallOutcome, OfflineError> {
        self.set_state(LifecycleState::Installing);
        match self.install().await {
            Ok(outcome) => {
                self.set_state(LifecycleState::Installed);
                Ok(outcome)
            }
            Err(e) => {
                warn!(cache = %self.config.cache_name, error = %e, "Install failed");
                self.set_state(LifecycleState::Uninstalled);
                Err(e)
            }
        }
    }

    async fn on_activate(&self) -> Result<ActivateOutcome, OfflineError> {
        let previous = self.state();
        self.set_state(LifecycleState::Activating);
        match self.activate().await {
            Ok(outcome) => {
                self.set_state(LifecycleState::Active);
                Ok(outcome)
            }
            Err(e) => {
                warn!(cache = %self.config.cache_name, error = %e, "Activation failed");
                self.set_state(previous);
                Err(e)
            }
        }
    }

    async fn on_fetch(&self, request: Request) -> Result<FetchResponse, OfflineError> {
        self.fetch(request).await
    }
}

// ============================================================================
// Tests
// ============================================================================
