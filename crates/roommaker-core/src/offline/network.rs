use std::future::Future;

use reqwest::{Client, Url};
use tracing::debug;

use super::{CachedResponse, NetworkError, Request, ResponseKind};

/// Issues requests that missed the cache.
pub trait Network: Clone + Send + Sync + 'static {
    fn fetch(&self, request: Request) -> impl Future<Output = Result<CachedResponse, NetworkError>> + Send;
}

/// `Network` over reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Url,
}

impl HttpNetwork {
    /// Responses whose final URL shares `origin` are tagged `Basic`,
    /// everything else `Cors`.
    pub fn new(origin: Url) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .user_agent(concat!("roommaker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, origin })
    }

    fn kind_for(&self, url: &Url) -> ResponseKind {
        if url.origin() == self.origin.origin() {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        }
    }
}

impl Network for HttpNetwork {
    async fn fetch(&self, request: Request) -> Result<CachedResponse, NetworkError> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    NetworkError::Unreachable(request.url.to_string())
                } else {
                    e.into()
                }
            })?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
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

        debug!(url = %request.url, status = status, bytes = body.len(), "Fetched from network");

        let mut cached = CachedResponse::new(final_url.as_str(), status, self.kind_for(&final_url), body);
        cached.headers = headers;
        Ok(cached)
    }
}
