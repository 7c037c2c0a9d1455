use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use super::OfflineError;

/// An outgoing asset request.
/// Cloning produces an independent copy that can be handed to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Build a GET request for a path (or absolute URL) relative to `origin`
    pub fn for_path(origin: &Url, path: &str) -> Result<Self, OfflineError> {
        let url = origin.join(path).map_err(|e| OfflineError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::get(url))
    }

    /// Cache key for this request: the URL without its fragment, so
    /// `/app.css#a` and `/app.css#b` share one entry
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }

    /// Only GET requests are matched against or stored in cache buckets
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET
    }
}

/// How a response relates to the requesting origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response
    Basic,
    /// Cross-origin response with readable body
    Cors,
    /// Cross-origin response without readable body
    Opaque,
    Error,
}

/// Snapshot of a network response as stored in a cache bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub kind: ResponseKind,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(url: &str, status: u16, kind: ResponseKind, body: Vec<u8>) -> Self {
        Self {
            url: url.to_string(),
            status,
            kind,
            headers: Vec::new(),
            body,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Header lookup, case-insensitive on the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for 2xx statuses
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_minutes()
    }

    /// Short relative age for listings ("just now", "5m ago", "3h ago", "2d ago")
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}
