use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{CachedResponse, OfflineError, Request, ResponseKind};

/// Routes and assets pre-cached on install: home, both levels, the gallery
/// and the Zhuyin font.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/level1",
    "/level2",
    "/gallery",
    "/fonts/王漢宗中明體注音.ttf",
];

/// Path segments whose assets are cached on first fetch
const DYNAMIC_PATH_SEGMENTS: &[&str] = &["/images/", "/items/", "/fonts/"];

/// File extensions whose assets are cached on first fetch
const DYNAMIC_EXTENSIONS: &[&str] = &[".css", ".js"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    paths: Vec<String>,
}

impl Manifest {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolve every manifest path against `origin`
    pub fn requests(&self, origin: &Url) -> Result<Vec<Request>, OfflineError> {
        self.paths
            .iter()
            .map(|path| Request::for_path(origin, path))
            .collect()
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST.iter().copied())
    }
}

/// Whether a fetched asset should be written into the current bucket.
/// Matches on the URL path only, so query strings never affect the decision.
pub fn should_cache_dynamically(url: &Url) -> bool {
    let path = url.path();
    DYNAMIC_PATH_SEGMENTS.iter().any(|seg| path.contains(seg))
        || DYNAMIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Only plain same-origin 200 responses are stored; errors, redirects and
/// cross-origin responses pass through uncached.
pub fn is_cacheable_response(response: &CachedResponse) -> bool {
    response.status == 200 && response.kind == ResponseKind::Basic
}
