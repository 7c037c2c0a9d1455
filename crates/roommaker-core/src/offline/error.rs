use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to reach {0}")]
    Unreachable(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode cache index: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cache bucket '{bucket}' is missing body file {file}")]
    MissingBody { bucket: String, file: String },
}

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Failed to pre-cache {url}: {source}")]
    InstallFetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("Failed to pre-cache {url}: status {status}")]
    InstallStatus { url: String, status: u16 },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid asset path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}
