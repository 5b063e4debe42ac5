#[derive(Debug, thiserror::Error)]
pub enum RegionPingError {
    #[error("Could not load regions from {url}: {reason}")]
    DirectoryUnavailable { url: String, reason: String },

    #[error("Endpoint directory contained no regions")]
    EmptyDirectory,

    #[error("No regions loaded")]
    NoRegions,

    #[error("Unknown region {key}")]
    UnknownRegion { key: crate::RegionKey },

    #[error("A probe run is already in progress")]
    AlreadyRunning,

    #[error("Probe timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout error: {0}")]
    TimeoutError(#[from] tokio::time::error::Elapsed),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RegionPingError {
    fn from(err: serde_json::Error) -> Self {
        RegionPingError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RegionPingError>;
