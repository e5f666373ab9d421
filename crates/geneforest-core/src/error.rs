use std::path::PathBuf;

use thiserror::Error;

/// Core error type for GeneForest.
#[derive(Debug, Error)]
pub enum GeneForestError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GeneForestError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }
}

/// Failures surfaced by the result cache.
///
/// Unreadable records during a search scan and missing identifiers during
/// retrieval are tolerated in place (skipped with a debug log) rather than
/// reported, so only write-side failures appear here. Cache errors are never
/// fatal to an analysis run; callers log them and continue uncached.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache root {path} is not writable: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cache record: {0}")]
    InvalidRecord(&'static str),
}

impl CacheError {
    pub fn storage_unavailable(path: PathBuf, source: std::io::Error) -> Self {
        Self::StorageUnavailable { path, source }
    }
}
