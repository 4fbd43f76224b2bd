//! Error types for loading the warehouse dataset.

use std::time::Duration;

use thiserror::Error;

use super::models::FailureKind;

/// Errors that abort a whole load
#[derive(Debug, Error)]
pub enum LoadError {
    /// The storage backend could not be listed at all
    #[error("failed to list objects under '{prefix}': {source}")]
    Listing {
        prefix: String,
        #[source]
        source: object_store::Error,
    },

    #[error("listing '{prefix}' timed out after {timeout:?}")]
    ListingTimeout { prefix: String, timeout: Duration },

    #[error("failed to build object store client: {0}")]
    Client(#[source] object_store::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] rusqlite::Error),

    #[error("failed to assemble table: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Errors scoped to a single table; these never abort a load
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to fetch '{key}': {source}")]
    Fetch {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("fetching '{key}' timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    #[error("failed to decode '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },
}

impl TableError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TableError::Fetch { .. } | TableError::Timeout { .. } => FailureKind::Fetch,
            TableError::Decode { .. } => FailureKind::Decode,
        }
    }
}

/// Errors from uploading a snapshot object
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to upload '{key}': {source}")]
    Store {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("uploading '{key}' timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },
}

/// Errors from the Parquet snapshot codec
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
