//! Explicit loader configuration.
//!
//! Nothing in the data layer reads the environment; the CLI builds one of
//! these and hands it over.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::models::default_table_names;
use super::resolver::MatchMode;

/// Prefix the snapshot publisher writes under by default
pub const DEFAULT_PREFIX: &str = "db/parquet_files";

/// Default per-call timeout for listing and fetching
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where snapshot objects are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
    },
    /// A directory laid out like a bucket
    Local(PathBuf),
}

/// Static credentials for the object store
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Everything the snapshot loader needs to run
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub location: StorageLocation,
    pub prefix: String,
    /// Expected logical tables, in display order
    pub tables: Vec<String>,
    /// `None` leaves credential discovery to the store's defaults
    pub credentials: Option<Credentials>,
    pub match_mode: MatchMode,
    pub fetch_timeout: Duration,
}

impl LoaderConfig {
    /// S3 configuration with the default tables and settings
    pub fn s3(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        LoaderConfig {
            location: StorageLocation::S3 {
                bucket: bucket.into(),
                region: None,
                endpoint: None,
            },
            prefix: normalize_prefix(&prefix.into()),
            tables: default_table_names(),
            credentials: None,
            match_mode: MatchMode::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Local directory configuration with the default tables and settings
    pub fn local(dir: impl AsRef<Path>, prefix: impl Into<String>) -> Self {
        LoaderConfig {
            location: StorageLocation::Local(dir.as_ref().to_path_buf()),
            ..Self::s3(String::new(), prefix)
        }
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Strip surrounding slashes so `db/files/` and `/db/files` list the same keys
pub fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_matches('/').to_string()
}
