//! Object storage access for snapshot listing and retrieval.
//!
//! The dashboard is synchronous; the object store client is not. Each
//! `ObjectStoreSource` owns a current-thread tokio runtime and blocks on every
//! call, with a per-call timeout.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore, PutPayload};
use tokio::runtime::Runtime;

use super::config::{LoaderConfig, StorageLocation};
use super::error::{LoadError, TableError, UploadError};

/// Listing and fetching of snapshot objects.
///
/// This is the seam between the loader and the transport; tests substitute
/// in-memory or failing implementations.
pub trait SnapshotSource {
    /// Where the snapshots live, for display and diagnostics
    fn describe(&self) -> String;

    /// Every key under `prefix`. A failure here is fatal for the load.
    fn list(&self, prefix: &str) -> Result<Vec<String>, LoadError>;

    /// Raw bytes of one object
    fn fetch(&self, key: &str) -> Result<Bytes, TableError>;
}

/// Object path for a key as returned by `list`.
///
/// Listed keys are already in their encoded form, so they are parsed rather
/// than encoded a second time.
fn key_path(key: &str) -> Result<Path, object_store::Error> {
    Ok(Path::parse(key)?)
}

/// `SnapshotSource` backed by any `object_store` implementation
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    runtime: Runtime,
    timeout: Duration,
    label: String,
}

impl std::fmt::Debug for ObjectStoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreSource")
            .field("label", &self.label)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ObjectStoreSource {
    /// Wrap an existing store
    pub fn new(
        store: Arc<dyn ObjectStore>,
        label: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LoadError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LoadError::Runtime)?;

        Ok(ObjectStoreSource {
            store,
            runtime,
            timeout,
            label: label.into(),
        })
    }

    /// Build the store described by the loader configuration
    pub fn from_config(config: &LoaderConfig) -> Result<Self, LoadError> {
        match &config.location {
            StorageLocation::S3 {
                bucket,
                region,
                endpoint,
            } => {
                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_client_options(ClientOptions::new().with_timeout(config.fetch_timeout));

                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let Some(credentials) = &config.credentials {
                    builder = builder
                        .with_access_key_id(&credentials.access_key_id)
                        .with_secret_access_key(&credentials.secret_access_key);
                }

                let store = builder.build().map_err(LoadError::Client)?;
                Self::new(
                    Arc::new(store),
                    format!("s3://{bucket}/{}", config.prefix),
                    config.fetch_timeout,
                )
            }
            StorageLocation::Local(dir) => {
                let store = LocalFileSystem::new_with_prefix(dir).map_err(LoadError::Client)?;
                Self::new(
                    Arc::new(store),
                    format!("{}/{}", dir.display(), config.prefix),
                    config.fetch_timeout,
                )
            }
        }
    }

    /// Upload one object, used when publishing snapshots
    pub fn put(&self, key: &str, bytes: Bytes) -> Result<(), UploadError> {
        let store = Arc::clone(&self.store);
        let result = self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, async {
                store.put(&key_path(key)?, PutPayload::from(bytes)).await
            })
            .await
        });

        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(source)) => Err(UploadError::Store {
                key: key.to_string(),
                source,
            }),
            Err(_) => Err(UploadError::Timeout {
                key: key.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

impl SnapshotSource for ObjectStoreSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, LoadError> {
        let prefix_path = Path::from(prefix);
        let prefix_ref = if prefix_path.as_ref().is_empty() {
            None
        } else {
            Some(&prefix_path)
        };

        let store = Arc::clone(&self.store);
        let result = self.runtime.block_on(async {
            tokio::time::timeout(
                self.timeout,
                store
                    .list(prefix_ref)
                    .map_ok(|meta| meta.location.to_string())
                    .try_collect::<Vec<_>>(),
            )
            .await
        });

        match result {
            Ok(Ok(keys)) => {
                tracing::debug!(prefix = %prefix, count = keys.len(), "listed objects");
                Ok(keys)
            }
            Ok(Err(source)) => Err(LoadError::Listing {
                prefix: prefix.to_string(),
                source,
            }),
            Err(_) => Err(LoadError::ListingTimeout {
                prefix: prefix.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    fn fetch(&self, key: &str) -> Result<Bytes, TableError> {
        let store = Arc::clone(&self.store);
        let result = self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, async {
                store.get(&key_path(key)?).await?.bytes().await
            })
            .await
        });

        match result {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(source)) => Err(TableError::Fetch {
                key: key.to_string(),
                source,
            }),
            Err(_) => Err(TableError::Timeout {
                key: key.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}
