//! Data layer: snapshot resolution and loading, the SQLite warehouse, and
//! snapshot publishing.
//!
//! A load lists the configured prefix, picks the latest snapshot per table,
//! and decodes each into an Arrow-backed `Table`. Per-table problems are
//! reported in a `LoadReport` rather than failing the load.

mod codec;
mod config;
mod error;
mod loader;
mod materializer;
mod models;
mod publish;
mod resolver;
mod source;
mod warehouse;

pub use config::{Credentials, LoaderConfig, StorageLocation, DEFAULT_PREFIX};
pub use error::LoadError;
pub use loader::{DataSource, SnapshotLoader};
pub use models::{
    default_table_names, primary_key_for, Dataset, LoadReport, Loaded, Table, TableStatus,
};
pub use publish::publish;
pub use resolver::MatchMode;
pub use source::ObjectStoreSource;
pub use warehouse::Warehouse;
