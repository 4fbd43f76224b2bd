//! Full load pipeline: list, resolve, materialize.

use std::path::PathBuf;

use super::config::LoaderConfig;
use super::error::LoadError;
use super::materializer::materialize;
use super::models::{LoadReport, Loaded};
use super::resolver::resolve_snapshots;
use super::source::{ObjectStoreSource, SnapshotSource};
use super::warehouse::Warehouse;

/// Loads the dataset from snapshot files in object storage
pub struct SnapshotLoader {
    config: LoaderConfig,
    source: Box<dyn SnapshotSource>,
}

impl SnapshotLoader {
    /// Connect to the store named in `config`
    pub fn connect(config: LoaderConfig) -> Result<Self, LoadError> {
        let source = ObjectStoreSource::from_config(&config)?;
        Ok(Self::with_source(config, Box::new(source)))
    }

    /// Use an already-built source
    pub fn with_source(config: LoaderConfig, source: Box<dyn SnapshotSource>) -> Self {
        SnapshotLoader { config, source }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Every key under the configured prefix
    pub fn list_keys(&self) -> Result<Vec<String>, LoadError> {
        self.source.list(&self.config.prefix)
    }

    /// Recompute the snapshot mapping and dataset from scratch.
    ///
    /// Only a listing failure is returned as an error; everything scoped to a
    /// single table ends up in the report.
    pub fn load(&self) -> Result<Loaded, LoadError> {
        let keys = self.list_keys()?;
        Ok(self.load_listed(&keys))
    }

    /// Resolve and materialize from a listing the caller already holds
    pub fn load_listed(&self, keys: &[String]) -> Loaded {
        let resolution = resolve_snapshots(keys, &self.config.tables, self.config.match_mode);
        let (dataset, outcomes) =
            materialize(self.source.as_ref(), &resolution.mapping, &self.config.tables);

        let report = LoadReport {
            source: self.describe(),
            no_objects: resolution.no_objects,
            missing: resolution.missing,
            outcomes,
        };
        tracing::info!("{}", report.summary());

        Loaded { dataset, report }
    }
}

/// Where the dashboard gets its tables from
pub enum DataSource {
    Snapshots(SnapshotLoader),
    Warehouse {
        path: PathBuf,
        tables: Vec<String>,
    },
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Snapshots(loader) => loader.describe(),
            DataSource::Warehouse { path, .. } => format!("sqlite:{}", path.display()),
        }
    }

    /// Expected tables in display order
    pub fn tables(&self) -> &[String] {
        match self {
            DataSource::Snapshots(loader) => &loader.config().tables,
            DataSource::Warehouse { tables, .. } => tables,
        }
    }

    pub fn load(&self) -> Result<Loaded, LoadError> {
        match self {
            DataSource::Snapshots(loader) => loader.load(),
            DataSource::Warehouse { path, tables } => Warehouse::open(path)?.load(tables),
        }
    }
}
