//! Command-line interface argument parsing for warehouse-tui.
//!
//! - `warehouse-tui show --bucket my-bucket` browses the latest snapshots
//! - `warehouse-tui show --warehouse warehouse.db` reads the warehouse directly
//! - `warehouse-tui resolve --local-dir ./bucket` prints the load report as JSON
//! - `warehouse-tui publish --warehouse warehouse.db --bucket my-bucket`
//!
//! This is the only place the environment is consulted; everything below it
//! receives explicit configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::data::{
    default_table_names, Credentials, DataSource, LoaderConfig, MatchMode, SnapshotLoader,
    StorageLocation, DEFAULT_PREFIX,
};

/// A terminal dashboard over a star-schema sales warehouse.
#[derive(Parser, Debug)]
#[command(name = "warehouse-tui")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the TUI dashboard
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// External BI dashboard to link from the UI
        #[arg(long, env = "BI_DASHBOARD_URL")]
        dashboard_url: Option<String>,

        /// Log file (the terminal belongs to the UI)
        /// Defaults to <cache dir>/warehouse-tui/warehouse-tui.log
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Load once and print the resolved snapshots and diagnostics as JSON
    Resolve {
        #[command(flatten)]
        source: SourceArgs,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export warehouse tables as dated Parquet snapshots
    Publish {
        #[command(flatten)]
        source: SourceArgs,

        /// Snapshot date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

/// Where to read (or, for `publish`, write) tables
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// S3 bucket holding Parquet snapshots
    #[arg(long, env = "DATA_BUCKET_NAME")]
    pub bucket: Option<String>,

    /// Local directory laid out like a bucket (takes precedence over --bucket)
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// SQLite warehouse file; `show` and `resolve` read it directly
    #[arg(long)]
    pub warehouse: Option<PathBuf>,

    /// Key prefix of the snapshot files
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Comma-separated table names; defaults to the star-schema tables
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// How table names match object keys: "bounded" or "substring"
    #[arg(long, default_value = "bounded")]
    pub match_mode: MatchMode,

    #[arg(long, env = "AWS_DEFAULT_REGION")]
    pub region: Option<String>,

    /// Custom S3 endpoint, e.g. a local MinIO
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Timeout in seconds for each storage call
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

impl SourceArgs {
    /// Requested tables, or the default star schema
    pub fn table_names(&self) -> Vec<String> {
        let tables: Vec<String> = self
            .tables
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tables.is_empty() {
            default_table_names()
        } else {
            tables
        }
    }

    /// Object storage configuration (local directory or S3 bucket)
    pub fn loader_config(&self) -> Result<LoaderConfig> {
        let base = if let Some(dir) = &self.local_dir {
            LoaderConfig::local(dir, self.prefix.as_str())
        } else if let Some(bucket) = &self.bucket {
            let mut config = LoaderConfig::s3(bucket.as_str(), self.prefix.as_str());
            config.location = StorageLocation::S3 {
                bucket: bucket.clone(),
                region: self.region.clone(),
                endpoint: self.endpoint.clone(),
            };
            config.credentials = match (&self.access_key_id, &self.secret_access_key) {
                (Some(id), Some(secret)) => Some(Credentials {
                    access_key_id: id.clone(),
                    secret_access_key: secret.clone(),
                }),
                _ => None,
            };
            config
        } else {
            anyhow::bail!(
                "No snapshot location given; pass --bucket (or set DATA_BUCKET_NAME) or --local-dir"
            );
        };

        Ok(base
            .with_tables(self.table_names())
            .with_match_mode(self.match_mode)
            .with_fetch_timeout(Duration::from_secs(self.timeout)))
    }

    /// Source for reading: the warehouse when given, snapshots otherwise
    pub fn source_config(&self) -> Result<SourceConfig> {
        if let Some(path) = &self.warehouse {
            return Ok(SourceConfig::Warehouse {
                path: path.clone(),
                tables: self.table_names(),
            });
        }
        Ok(SourceConfig::Snapshots(self.loader_config()?))
    }
}

/// Configured data source, not yet connected
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Snapshots(LoaderConfig),
    Warehouse { path: PathBuf, tables: Vec<String> },
}

impl SourceConfig {
    pub fn connect(&self) -> Result<DataSource> {
        match self {
            SourceConfig::Snapshots(config) => {
                let loader = SnapshotLoader::connect(config.clone())
                    .context("Failed to connect to snapshot storage")?;
                Ok(DataSource::Snapshots(loader))
            }
            SourceConfig::Warehouse { path, tables } => {
                if !path.exists() {
                    anyhow::bail!("Warehouse not found: {path:?}");
                }
                Ok(DataSource::Warehouse {
                    path: path.clone(),
                    tables: tables.clone(),
                })
            }
        }
    }
}

/// Configuration for the dashboard
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub dashboard_url: Option<String>,
    pub log_file: PathBuf,
}

impl AppConfig {
    /// Create AppConfig from the `show` command's arguments
    pub fn from_show_command(
        source: SourceArgs,
        dashboard_url: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Result<Self> {
        let log_file = log_file.unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("warehouse-tui")
                .join("warehouse-tui.log")
        });

        Ok(AppConfig {
            source: source.source_config()?,
            dashboard_url: dashboard_url.filter(|u| !u.trim().is_empty()),
            log_file,
        })
    }
}
