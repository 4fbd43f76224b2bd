//! Non-interactive commands: `resolve` and `publish`.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::SourceArgs;
use crate::data::{publish, DataSource, LoadReport, ObjectStoreSource, StorageLocation, Warehouse};

/// JSON document written by `resolve`
#[derive(Serialize)]
struct ResolveOutput<'a> {
    /// Every key under the prefix (or every table in the warehouse)
    keys: Vec<String>,
    report: &'a LoadReport,
}

/// Load once and emit the listing and load report as JSON.
///
/// The report is built from the same listing that is printed.
pub fn resolve(source: &SourceArgs, output: Option<&Path>) -> Result<()> {
    let data_source = source.source_config()?.connect()?;

    let (keys, loaded) = match &data_source {
        DataSource::Snapshots(loader) => {
            let keys = loader.list_keys().context("Failed to list snapshots")?;
            let loaded = loader.load_listed(&keys);
            (keys, loaded)
        }
        DataSource::Warehouse { path, tables } => {
            let warehouse = Warehouse::open(path).context("Failed to open warehouse")?;
            let keys = warehouse
                .table_names()
                .context("Failed to read warehouse tables")?;
            let loaded = warehouse.load(tables).context("Failed to load dataset")?;
            (keys, loaded)
        }
    };

    let json = serde_json::to_string_pretty(&ResolveOutput {
        keys,
        report: &loaded.report,
    })?;

    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write report: {path:?}"))?,
        None => writeln!(std::io::stdout(), "{json}")?,
    }
    Ok(())
}

/// Export the warehouse tables to the configured snapshot location
pub fn publish_snapshots(source: &SourceArgs, date: Option<NaiveDate>) -> Result<()> {
    let Some(warehouse_path) = &source.warehouse else {
        anyhow::bail!("publish needs --warehouse");
    };
    let warehouse = Warehouse::open(warehouse_path)
        .with_context(|| format!("Failed to open warehouse: {warehouse_path:?}"))?;

    let config = source.loader_config()?;
    if let StorageLocation::Local(dir) = &config.location {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {dir:?}"))?;
    }
    let sink = ObjectStoreSource::from_config(&config)
        .context("Failed to connect to snapshot storage")?;

    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let report = publish(&warehouse, &sink, &config.prefix, &config.tables, date);

    writeln!(std::io::stdout(), "{}", serde_json::to_string_pretty(&report)?)?;

    if !report.failed.is_empty() {
        anyhow::bail!("{} of {} tables failed to publish", report.failed.len(), config.tables.len());
    }
    Ok(())
}
