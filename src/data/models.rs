//! Data models for the warehouse dataset and load diagnostics.

use std::collections::BTreeMap;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde::Serialize;

/// Star-schema tables the dashboard expects, paired with their primary key column
pub const DEFAULT_TABLES: &[(&str, &str)] = &[
    ("fact_sales_order", "sales_record_id"),
    ("dim_staff", "staff_id"),
    ("dim_location", "location_id"),
    ("dim_design", "design_id"),
    ("dim_date", "date_id"),
    ("dim_currency", "currency_id"),
    ("dim_counterparty", "counterparty_id"),
];

/// Names of the default tables, in display order
pub fn default_table_names() -> Vec<String> {
    DEFAULT_TABLES
        .iter()
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Primary key column of a known table, if any
pub fn primary_key_for(table: &str) -> Option<&'static str> {
    DEFAULT_TABLES
        .iter()
        .find(|(name, _)| *name == table)
        .map(|(_, pk)| *pk)
}

/// Logical table name -> object key of the snapshot selected for it
pub type SnapshotMapping = BTreeMap<String, String>;

/// Logical table name -> decoded table
pub type Dataset = BTreeMap<String, Table>;

/// An in-memory table decoded from one snapshot (or read from the warehouse)
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub batch: RecordBatch,
}

impl Table {
    pub fn new(name: impl Into<String>, batch: RecordBatch) -> Self {
        Table {
            name: name.into(),
            batch,
        }
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in stored order
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }
}

/// Why a resolved table did not make it into the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Decode,
}

/// Result of materializing one resolved snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Loaded { rows: usize, columns: usize },
    Failed { kind: FailureKind, message: String },
}

/// Per-table record of a materialization attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOutcome {
    pub table: String,
    pub key: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl TableOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Loaded { .. })
    }
}

/// Load state of a single table as seen by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Loaded,
    Missing,
    Failed,
    /// Not part of the last load at all
    Unknown,
}

/// Diagnostics side-channel for one load.
///
/// The dataset alone cannot tell a table that never existed from one whose
/// fetch failed; this report can.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// Human-readable description of where the data came from
    pub source: String,
    /// The listing under the prefix was empty
    pub no_objects: bool,
    /// Expected tables with no matching key
    pub missing: Vec<String>,
    /// One entry per resolved table, in configured table order
    pub outcomes: Vec<TableOutcome>,
}

impl LoadReport {
    pub fn failures(&self) -> impl Iterator<Item = &TableOutcome> {
        self.outcomes.iter().filter(|o| !o.is_loaded())
    }

    pub fn loaded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_loaded()).count()
    }

    pub fn status_of(&self, table: &str) -> TableStatus {
        if self.missing.iter().any(|t| t == table) {
            return TableStatus::Missing;
        }
        match self.outcomes.iter().find(|o| o.table == table) {
            Some(o) if o.is_loaded() => TableStatus::Loaded,
            Some(_) => TableStatus::Failed,
            None if self.no_objects => TableStatus::Missing,
            None => TableStatus::Unknown,
        }
    }

    /// One-line summary for the status bar
    pub fn summary(&self) -> String {
        if self.no_objects {
            return format!("{}: no objects found", self.source);
        }
        let failed = self.failures().count();
        let mut parts = vec![format!("{} loaded", self.loaded_count())];
        if !self.missing.is_empty() {
            parts.push(format!("{} missing", self.missing.len()));
        }
        if failed > 0 {
            parts.push(format!("{failed} failed"));
        }
        format!("{}: {}", self.source, parts.join(", "))
    }
}

/// A completed load: the dataset plus its diagnostics
#[derive(Debug, Clone, Default)]
pub struct Loaded {
    pub dataset: Dataset,
    pub report: LoadReport,
}
