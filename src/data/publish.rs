//! Export warehouse tables as dated Parquet snapshots.

use chrono::NaiveDate;
use serde::Serialize;

use super::codec::encode_parquet;
use super::source::ObjectStoreSource;
use super::warehouse::Warehouse;

/// Object key for a table snapshot taken on `date`: `<prefix>/YYYY/MM/DD/<table>.parquet`
pub fn snapshot_key(prefix: &str, date: NaiveDate, table: &str) -> String {
    let dated = format!("{}/{table}.parquet", date.format("%Y/%m/%d"));
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        dated
    } else {
        format!("{prefix}/{dated}")
    }
}

/// What a publish run wrote and what it could not
#[derive(Debug, Default, Serialize)]
pub struct PublishReport {
    pub written: Vec<String>,
    /// (table, error message)
    pub failed: Vec<(String, String)>,
}

/// Encode each table and upload it under today's (or the given) date.
///
/// A table that cannot be read, encoded or uploaded is logged and skipped.
pub fn publish(
    warehouse: &Warehouse,
    sink: &ObjectStoreSource,
    prefix: &str,
    tables: &[String],
    date: NaiveDate,
) -> PublishReport {
    let mut report = PublishReport::default();

    for table in tables {
        let key = snapshot_key(prefix, date, table);
        let result = warehouse
            .read_table(table)
            .map_err(|e| e.to_string())
            .and_then(|t| encode_parquet(&t.batch).map_err(|e| e.to_string()))
            .and_then(|bytes| sink.put(&key, bytes).map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                tracing::info!(table = %table, key = %key, "published snapshot");
                report.written.push(key);
            }
            Err(message) => {
                tracing::error!(table = %table, error = %message, "failed to publish snapshot");
                report.failed.push((table.clone(), message));
            }
        }
    }

    report
}
