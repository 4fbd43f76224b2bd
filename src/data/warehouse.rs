//! Direct reads from a SQLite warehouse.
//!
//! Column types are inferred from the stored values (SQLite is dynamically
//! typed), falling back to the declared column type for empty columns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, Float64Array, Int64Array, NullArray, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};

use super::error::LoadError;
use super::models::{
    Dataset, FailureKind, LoadReport, Loaded, OutcomeStatus, Table, TableOutcome,
};

/// Read-only handle on a SQLite warehouse file
pub struct Warehouse {
    conn: Connection,
    path: PathBuf,
}

impl Warehouse {
    /// Open an existing warehouse read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Warehouse { conn, path })
    }

    /// Names of all user tables, sorted
    pub fn table_names(&self) -> Result<Vec<String>, LoadError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Read a whole table in rowid order
    pub fn read_table(&self, table: &str) -> Result<Table, LoadError> {
        let sql = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
        let mut stmt = self.conn.prepare(&sql)?;

        let columns: Vec<(String, Option<String>)> = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
            .collect();

        let mut values: Vec<Vec<Value>> = vec![Vec::new(); columns.len()];
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (idx, column) in values.iter_mut().enumerate() {
                column.push(row.get::<_, Value>(idx)?);
            }
        }
        let num_rows = values.first().map(Vec::len).unwrap_or(0);

        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());
        for ((name, decl_type), column) in columns.into_iter().zip(values) {
            let array = column_to_array(column, decl_type.as_deref());
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }

        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;

        Ok(Table::new(table, batch))
    }

    /// Read the expected tables into a dataset, with the same diagnostics a
    /// snapshot load produces
    pub fn load(&self, tables: &[String]) -> Result<Loaded, LoadError> {
        let existing = self.table_names()?;
        let mut report = LoadReport {
            source: format!("sqlite:{}", self.path.display()),
            no_objects: existing.is_empty(),
            ..Default::default()
        };
        let mut dataset = Dataset::new();

        for table in tables {
            if !existing.contains(table) {
                tracing::error!(table = %table, "table not found in warehouse");
                report.missing.push(table.clone());
                continue;
            }

            let status = match self.read_table(table) {
                Ok(loaded) => {
                    let status = OutcomeStatus::Loaded {
                        rows: loaded.num_rows(),
                        columns: loaded.num_columns(),
                    };
                    dataset.insert(table.clone(), loaded);
                    status
                }
                Err(e) => {
                    tracing::error!(table = %table, error = %e, "failed to read warehouse table");
                    OutcomeStatus::Failed {
                        kind: FailureKind::Decode,
                        message: e.to_string(),
                    }
                }
            };
            report.outcomes.push(TableOutcome {
                table: table.clone(),
                key: table.clone(),
                status,
            });
        }

        tracing::info!("{}", report.summary());
        Ok(Loaded { dataset, report })
    }
}

/// Column type inferred from the non-null values present
fn infer_type(values: &[Value], decl_type: Option<&str>) -> DataType {
    let mut inferred: Option<DataType> = None;
    for value in values {
        let value_type = match value {
            Value::Null => continue,
            Value::Integer(_) => DataType::Int64,
            Value::Real(_) => DataType::Float64,
            Value::Text(_) => DataType::Utf8,
            Value::Blob(_) => DataType::Binary,
        };
        inferred = Some(match (inferred, value_type) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64), DataType::Float64)
            | (Some(DataType::Float64), DataType::Int64) => DataType::Float64,
            _ => DataType::Utf8,
        });
    }

    inferred.unwrap_or_else(|| declared_type(decl_type))
}

/// Arrow type for a declared SQLite column type, following SQLite affinity rules
fn declared_type(decl_type: Option<&str>) -> DataType {
    let Some(decl) = decl_type.map(str::to_ascii_uppercase) else {
        return DataType::Null;
    };
    if decl.contains("INT") {
        DataType::Int64
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        DataType::Utf8
    } else if decl.contains("BLOB") {
        DataType::Binary
    } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

fn column_to_array(values: Vec<Value>, decl_type: Option<&str>) -> ArrayRef {
    match infer_type(&values, decl_type) {
        DataType::Int64 => Arc::new(
            values
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(i),
                    _ => None,
                })
                .collect::<Int64Array>(),
        ),
        DataType::Float64 => Arc::new(
            values
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(i as f64),
                    Value::Real(f) => Some(f),
                    _ => None,
                })
                .collect::<Float64Array>(),
        ),
        DataType::Binary => {
            let blobs: Vec<Option<Vec<u8>>> = values
                .into_iter()
                .map(|v| match v {
                    Value::Blob(b) => Some(b),
                    _ => None,
                })
                .collect();
            Arc::new(BinaryArray::from_iter(blobs))
        }
        DataType::Null => Arc::new(NullArray::new(values.len())),
        _ => Arc::new(
            values
                .into_iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::Integer(i) => Some(i.to_string()),
                    Value::Real(f) => Some(f.to_string()),
                    Value::Text(s) => Some(s),
                    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
                })
                .collect::<StringArray>(),
        ),
    }
}
