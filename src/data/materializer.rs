//! Turns a snapshot mapping into a dataset.

use super::codec::decode_parquet;
use super::error::TableError;
use super::models::{Dataset, OutcomeStatus, SnapshotMapping, Table, TableOutcome};
use super::source::SnapshotSource;

/// Fetch and decode one snapshot
fn load_table(source: &dyn SnapshotSource, table: &str, key: &str) -> Result<Table, TableError> {
    let bytes = source.fetch(key)?;
    let batch = decode_parquet(bytes).map_err(|source| TableError::Decode {
        key: key.to_string(),
        source,
    })?;
    Ok(Table::new(table, batch))
}

/// Fetch and decode every snapshot in `mapping`.
///
/// A failing table is left out of the dataset and recorded in the returned
/// outcomes; it never stops the remaining tables. Outcomes follow the order of
/// `order`, with any tables not named there appended by name.
pub fn materialize(
    source: &dyn SnapshotSource,
    mapping: &SnapshotMapping,
    order: &[String],
) -> (Dataset, Vec<TableOutcome>) {
    let mut entries: Vec<(&String, &String)> = mapping.iter().collect();
    entries.sort_by_key(|(table, _)| {
        order
            .iter()
            .position(|t| t == *table)
            .unwrap_or(usize::MAX)
    });

    let mut dataset = Dataset::new();
    let mut outcomes = Vec::with_capacity(entries.len());

    for (table, key) in entries {
        let status = match load_table(source, table, key) {
            Ok(loaded) => {
                let status = OutcomeStatus::Loaded {
                    rows: loaded.num_rows(),
                    columns: loaded.num_columns(),
                };
                tracing::info!(
                    table = %table,
                    key = %key,
                    rows = loaded.num_rows(),
                    "loaded snapshot"
                );
                dataset.insert(table.clone(), loaded);
                status
            }
            Err(e) => {
                tracing::error!(table = %table, key = %key, error = %e, "failed to load snapshot");
                OutcomeStatus::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };

        outcomes.push(TableOutcome {
            table: table.clone(),
            key: key.clone(),
            status,
        });
    }

    (dataset, outcomes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use bytes::Bytes;

    use super::*;
    use crate::data::codec::encode_parquet;
    use crate::data::error::LoadError;
    use crate::data::models::FailureKind;

    /// In-memory source that can be told to fail specific keys
    struct FakeSource {
        objects: HashMap<String, Bytes>,
    }

    impl SnapshotSource for FakeSource {
        fn describe(&self) -> String {
            "fake".to_string()
        }

        fn list(&self, _prefix: &str) -> Result<Vec<String>, LoadError> {
            Ok(self.objects.keys().cloned().collect())
        }

        fn fetch(&self, key: &str) -> Result<Bytes, TableError> {
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| TableError::Fetch {
                    key: key.to_string(),
                    source: object_store::Error::NotFound {
                        path: key.to_string(),
                        source: "no such object".into(),
                    },
                })
        }
    }

    fn snapshot(ids: &[i64], names: &[&str]) -> Bytes {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids.to_vec())),
                Arc::new(StringArray::from(names.to_vec())),
            ],
        )
        .unwrap();
        encode_parquet(&batch).unwrap()
    }

    fn fixture() -> (FakeSource, SnapshotMapping, Vec<String>) {
        let mut objects = HashMap::new();
        objects.insert("p/dim_staff.parquet".to_string(), snapshot(&[2, 1], &["b", "a"]));
        objects.insert("p/dim_design.parquet".to_string(), snapshot(&[7], &["mug"]));
        objects.insert(
            "p/dim_date.parquet".to_string(),
            Bytes::from_static(b"corrupt"),
        );

        let mut mapping = SnapshotMapping::new();
        mapping.insert("dim_staff".to_string(), "p/dim_staff.parquet".to_string());
        mapping.insert("dim_design".to_string(), "p/dim_design.parquet".to_string());
        mapping.insert("dim_date".to_string(), "p/dim_date.parquet".to_string());
        mapping.insert("dim_currency".to_string(), "p/gone.parquet".to_string());

        let order = ["dim_staff", "dim_currency", "dim_design", "dim_date"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        (FakeSource { objects }, mapping, order)
    }

    #[test]
    fn test_failures_are_isolated_per_table() {
        let (source, mapping, order) = fixture();
        let (dataset, outcomes) = materialize(&source, &mapping, &order);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset["dim_staff"].num_rows(), 2);
        assert_eq!(dataset["dim_design"].num_rows(), 1);
        assert!(!dataset.contains_key("dim_currency"));
        assert!(!dataset.contains_key("dim_date"));

        let tables: Vec<&str> = outcomes.iter().map(|o| o.table.as_str()).collect();
        assert_eq!(tables, vec!["dim_staff", "dim_currency", "dim_design", "dim_date"]);

        let currency = &outcomes[1];
        assert!(matches!(
            currency.status,
            OutcomeStatus::Failed {
                kind: FailureKind::Fetch,
                ..
            }
        ));
        let date = &outcomes[3];
        assert!(matches!(
            date.status,
            OutcomeStatus::Failed {
                kind: FailureKind::Decode,
                ..
            }
        ));
    }

    #[test]
    fn test_preserves_row_order() {
        let (source, mapping, order) = fixture();
        let (dataset, _) = materialize(&source, &mapping, &order);

        let ids = dataset["dim_staff"]
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(ids.values(), &[2, 1]);
    }

    #[test]
    fn test_materialize_is_deterministic() {
        let (source, mapping, order) = fixture();
        let (first, first_outcomes) = materialize(&source, &mapping, &order);
        let (second, second_outcomes) = materialize(&source, &mapping, &order);

        assert_eq!(first, second);
        assert_eq!(first_outcomes, second_outcomes);
    }

    #[test]
    fn test_tables_outside_order_are_appended() {
        let (source, mapping, _) = fixture();
        let order = vec!["dim_design".to_string()];
        let (_, outcomes) = materialize(&source, &mapping, &order);

        let tables: Vec<&str> = outcomes.iter().map(|o| o.table.as_str()).collect();
        assert_eq!(tables, vec!["dim_design", "dim_currency", "dim_date", "dim_staff"]);
    }
}
