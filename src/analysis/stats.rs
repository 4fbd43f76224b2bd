//! Descriptive statistics for numeric columns.

use serde::Serialize;

use super::{float_values, AnalysisError};
use crate::data::Table;

/// Count, mean, spread and quartiles of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for a single value
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// Summarize non-null values; `None` when there are none
    pub fn from_values(column: impl Into<String>, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        });

        Some(ColumnSummary {
            column: column.into(),
            count,
            mean,
            std,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// Linear-interpolated quantile of already sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Summaries for every numeric column that has at least one value
pub fn describe(table: &Table) -> Result<Vec<ColumnSummary>, AnalysisError> {
    let schema = table.schema();
    let mut summaries = Vec::new();

    for (field, array) in schema.fields().iter().zip(table.batch.columns()) {
        if !field.data_type().is_numeric() {
            continue;
        }
        let values: Vec<f64> = float_values(array.as_ref())?.into_iter().flatten().collect();
        if let Some(summary) = ColumnSummary::from_values(field.name().clone(), &values) {
            summaries.push(summary);
        }
    }

    Ok(summaries)
}

/// (column name, data type) pairs in column order
pub fn column_types(table: &Table) -> Vec<(String, String)> {
    table
        .schema()
        .fields()
        .iter()
        .map(|f| (f.name().clone(), f.data_type().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    use super::*;

    #[test]
    fn test_summary_values() {
        let s = ColumnSummary::from_values("x", &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.p25, 1.75);
        assert_eq!(s.p50, 2.5);
        assert_eq!(s.p75, 3.25);
        let std = s.std.unwrap();
        assert!((std - 1.2909944).abs() < 1e-6);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let s = ColumnSummary::from_values("x", &[7.0]).unwrap();
        assert_eq!(s.std, None);
        assert_eq!(s.p75, 7.0);
        assert!(ColumnSummary::from_values("x", &[]).is_none());
    }

    #[test]
    fn test_describe_skips_text_and_nulls() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("units_sold", DataType::Int64, true),
            Field::new("unit_price", DataType::Float64, true),
            Field::new("currency_code", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![Some(10), None, Some(30)])),
                Arc::new(Float64Array::from(vec![None::<f64>, None, None])),
                Arc::new(StringArray::from(vec!["GBP", "USD", "EUR"])),
            ],
        )
        .unwrap();
        let table = Table::new("fact_sales_order", batch);

        let summaries = describe(&table).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].column, "units_sold");
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].mean, 20.0);

        let types = column_types(&table);
        assert_eq!(types[0], ("units_sold".to_string(), "Int64".to_string()));
        assert_eq!(types[2].1, "Utf8");
    }
}
