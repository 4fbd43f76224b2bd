//! Analyses over loaded tables: null checks and handling, descriptive
//! statistics, and the fixed sales aggregations.

mod nulls;
mod sales;
mod stats;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::error::ArrowError;
use arrow::util::display::array_value_to_string;
use thiserror::Error;

use crate::data::Table;

pub use nulls::{handle_nulls, has_nulls, null_counts, NullStrategy};
pub use sales::{run_analysis, SalesAnalysis, SalesSummary};
pub use stats::{column_types, describe, ColumnSummary};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("table '{0}' is not loaded")]
    MissingTable(String),

    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// Look up a column by name
fn column<'a>(table: &'a Table, name: &str) -> Result<&'a ArrayRef, AnalysisError> {
    table
        .batch
        .column_by_name(name)
        .ok_or_else(|| AnalysisError::MissingColumn {
            table: table.name.clone(),
            column: name.to_string(),
        })
}

/// Values of a numeric column as f64, nulls preserved
pub(crate) fn float_values(array: &dyn Array) -> Result<Vec<Option<f64>>, ArrowError> {
    let floats = cast(array, &DataType::Float64)?;
    Ok(floats.as_primitive::<Float64Type>().iter().collect())
}

/// Join key form of every value, nulls preserved.
///
/// Numeric keys compare by value: an Int32 id matches an Int64 id, and a
/// Float64 `1.0` (a nullable integer column written by pandas) matches `1`.
/// Other types compare by their display form.
pub(crate) fn join_keys(array: &dyn Array) -> Result<Vec<Option<String>>, ArrowError> {
    let data_type = array.data_type();
    if data_type.is_integer() {
        let ints = cast(array, &DataType::Int64)?;
        Ok(ints
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map(|v| v.to_string()))
            .collect())
    } else if data_type.is_floating() || matches!(data_type, DataType::Decimal128(..)) {
        Ok(float_values(array)?
            .into_iter()
            .map(|v| v.map(float_key))
            .collect())
    } else {
        string_values(array)
    }
}

/// Integral floats use the integer spelling so they meet integer keys
fn float_key(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Display form of every value, nulls preserved
pub(crate) fn string_values(array: &dyn Array) -> Result<Vec<Option<String>>, ArrowError> {
    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                Ok(None)
            } else {
                array_value_to_string(array, i).map(Some)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use arrow::array::{Float64Array, Int32Array, StringArray};

    use super::*;

    #[test]
    fn test_join_keys_compare_numbers_by_value() {
        let ints = Int32Array::from(vec![Some(1), None, Some(12)]);
        let floats = Float64Array::from(vec![Some(1.0), None, Some(12.0), Some(2.5)]);

        assert_eq!(
            join_keys(&ints).unwrap(),
            vec![Some("1".to_string()), None, Some("12".to_string())]
        );
        assert_eq!(
            join_keys(&floats).unwrap(),
            vec![
                Some("1".to_string()),
                None,
                Some("12".to_string()),
                Some("2.5".to_string())
            ]
        );
    }

    #[test]
    fn test_join_keys_text_unchanged() {
        let codes = StringArray::from(vec![Some("GBP"), None]);
        assert_eq!(
            join_keys(&codes).unwrap(),
            vec![Some("GBP".to_string()), None]
        );
    }
}
