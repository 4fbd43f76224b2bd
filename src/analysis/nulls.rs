//! Null counting and null handling strategies.

use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, Scalar, StringArray,
};
use arrow::compute::kernels::zip::zip;
use arrow::compute::{cast, filter_record_batch, is_null};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use super::{float_values, AnalysisError};
use crate::data::Table;

/// What to do with null values in a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullStrategy {
    DropRows,
    DropColumns,
    FillZero,
    FillMean,
    #[default]
    Keep,
}

impl NullStrategy {
    pub const ALL: [NullStrategy; 5] = [
        NullStrategy::DropRows,
        NullStrategy::DropColumns,
        NullStrategy::FillZero,
        NullStrategy::FillMean,
        NullStrategy::Keep,
    ];

    /// Next strategy in menu order, wrapping around
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for NullStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NullStrategy::DropRows => "Drop rows",
            NullStrategy::DropColumns => "Drop columns",
            NullStrategy::FillZero => "Fill with 0",
            NullStrategy::FillMean => "Fill with mean",
            NullStrategy::Keep => "Do nothing",
        };
        write!(f, "{label}")
    }
}

/// Logical null count; NullArray columns count every row
fn logical_null_count(array: &dyn Array) -> usize {
    array
        .logical_nulls()
        .map(|nulls| nulls.null_count())
        .unwrap_or(0)
}

/// Null count per column, in column order
pub fn null_counts(table: &Table) -> Vec<(String, usize)> {
    table
        .schema()
        .fields()
        .iter()
        .zip(table.batch.columns())
        .map(|(field, array)| (field.name().clone(), logical_null_count(array.as_ref())))
        .collect()
}

pub fn has_nulls(table: &Table) -> bool {
    table
        .batch
        .columns()
        .iter()
        .any(|c| logical_null_count(c.as_ref()) > 0)
}

/// Apply `strategy`, returning a new table
pub fn handle_nulls(table: &Table, strategy: NullStrategy) -> Result<Table, AnalysisError> {
    let batch = &table.batch;
    let cleaned = match strategy {
        NullStrategy::Keep => batch.clone(),
        NullStrategy::DropRows => {
            let nulls: Vec<_> = batch.columns().iter().map(|c| c.logical_nulls()).collect();
            let keep: BooleanArray = (0..batch.num_rows())
                .map(|row| {
                    Some(
                        nulls
                            .iter()
                            .all(|n| n.as_ref().map_or(true, |n| n.is_valid(row))),
                    )
                })
                .collect();
            filter_record_batch(batch, &keep)?
        }
        NullStrategy::DropColumns => {
            let keep: Vec<usize> = batch
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, c)| logical_null_count(c.as_ref()) == 0)
                .map(|(idx, _)| idx)
                .collect();
            batch.project(&keep)?
        }
        NullStrategy::FillZero => map_columns(batch, |array| {
            let data_type = array.data_type();
            let zero: ArrayRef = if data_type.is_numeric() {
                cast(&Int64Array::from(vec![0]), data_type)?
            } else if matches!(data_type, DataType::Utf8 | DataType::LargeUtf8) {
                cast(&StringArray::from(vec!["0"]), data_type)?
            } else {
                return Ok(Arc::clone(array));
            };
            fill(array, zero)
        })?,
        NullStrategy::FillMean => map_columns(batch, |array| {
            if !array.data_type().is_numeric() || array.null_count() == 0 {
                return Ok(Arc::clone(array));
            }
            let values: Vec<f64> = float_values(array.as_ref())?.into_iter().flatten().collect();
            if values.is_empty() {
                return Ok(Arc::clone(array));
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let as_float = cast(array.as_ref(), &DataType::Float64)?;
            fill(&as_float, Arc::new(Float64Array::from(vec![mean])))
        })?,
    };

    Ok(Table::new(table.name.clone(), cleaned))
}

/// Replace nulls in `array` with the single value in `fill_value`
fn fill(array: &ArrayRef, fill_value: ArrayRef) -> Result<ArrayRef, arrow::error::ArrowError> {
    if array.null_count() == 0 {
        return Ok(Arc::clone(array));
    }
    let mask = is_null(array.as_ref())?;
    zip(&mask, &Scalar::new(fill_value), array)
}

/// Rebuild a batch with every column transformed by `f`; field types follow
/// the new arrays
fn map_columns<F>(batch: &RecordBatch, mut f: F) -> Result<RecordBatch, AnalysisError>
where
    F: FnMut(&ArrayRef) -> Result<ArrayRef, arrow::error::ArrowError>,
{
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (field, array) in batch.schema().fields().iter().zip(batch.columns()) {
        let mapped = f(array)?;
        fields.push(Field::new(
            field.name(),
            mapped.data_type().clone(),
            field.is_nullable(),
        ));
        columns.push(mapped);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}
