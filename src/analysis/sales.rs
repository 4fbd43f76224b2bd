//! Fixed sales aggregations over the star schema.
//!
//! Each analysis inner-joins `fact_sales_order` to one or two dimensions,
//! computes `units_sold * unit_price` per sale, sums it per group and sorts
//! the groups by total, highest first.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use super::stats::ColumnSummary;
use super::{column, float_values, join_keys, string_values, AnalysisError};
use crate::data::{Dataset, Table};

const FACT_TABLE: &str = "fact_sales_order";

/// The available sales analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SalesAnalysis {
    ByStaffAndLocation,
    ByProductDesign,
    ByCurrency,
}

impl SalesAnalysis {
    pub const ALL: [SalesAnalysis; 3] = [
        SalesAnalysis::ByStaffAndLocation,
        SalesAnalysis::ByProductDesign,
        SalesAnalysis::ByCurrency,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|a| *a == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Names of the grouping columns in the result
    pub fn label_columns(self) -> &'static [&'static str] {
        match self {
            SalesAnalysis::ByStaffAndLocation => &["staff_name", "location_name"],
            SalesAnalysis::ByProductDesign => &["design_name"],
            SalesAnalysis::ByCurrency => &["currency_code"],
        }
    }
}

impl fmt::Display for SalesAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            SalesAnalysis::ByStaffAndLocation => "Sales by staff and location",
            SalesAnalysis::ByProductDesign => "Sales by product design",
            SalesAnalysis::ByCurrency => "Sales by currency",
        };
        write!(f, "{title}")
    }
}

/// One group in an analysis result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRow {
    pub labels: Vec<String>,
    pub total_sales_amount: f64,
}

/// Result of a sales analysis, sorted by total descending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub analysis: SalesAnalysis,
    pub rows: Vec<SalesRow>,
}

impl SalesSummary {
    /// Statistics over `total_sales_amount`
    pub fn statistics(&self) -> Option<ColumnSummary> {
        let totals: Vec<f64> = self.rows.iter().map(|r| r.total_sales_amount).collect();
        ColumnSummary::from_values("total_sales_amount", &totals)
    }

    /// Staff x location matrix for charting, zero-filled.
    ///
    /// Returns (row labels, column labels, values[row][column]). Rows keep the
    /// order in which each label first appears (so largest totals first);
    /// columns are sorted by name.
    pub fn pivot(&self) -> (Vec<String>, Vec<String>, Vec<Vec<f64>>) {
        let mut row_labels: Vec<String> = Vec::new();
        let mut col_labels: Vec<String> = self
            .rows
            .iter()
            .filter_map(|r| r.labels.get(1).cloned())
            .collect();
        col_labels.sort();
        col_labels.dedup();

        for row in &self.rows {
            if let Some(label) = row.labels.first() {
                if !row_labels.contains(label) {
                    row_labels.push(label.clone());
                }
            }
        }

        let mut values = vec![vec![0.0; col_labels.len()]; row_labels.len()];
        for row in &self.rows {
            let (Some(r), Some(c)) = (row.labels.first(), row.labels.get(1)) else {
                continue;
            };
            if let (Some(ri), Some(ci)) = (
                row_labels.iter().position(|l| l == r),
                col_labels.iter().position(|l| l == c),
            ) {
                values[ri][ci] += row.total_sales_amount;
            }
        }

        (row_labels, col_labels, values)
    }
}

fn table<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Table, AnalysisError> {
    dataset
        .get(name)
        .ok_or_else(|| AnalysisError::MissingTable(name.to_string()))
}

/// Join key column values of `table`
fn keys(table: &Table, name: &str) -> Result<Vec<Option<String>>, AnalysisError> {
    Ok(join_keys(column(table, name)?.as_ref())?)
}

/// Label column values of `table`
fn text_column(table: &Table, name: &str) -> Result<Vec<Option<String>>, AnalysisError> {
    Ok(string_values(column(table, name)?.as_ref())?)
}

/// Dimension lookup: key -> label tuples for every matching dimension row.
///
/// Rows with a null key or a null label never form a group and are left out.
fn dimension(
    table: &Table,
    key: &str,
    labels: &[&str],
) -> Result<HashMap<String, Vec<Vec<String>>>, AnalysisError> {
    let key_values = keys(table, key)?;
    let label_values = labels
        .iter()
        .map(|l| text_column(table, l))
        .collect::<Result<Vec<_>, _>>()?;

    let mut lookup: HashMap<String, Vec<Vec<String>>> = HashMap::new();
    for (row, k) in key_values.into_iter().enumerate() {
        let Some(k) = k else { continue };
        let Some(tuple) = label_values
            .iter()
            .map(|col| col[row].clone())
            .collect::<Option<Vec<String>>>()
        else {
            continue;
        };
        lookup.entry(k).or_default().push(tuple);
    }
    Ok(lookup)
}

/// Sale amount per fact row; `None` if either factor is null
fn amounts(fact: &Table) -> Result<Vec<Option<f64>>, AnalysisError> {
    let units = float_values(column(fact, "units_sold")?.as_ref())?;
    let prices = float_values(column(fact, "unit_price")?.as_ref())?;
    Ok(units
        .into_iter()
        .zip(prices)
        .map(|(u, p)| Some(u? * p?))
        .collect())
}

fn into_summary(analysis: SalesAnalysis, groups: BTreeMap<Vec<String>, f64>) -> SalesSummary {
    let mut rows: Vec<SalesRow> = groups
        .into_iter()
        .map(|(labels, total_sales_amount)| SalesRow {
            labels,
            total_sales_amount,
        })
        .collect();
    // Stable sort keeps label order among equal totals
    rows.sort_by(|a, b| b.total_sales_amount.total_cmp(&a.total_sales_amount));
    SalesSummary { analysis, rows }
}

/// Group sales by the labels of a single joined dimension
fn by_dimension(
    dataset: &Dataset,
    analysis: SalesAnalysis,
    dim_name: &str,
    fact_key: &str,
    dim_key: &str,
    label: &str,
) -> Result<SalesSummary, AnalysisError> {
    let fact = table(dataset, FACT_TABLE)?;
    let dim = dimension(table(dataset, dim_name)?, dim_key, &[label])?;

    let fact_keys = keys(fact, fact_key)?;
    let amounts = amounts(fact)?;

    let mut groups: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for (k, amount) in fact_keys.iter().zip(amounts) {
        let Some(matches) = k.as_ref().and_then(|k| dim.get(k)) else {
            continue;
        };
        for labels in matches {
            let total = groups.entry(labels.clone()).or_insert(0.0);
            if let Some(a) = amount {
                *total += a;
            }
        }
    }

    Ok(into_summary(analysis, groups))
}

fn by_staff_and_location(dataset: &Dataset) -> Result<SalesSummary, AnalysisError> {
    let fact = table(dataset, FACT_TABLE)?;
    let staff = dimension(
        table(dataset, "dim_staff")?,
        "staff_id",
        &["first_name", "last_name"],
    )?;
    let locations = dimension(table(dataset, "dim_location")?, "location_id", &["country"])?;

    let staff_keys = keys(fact, "sales_staff_id")?;
    let location_keys = keys(fact, "agreed_delivery_location_id")?;
    let amounts = amounts(fact)?;

    let mut groups: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for ((staff_key, location_key), amount) in staff_keys.iter().zip(&location_keys).zip(amounts) {
        let (Some(people), Some(places)) = (
            staff_key.as_ref().and_then(|k| staff.get(k)),
            location_key.as_ref().and_then(|k| locations.get(k)),
        ) else {
            continue;
        };

        for person in people {
            let staff_name = format!("{} {}", person[0], person[1]);
            for place in places {
                let total = groups
                    .entry(vec![staff_name.clone(), place[0].clone()])
                    .or_insert(0.0);
                if let Some(a) = amount {
                    *total += a;
                }
            }
        }
    }

    Ok(into_summary(SalesAnalysis::ByStaffAndLocation, groups))
}

/// Run one analysis over the loaded dataset
pub fn run_analysis(
    analysis: SalesAnalysis,
    dataset: &Dataset,
) -> Result<SalesSummary, AnalysisError> {
    match analysis {
        SalesAnalysis::ByStaffAndLocation => by_staff_and_location(dataset),
        SalesAnalysis::ByProductDesign => by_dimension(
            dataset,
            analysis,
            "dim_design",
            "design_id",
            "design_id",
            "design_name",
        ),
        SalesAnalysis::ByCurrency => by_dimension(
            dataset,
            analysis,
            "dim_currency",
            "currency_id",
            "currency_id",
            "currency_code",
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;

    use super::*;

    fn table_of(name: &str, columns: Vec<(&str, ArrayRef)>) -> Table {
        Table::new(name, RecordBatch::try_from_iter(columns).unwrap())
    }

    fn strings(values: &[&str]) -> ArrayRef {
        Arc::new(StringArray::from(values.to_vec()))
    }

    fn ints(values: &[i64]) -> ArrayRef {
        Arc::new(Int64Array::from(values.to_vec()))
    }

    fn dataset() -> Dataset {
        let prices: ArrayRef = Arc::new(Float64Array::from(vec![
            Some(2.0),
            Some(3.0),
            Some(10.0),
            None,
            Some(1.5),
        ]));
        let fact = table_of(
            "fact_sales_order",
            vec![
                ("sales_record_id", ints(&[1, 2, 3, 4, 5])),
                ("sales_staff_id", ints(&[1, 1, 2, 2, 9])),
                ("agreed_delivery_location_id", ints(&[10, 20, 10, 10, 10])),
                ("design_id", ints(&[100, 100, 200, 300, 100])),
                ("currency_id", ints(&[1, 2, 1, 1, 2])),
                ("units_sold", ints(&[10, 5, 2, 1, 4])),
                ("unit_price", prices),
            ],
        );
        // Int32 ids still join against Int64 foreign keys
        let staff_ids: ArrayRef = Arc::new(Int32Array::from(vec![1, 2]));
        let staff = table_of(
            "dim_staff",
            vec![
                ("staff_id", staff_ids),
                ("first_name", strings(&["Ann", "Bob"])),
                ("last_name", strings(&["Lee", "Ray"])),
            ],
        );
        let location = table_of(
            "dim_location",
            vec![
                ("location_id", ints(&[10, 20])),
                ("country", strings(&["France", "Spain"])),
            ],
        );
        let design = table_of(
            "dim_design",
            vec![
                ("design_id", ints(&[100, 200, 300])),
                ("design_name", strings(&["Steel", "Wooden", "Bronze"])),
            ],
        );
        let currency = table_of(
            "dim_currency",
            vec![
                ("currency_id", ints(&[1, 2])),
                ("currency_code", strings(&["GBP", "USD"])),
            ],
        );

        [fact, staff, location, design, currency]
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect()
    }

    fn rows_of(summary: &SalesSummary) -> Vec<(Vec<&str>, f64)> {
        summary
            .rows
            .iter()
            .map(|r| {
                (
                    r.labels.iter().map(String::as_str).collect(),
                    r.total_sales_amount,
                )
            })
            .collect()
    }

    #[test]
    fn test_sales_by_staff_and_location() {
        let summary = run_analysis(SalesAnalysis::ByStaffAndLocation, &dataset()).unwrap();
        // Staff 9 has no dim_staff row and is dropped by the inner join
        assert_eq!(
            rows_of(&summary),
            vec![
                (vec!["Ann Lee", "France"], 20.0),
                (vec!["Bob Ray", "France"], 20.0),
                (vec!["Ann Lee", "Spain"], 15.0),
            ]
        );
    }

    #[test]
    fn test_sales_by_product_design() {
        let summary = run_analysis(SalesAnalysis::ByProductDesign, &dataset()).unwrap();
        // Bronze's only sale has a null price, so it totals zero
        assert_eq!(
            rows_of(&summary),
            vec![
                (vec!["Steel"], 41.0),
                (vec!["Wooden"], 20.0),
                (vec!["Bronze"], 0.0),
            ]
        );
    }

    #[test]
    fn test_sales_by_currency() {
        let summary = run_analysis(SalesAnalysis::ByCurrency, &dataset()).unwrap();
        assert_eq!(
            rows_of(&summary),
            vec![(vec!["GBP"], 40.0), (vec!["USD"], 21.0)]
        );
        let stats = summary.statistics().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.max, 40.0);
    }

    #[test]
    fn test_float_foreign_key_joins_integer_id() {
        let mut data = dataset();
        let fact = table_of(
            "fact_sales_order",
            vec![
                (
                    "currency_id",
                    Arc::new(Float64Array::from(vec![Some(1.0), None])) as ArrayRef,
                ),
                ("units_sold", ints(&[2, 3])),
                (
                    "unit_price",
                    Arc::new(Float64Array::from(vec![10.0, 1.0])) as ArrayRef,
                ),
            ],
        );
        data.insert("fact_sales_order".to_string(), fact);

        let summary = run_analysis(SalesAnalysis::ByCurrency, &data).unwrap();
        assert_eq!(rows_of(&summary), vec![(vec!["GBP"], 20.0)]);
    }

    #[test]
    fn test_null_staff_name_is_not_grouped() {
        let mut data = dataset();
        let staff = table_of(
            "dim_staff",
            vec![
                ("staff_id", ints(&[1, 2])),
                ("first_name", strings(&["Ann", "Bob"])),
                (
                    "last_name",
                    Arc::new(StringArray::from(vec![None, Some("Ray")])) as ArrayRef,
                ),
            ],
        );
        data.insert("dim_staff".to_string(), staff);

        let summary = run_analysis(SalesAnalysis::ByStaffAndLocation, &data).unwrap();
        assert_eq!(rows_of(&summary), vec![(vec!["Bob Ray", "France"], 20.0)]);
    }

    #[test]
    fn test_missing_table_and_column() {
        let mut data = dataset();
        data.remove("dim_currency");
        let err = run_analysis(SalesAnalysis::ByCurrency, &data).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingTable(ref t) if t == "dim_currency"));

        let mut data = dataset();
        let location = table_of("dim_location", vec![("location_id", ints(&[10]))]);
        data.insert("dim_location".to_string(), location);
        let err = run_analysis(SalesAnalysis::ByStaffAndLocation, &data).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { ref column, .. } if column == "country"));
    }

    #[test]
    fn test_pivot_fills_zero() {
        let summary = run_analysis(SalesAnalysis::ByStaffAndLocation, &dataset()).unwrap();
        let (rows, cols, values) = summary.pivot();
        assert_eq!(rows, vec!["Ann Lee", "Bob Ray"]);
        assert_eq!(cols, vec!["France", "Spain"]);
        assert_eq!(values, vec![vec![20.0, 15.0], vec![20.0, 0.0]]);
    }

    #[test]
    fn test_analysis_cycle() {
        assert_eq!(
            SalesAnalysis::ByCurrency.next(),
            SalesAnalysis::ByStaffAndLocation
        );
        assert_eq!(SalesAnalysis::ByProductDesign.label_columns(), &["design_name"]);
    }
}
