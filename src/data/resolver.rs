//! Snapshot key resolution.
//!
//! Given a flat listing of object keys, picks the most recent snapshot for
//! each expected table. Key naming must embed a sortable date token so that
//! lexicographic order equals chronological order; the publisher writes
//! `<prefix>/YYYY/MM/DD/<table>.parquet`, which satisfies this.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::models::SnapshotMapping;

/// How a table name is matched against an object key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The name must not be glued to other identifier characters, except for a
    /// trailing `_<digits>` date/version suffix
    #[default]
    Bounded,
    /// Plain substring containment (legacy behavior; `design` matches
    /// `product_design_v2`)
    Substring,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bounded" => Ok(MatchMode::Bounded),
            "substring" => Ok(MatchMode::Substring),
            other => Err(format!(
                "unknown match mode '{other}' (expected 'bounded' or 'substring')"
            )),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Bounded => write!(f, "bounded"),
            MatchMode::Substring => write!(f, "substring"),
        }
    }
}

/// Outcome of resolving a listing against the expected tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub mapping: SnapshotMapping,
    /// Expected tables with no matching key, in configured order
    pub missing: Vec<String>,
    /// The listing itself was empty
    pub no_objects: bool,
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `key` refers to `table` under the given match mode
pub fn key_matches(key: &str, table: &str, mode: MatchMode) -> bool {
    if table.is_empty() {
        return false;
    }
    match mode {
        MatchMode::Substring => key.contains(table),
        MatchMode::Bounded => key.match_indices(table).any(|(start, _)| {
            let before_ok = key[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !is_identifier_char(c));

            let rest = &key[start + table.len()..];
            let mut chars = rest.chars();
            let after_ok = match chars.next() {
                None => true,
                Some('_') => chars.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => !is_identifier_char(c),
            };

            before_ok && after_ok
        }),
    }
}

/// Select the lexicographically greatest matching key for every expected table.
///
/// Never fails: tables without a match are listed in `missing`. An empty
/// listing sets `no_objects`, is logged once, and leaves every table missing.
pub fn resolve_snapshots<K: AsRef<str>>(
    keys: &[K],
    tables: &[String],
    mode: MatchMode,
) -> Resolution {
    let mut resolution = Resolution::default();

    if keys.is_empty() {
        tracing::warn!("no objects found; nothing to resolve");
        resolution.no_objects = true;
        resolution.missing = tables.to_vec();
        return resolution;
    }

    for table in tables {
        let latest = keys
            .iter()
            .map(AsRef::as_ref)
            .filter(|key| key_matches(key, table, mode))
            .max();

        match latest {
            Some(key) => {
                tracing::info!(table = %table, key = %key, "latest snapshot selected");
                resolution.mapping.insert(table.clone(), key.to_string());
            }
            None => {
                tracing::error!(table = %table, "no snapshot found for table");
                resolution.missing.push(table.clone());
            }
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_picks_lexicographic_max() {
        let keys = [
            "t_2024-01-01.parquet",
            "t_2024-02-15.parquet",
            "t_2023-12-31.parquet",
        ];
        for mode in [MatchMode::Bounded, MatchMode::Substring] {
            let resolution = resolve_snapshots(&keys, &names(&["t"]), mode);
            assert_eq!(
                resolution.mapping.get("t").map(String::as_str),
                Some("t_2024-02-15.parquet")
            );
            assert!(resolution.missing.is_empty());
        }
    }

    #[test]
    fn test_dated_keys_and_missing_table() {
        let keys = [
            "db/parquet_files/dim_staff_20240101.parquet",
            "db/parquet_files/dim_staff_20240201.parquet",
        ];
        let resolution = resolve_snapshots(
            &keys,
            &names(&["dim_staff", "dim_currency"]),
            MatchMode::Bounded,
        );

        assert_eq!(
            resolution.mapping.get("dim_staff").map(String::as_str),
            Some("db/parquet_files/dim_staff_20240201.parquet")
        );
        assert!(!resolution.mapping.contains_key("dim_currency"));
        assert_eq!(resolution.missing, vec!["dim_currency".to_string()]);
        assert!(!resolution.no_objects);
    }

    #[test]
    fn test_date_directories_sort_chronologically() {
        let keys = [
            "db/parquet_files/2024/01/31/dim_date.parquet",
            "db/parquet_files/2024/11/02/dim_date.parquet",
            "db/parquet_files/2024/02/01/dim_date.parquet",
        ];
        let resolution = resolve_snapshots(&keys, &names(&["dim_date"]), MatchMode::Bounded);
        assert_eq!(
            resolution.mapping["dim_date"],
            "db/parquet_files/2024/11/02/dim_date.parquet"
        );
    }

    #[test]
    fn test_empty_listing_reports_no_objects() {
        let keys: [&str; 0] = [];
        let resolution = resolve_snapshots(
            &keys,
            &names(&["fact_sales_order", "dim_staff"]),
            MatchMode::Bounded,
        );
        assert!(resolution.no_objects);
        assert!(resolution.mapping.is_empty());
        assert_eq!(resolution.missing, names(&["fact_sales_order", "dim_staff"]));
    }

    #[test]
    fn test_every_table_resolved_or_missing_exactly_once() {
        let keys = [
            "p/2024/01/01/fact_sales_order.parquet",
            "p/2024/01/01/dim_staff.parquet",
            "p/2024/01/02/dim_staff.parquet",
            "p/2024/01/01/dim_location.parquet",
            "p/notes.txt",
        ];
        let tables = names(&[
            "fact_sales_order",
            "dim_staff",
            "dim_location",
            "dim_design",
            "dim_currency",
        ]);
        for mode in [MatchMode::Bounded, MatchMode::Substring] {
            let resolution = resolve_snapshots(&keys, &tables, mode);
            for table in &tables {
                let resolved = resolution.mapping.contains_key(table);
                let missing = resolution.missing.iter().filter(|t| *t == table).count();
                assert!(
                    resolved ^ (missing == 1),
                    "{table} must be resolved or missing, not both"
                );
                assert!(missing <= 1);
            }
        }
    }

    #[test]
    fn test_bounded_rejects_embedded_names() {
        assert!(!key_matches(
            "db/product_design_v2.parquet",
            "design",
            MatchMode::Bounded
        ));
        assert!(key_matches(
            "db/product_design_v2.parquet",
            "design",
            MatchMode::Substring
        ));
        assert!(!key_matches(
            "db/dim_staff_archive.parquet",
            "dim_staff",
            MatchMode::Bounded
        ));
        assert!(key_matches(
            "db/2024/05/01/dim_design.parquet",
            "dim_design",
            MatchMode::Bounded
        ));
        assert!(key_matches("dim_design", "dim_design", MatchMode::Bounded));
        assert!(key_matches(
            "db/dim-design-2024.parquet",
            "dim",
            MatchMode::Bounded
        ));
    }

    #[test]
    fn test_bounded_checks_every_occurrence() {
        // First occurrence is glued, second one stands alone
        assert!(key_matches(
            "xdim_date/dim_date.parquet",
            "dim_date",
            MatchMode::Bounded
        ));
    }

    #[test]
    fn test_substring_mode_prefers_last_sorting_key_on_collision() {
        let keys = [
            "db/2024/01/02/dim_design.parquet",
            "db/2024/01/01/product_design_v2.parquet",
        ];
        let bounded = resolve_snapshots(&keys, &names(&["design"]), MatchMode::Bounded);
        assert_eq!(bounded.missing, vec!["design".to_string()]);

        let legacy = resolve_snapshots(&keys, &names(&["design"]), MatchMode::Substring);
        assert_eq!(legacy.mapping["design"], "db/2024/01/02/dim_design.parquet");
    }

    #[test]
    fn test_match_mode_parsing() {
        assert_eq!("bounded".parse::<MatchMode>(), Ok(MatchMode::Bounded));
        assert_eq!("Substring".parse::<MatchMode>(), Ok(MatchMode::Substring));
        assert!("fuzzy".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::default().to_string(), "bounded");
    }
}
