//! Value grids: the representative test points for one swept column.
//!
//! Low-cardinality columns are tested at every observed value. Past
//! [`MAX_GRID_POINTS`] distinct values the column has to be reduced, and the
//! reduction is an explicit [`GridPolicy`] choice:
//!
//! | Policy      | Reduction                                                  |
//! |-------------|------------------------------------------------------------|
//! | `EvenWidth` | 21 evenly spaced points from min to max (numeric only)     |
//! | `Truncate`  | first 25 distinct values in encounter order (any type)     |
//!
//! Even-width grids are representative of the column's range; truncated
//! grids are cheap and work for text columns but depend on row order.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{PdError, PdResult};
use crate::types::Value;

/// Columns with at most this many distinct values are used unreduced.
pub const MAX_GRID_POINTS: usize = 25;

/// Number of equal-width intervals in an even-width grid (21 points).
pub const EVEN_WIDTH_INTERVALS: usize = 20;

/// How high-cardinality columns are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridPolicy {
    /// Evenly spaced numeric points spanning min..=max.
    #[default]
    EvenWidth,
    /// First distinct values in encounter order.
    Truncate,
}

impl FromStr for GridPolicy {
    type Err = PdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "even-width" | "even_width" | "evenwidth" => Ok(GridPolicy::EvenWidth),
            "truncate" | "truncation" => Ok(GridPolicy::Truncate),
            other => Err(PdError::config(format!(
                "unknown grid policy '{}' (expected 'even-width' or 'truncate')",
                other
            ))),
        }
    }
}

impl fmt::Display for GridPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridPolicy::EvenWidth => f.write_str("even-width"),
            GridPolicy::Truncate => f.write_str("truncate"),
        }
    }
}

/// Ordered, immutable set of test values for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueGrid {
    column: String,
    values: Vec<Value>,
    reduced: bool,
}

impl ValueGrid {
    /// Grid from explicit values, for callers that pick their own test points.
    pub fn from_values(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            column: column.into(),
            values,
            reduced: false,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the column had to be reduced to fit the grid bound.
    pub fn is_reduced(&self) -> bool {
        self.reduced
    }
}

/// Build the grid for `column` under `policy`.
pub fn build_grid(dataset: &Dataset, column: &str, policy: GridPolicy) -> PdResult<ValueGrid> {
    let mut seen = HashSet::new();
    let distinct: Vec<Value> = dataset
        .column_values(column)?
        .filter(|v| seen.insert(v.key()))
        .map(|v| if v.is_missing() { Value::Missing } else { v.clone() })
        .collect();

    if distinct.len() <= MAX_GRID_POINTS {
        return Ok(ValueGrid {
            column: column.to_string(),
            values: distinct,
            reduced: false,
        });
    }

    let values = match policy {
        GridPolicy::Truncate => distinct.into_iter().take(MAX_GRID_POINTS).collect(),
        GridPolicy::EvenWidth => even_width_points(column, &distinct)?,
    };

    Ok(ValueGrid {
        column: column.to_string(),
        values,
        reduced: true,
    })
}

fn even_width_points(column: &str, distinct: &[Value]) -> PdResult<Vec<Value>> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for value in distinct {
        match value {
            v if v.is_missing() => {}
            Value::Number(n) if n.is_finite() => {
                min = min.min(*n);
                max = max.max(*n);
            }
            Value::Number(n) => {
                return Err(PdError::config(format!(
                    "column '{}' contains the infinite value {}; even-width reduction needs \
                     a finite range (use the truncate policy)",
                    column, n
                )));
            }
            other => {
                return Err(PdError::config(format!(
                    "column '{}' has {} distinct values and non-numeric value '{}'; \
                     even-width reduction needs a numeric column (use the truncate policy)",
                    column,
                    distinct.len(),
                    other
                )));
            }
        }
    }

    let increment = (max - min) / EVEN_WIDTH_INTERVALS as f64;
    let mut points: Vec<Value> = (0..EVEN_WIDTH_INTERVALS)
        .map(|i| Value::Number(min + increment * i as f64))
        .collect();
    // Pin the last point so the grid brackets the data exactly.
    points.push(Value::Number(max));
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn single_column(name: &str, values: Vec<Value>) -> Dataset {
        Dataset::new(
            vec![name.to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_small_column_is_unreduced_in_first_seen_order() {
        let ds = single_column(
            "colour",
            vec![
                Value::text("red"),
                Value::text("blue"),
                Value::text("red"),
                Value::Missing,
                Value::text("green"),
                Value::Missing,
            ],
        );
        let grid = build_grid(&ds, "colour", GridPolicy::EvenWidth).unwrap();
        assert_eq!(
            grid.values(),
            &[Value::text("red"), Value::text("blue"), Value::Missing, Value::text("green")]
        );
        assert!(!grid.is_reduced());
    }

    #[test]
    fn test_exactly_max_points_is_unreduced() {
        let ds = single_column("x", (0..25).map(|i| Value::Number(i as f64)).collect());
        let grid = build_grid(&ds, "x", GridPolicy::EvenWidth).unwrap();
        assert_eq!(grid.len(), 25);
        assert!(!grid.is_reduced());
    }

    #[test]
    fn test_even_width_reduction() {
        let ds = single_column("x", (0..100).map(|i| Value::Number(i as f64 * 2.0)).collect());
        let grid = build_grid(&ds, "x", GridPolicy::EvenWidth).unwrap();
        assert_eq!(grid.len(), EVEN_WIDTH_INTERVALS + 1);
        assert_eq!(grid.values()[0], Value::Number(0.0));
        assert_eq!(grid.values()[20], Value::Number(198.0));
        assert!((grid.values()[1].as_number().unwrap() - 9.9).abs() < 1e-9);
        assert!(grid.is_reduced());
    }

    #[test]
    fn test_even_width_ignores_missing_for_range() {
        let mut values: Vec<Value> = (1..=30).map(|i| Value::Number(i as f64)).collect();
        values.push(Value::Missing);
        let grid = build_grid(&single_column("x", values), "x", GridPolicy::EvenWidth).unwrap();
        assert_eq!(grid.values().first(), Some(&Value::Number(1.0)));
        assert_eq!(grid.values().last(), Some(&Value::Number(30.0)));
    }

    #[test]
    fn test_even_width_rejects_text_columns() {
        let ds = single_column("id", (0..30).map(|i| Value::text(format!("id-{}", i))).collect());
        let err = build_grid(&ds, "id", GridPolicy::EvenWidth).unwrap_err();
        assert!(matches!(err, PdError::Configuration(_)));
    }

    #[test]
    fn test_even_width_rejects_infinite_values() {
        let mut values: Vec<Value> = (0..30).map(|i| Value::Number(i as f64)).collect();
        values.push(Value::Number(f64::INFINITY));
        let err = build_grid(&single_column("x", values), "x", GridPolicy::EvenWidth).unwrap_err();
        assert!(matches!(err, PdError::Configuration(_)));
        let msg = err.to_string();
        assert!(msg.contains("infinite value inf"));
        assert!(!msg.contains("non-numeric"));
    }

    #[test]
    fn test_truncate_takes_first_distinct() {
        let ds = single_column("id", (0..30).map(|i| Value::text(format!("id-{}", i))).collect());
        let grid = build_grid(&ds, "id", GridPolicy::Truncate).unwrap();
        assert_eq!(grid.len(), MAX_GRID_POINTS);
        assert_eq!(grid.values()[0], Value::text("id-0"));
        assert_eq!(grid.values()[24], Value::text("id-24"));
    }

    #[test]
    fn test_unknown_column() {
        let ds = single_column("x", vec![Value::Number(1.0)]);
        assert!(matches!(
            build_grid(&ds, "y", GridPolicy::Truncate),
            Err(PdError::Configuration(_))
        ));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("even-width".parse::<GridPolicy>().unwrap(), GridPolicy::EvenWidth);
        assert_eq!("Truncate".parse::<GridPolicy>().unwrap(), GridPolicy::Truncate);
        assert!("quantile".parse::<GridPolicy>().is_err());
    }

    proptest! {
        #[test]
        fn prop_low_cardinality_grid_is_exact(raw in proptest::collection::vec(0u8..20, 1..200)) {
            let ds = single_column("x", raw.iter().map(|&v| Value::Number(v as f64)).collect());
            let grid = build_grid(&ds, "x", GridPolicy::EvenWidth).unwrap();

            let mut expected = Vec::new();
            for v in &raw {
                let v = Value::Number(*v as f64);
                if !expected.contains(&v) {
                    expected.push(v);
                }
            }
            prop_assert_eq!(grid.values(), expected.as_slice());
        }

        #[test]
        fn prop_even_width_brackets_data(raw in proptest::collection::hash_set(-10_000i32..10_000, 26..120)) {
            let values: Vec<f64> = raw.iter().map(|&v| v as f64 / 4.0).collect();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let ds = single_column("x", values.into_iter().map(Value::Number).collect());

            let grid = build_grid(&ds, "x", GridPolicy::EvenWidth).unwrap();
            prop_assert!((20..=22).contains(&grid.len()));

            let points: Vec<f64> = grid.values().iter().filter_map(Value::as_number).collect();
            prop_assert!(points.iter().cloned().fold(f64::INFINITY, f64::min) <= min);
            prop_assert!(points.iter().cloned().fold(f64::NEG_INFINITY, f64::max) >= max);
        }
    }
}
