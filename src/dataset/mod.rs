//! In-memory tabular datasets.
//!
//! A [`Dataset`] is an ordered list of column names plus ordered rows, each
//! row holding exactly one [`Value`] per column. The width invariant is
//! checked once at construction so later stages can index rows by column
//! position without re-validating.

mod csv;

pub use csv::{parse_records, read_delimited, read_delimited_path, write_delimited, write_delimited_path};
pub(crate) use csv::write_record;

use std::collections::HashMap;

use crate::error::{PdError, PdResult};
use crate::types::Value;

/// Ordered rows sharing one column set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate column names and ragged rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> PdResult<Self> {
        let mut seen = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if let Some(prev) = seen.insert(name.as_str(), idx) {
                return Err(PdError::config(format!(
                    "duplicate column '{}' at positions {} and {}",
                    name, prev, idx
                )));
            }
        }

        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(PdError::config(format!(
                "row {} has {} values but the dataset has {} columns",
                idx,
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Empty dataset with the same columns, pre-allocated for `capacity` rows.
    pub fn with_columns_of(other: &Dataset, capacity: usize) -> Self {
        Self {
            columns: other.columns.clone(),
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name`, or a configuration error naming the column.
    pub fn column_index(&self, name: &str) -> PdResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PdError::config(format!("column '{}' not found in dataset", name)))
    }

    /// Iterate one column top to bottom.
    pub fn column_values(&self, name: &str) -> PdResult<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Append a row of the correct width. Crate-internal; callers build via [`Dataset::new`].
    pub(crate) fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Columns usable as sweep axes: at least one number and nothing but
    /// numbers or missing cells.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                let mut any_number = false;
                for row in &self.rows {
                    match &row[*idx] {
                        v if v.is_missing() => {}
                        Value::Number(_) => any_number = true,
                        _ => return false,
                    }
                }
                any_number
            })
            .map(|(_, name)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Dataset::new(
            cols(&["a", "b"]),
            vec![vec![Value::Number(1.0), Value::Number(2.0)], vec![Value::Number(3.0)]],
        )
        .unwrap_err();
        assert!(matches!(err, PdError::Configuration(_)));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let err = Dataset::new(cols(&["a", "a"]), vec![]).unwrap_err();
        assert!(matches!(err, PdError::Configuration(_)));
    }

    #[test]
    fn test_column_lookup() {
        let ds = Dataset::new(
            cols(&["price", "colour"]),
            vec![
                vec![Value::Number(1.0), Value::text("red")],
                vec![Value::Number(2.0), Value::Missing],
            ],
        )
        .unwrap();

        assert_eq!(ds.column_index("colour").unwrap(), 1);
        assert!(matches!(ds.column_index("size"), Err(PdError::Configuration(_))));

        let prices: Vec<_> = ds.column_values("price").unwrap().cloned().collect();
        assert_eq!(prices, vec![Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn test_numeric_columns() {
        let ds = Dataset::new(
            cols(&["price", "colour", "blank", "qty"]),
            vec![
                vec![Value::Number(1.0), Value::text("red"), Value::Missing, Value::Missing],
                vec![Value::Number(2.0), Value::text("blue"), Value::Missing, Value::Number(3.0)],
            ],
        )
        .unwrap();
        assert_eq!(ds.numeric_columns(), vec!["price", "qty"]);
    }
}
