//! Core value types shared by every stage of the surface pipeline.
//!
//! Cells are dynamically typed the way a loaded CSV is: a number, a piece
//! of text, or nothing at all. Two derived views exist on top of [`Value`]:
//!
//! - [`ValueKey`] - hashable identity used for de-duplication while building
//!   value grids (`Missing` is its own key, distinct from the text `"N/A"`)
//! - [`Value::normalized`] - the grouping view used during aggregation, where
//!   every flavour of "missing" folds into the [`MISSING_SENTINEL`] text
//!
//! Predictions are a closed tagged variant. The aggregator never branches on
//! the target kind itself; it asks a prediction for the value matching the
//! kind through [`Prediction::select`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PdError, PdResult};

/// Label that missing sweep values are grouped under.
pub const MISSING_SENTINEL: &str = "N/A";

/// Cell tokens read as missing, mirroring common dataframe loaders.
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Interpret one raw delimited-text cell.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_nan() => Value::Missing,
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Missing marker or a NaN number.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(n) => n.is_nan(),
            Value::Text(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    /// Grouping view: missing becomes the sentinel text, `-0.0` becomes `0.0`.
    pub fn normalized(&self) -> Value {
        match self {
            v if v.is_missing() => Value::Text(MISSING_SENTINEL.to_string()),
            Value::Number(n) if *n == 0.0 => Value::Number(0.0),
            other => other.clone(),
        }
    }

    /// Hashable identity with exact numeric equality.
    pub fn key(&self) -> ValueKey {
        match self {
            v if v.is_missing() => ValueKey::Missing,
            Value::Number(n) if *n == 0.0 => ValueKey::Number(0.0_f64.to_bits()),
            Value::Number(n) => ValueKey::Number(n.to_bits()),
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Missing => ValueKey::Missing,
        }
    }

    /// Total order: numbers ascending, then text, then missing.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                v if v.is_missing() => 2,
                Value::Number(_) => 0,
                Value::Text(_) => 1,
                Value::Missing => 2,
            }
        }
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if !a.is_nan() && !b.is_nan() => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.is_nan() => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Hashable identity of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Missing,
    Number(u64),
    Text(String),
}

/// What the model's predictions represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Predictions expose a positive-class probability.
    Binary,
    /// Predictions expose a single point estimate.
    Regression,
}

impl TargetKind {
    /// Map a project's declared target type; anything but `Binary` is a point estimate.
    pub fn from_project_type(target_type: &str) -> Self {
        if target_type.eq_ignore_ascii_case("binary") {
            TargetKind::Binary
        } else {
            TargetKind::Regression
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Binary => f.write_str("binary"),
            TargetKind::Regression => f.write_str("regression"),
        }
    }
}

/// The model's output column and its semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub name: String,
    pub kind: TargetKind,
}

impl TargetDescriptor {
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::Binary)
    }

    pub fn regression(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::Regression)
    }
}

/// One scored row as returned by a scoring port.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    Binary { positive_probability: f64 },
    PointEstimate { value: f64 },
}

impl Prediction {
    pub fn probability(p: f64) -> Self {
        Prediction::Binary {
            positive_probability: p,
        }
    }

    pub fn estimate(value: f64) -> Self {
        Prediction::PointEstimate { value }
    }

    /// Build the variant a target kind expects from a raw scored number.
    pub fn for_kind(kind: TargetKind, raw: f64) -> Self {
        match kind {
            TargetKind::Binary => Self::probability(raw),
            TargetKind::Regression => Self::estimate(raw),
        }
    }

    /// The value aggregated for `kind`; a mismatched variant is a scoring fault.
    pub fn select(&self, kind: TargetKind) -> PdResult<f64> {
        match (self, kind) {
            (
                Prediction::Binary {
                    positive_probability,
                },
                TargetKind::Binary,
            ) => Ok(*positive_probability),
            (Prediction::PointEstimate { value }, TargetKind::Regression) => Ok(*value),
            (other, kind) => Err(PdError::scoring(format!(
                "scoring port returned {:?} for a {} target",
                other, kind
            ))),
        }
    }
}
