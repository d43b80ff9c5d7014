//! The computed partial dependence surface.
//!
//! A [`Surface`] is a flat list of `(a, b) -> mean prediction` points plus
//! enough provenance (columns, target, seed, sample size) to reproduce it.
//! It serializes with serde and exports as delimited text.

pub mod aggregate;

pub use aggregate::aggregate;

use std::collections::HashSet;
use std::io::{self, BufWriter, Write};

use serde::{Deserialize, Serialize};

use crate::dataset::write_record;
use crate::types::{TargetDescriptor, Value};

/// Mean prediction at one grid pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub a: Value,
    pub b: Value,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub column_a: String,
    pub column_b: String,
    pub target: TargetDescriptor,
    /// Seed the base rows were sampled with.
    pub seed: u64,
    /// Base rows per grid pair.
    pub sample_count: usize,
    pub points: Vec<SurfacePoint>,
}

impl Surface {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct A values, numbers first.
    pub fn axis_a(&self) -> Vec<Value> {
        distinct(self.points.iter().map(|p| &p.a))
    }

    /// Distinct B values, numbers first.
    pub fn axis_b(&self) -> Vec<Value> {
        distinct(self.points.iter().map(|p| &p.b))
    }

    pub fn mean_at(&self, a: &Value, b: &Value) -> Option<f64> {
        let (a, b) = (a.normalized().key(), b.normalized().key());
        self.points
            .iter()
            .find(|p| p.a.key() == a && p.b.key() == b)
            .map(|p| p.mean)
    }

    /// `(min, max)` over finite means; `None` when there are none.
    pub fn mean_range(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .map(|p| p.mean)
            .filter(|m| m.is_finite())
            .fold(None, |acc, m| match acc {
                None => Some((m, m)),
                Some((lo, hi)) => Some((lo.min(m), hi.max(m))),
            })
    }

    /// Header `column_a,column_b,target`, one line per point. A `NaN` mean
    /// is written empty; infinite means are written as `inf` / `-inf`.
    pub fn to_csv<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut out = BufWriter::new(writer);
        write_record(
            &mut out,
            [self.column_a.as_str(), self.column_b.as_str(), self.target.name.as_str()].into_iter(),
            ',',
        )?;
        for point in &self.points {
            let mean = if !point.mean.is_nan() {
                point.mean.to_string()
            } else {
                String::new()
            };
            let cells = [point.a.to_string(), point.b.to_string(), mean];
            write_record(&mut out, cells.iter().map(String::as_str), ',')?;
        }
        out.flush()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A surface together with its rendered image as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedSurface {
    pub surface: Surface,
    pub data_uri: String,
}

fn distinct<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut out: Vec<Value> = values.filter(|v| seen.insert(v.key())).cloned().collect();
    out.sort_by(|x, y| x.total_cmp(y));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MISSING_SENTINEL;

    fn surface() -> Surface {
        Surface {
            column_a: "price".into(),
            column_b: "competitor".into(),
            target: TargetDescriptor::binary("churn"),
            seed: 9,
            sample_count: 3,
            points: vec![
                SurfacePoint { a: 1.0.into(), b: 10.0.into(), mean: 0.25 },
                SurfacePoint { a: 1.0.into(), b: MISSING_SENTINEL.into(), mean: f64::NAN },
                SurfacePoint { a: 2.0.into(), b: 10.0.into(), mean: 0.75 },
                SurfacePoint { a: 2.0.into(), b: MISSING_SENTINEL.into(), mean: 0.5 },
            ],
        }
    }

    #[test]
    fn test_axes_and_lookup() {
        let s = surface();
        assert_eq!(s.axis_a(), vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(s.axis_b(), vec![Value::Number(10.0), Value::text(MISSING_SENTINEL)]);
        assert_eq!(s.mean_at(&2.0.into(), &Value::Missing), Some(0.5));
        assert_eq!(s.mean_at(&3.0.into(), &10.0.into()), None);
        assert_eq!(s.mean_range(), Some((0.25, 0.75)));
    }

    #[test]
    fn test_to_csv() {
        let mut buf = Vec::new();
        surface().to_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "price,competitor,churn");
        assert_eq!(lines[1], "1,10,0.25");
        assert_eq!(lines[2], "1,N/A,");
        assert_eq!(lines.len(), 5);

        let mut s = surface();
        s.points[0].mean = f64::INFINITY;
        let mut buf = Vec::new();
        s.to_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(1), Some("1,10,inf"));
    }

    #[test]
    fn test_to_json_carries_provenance() {
        let json = surface().to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["seed"], 9);
        assert_eq!(parsed["target"]["kind"], "binary");
        assert_eq!(parsed["points"][0]["mean"], 0.25);
        assert!(parsed["points"][1]["mean"].is_null());
    }
}
