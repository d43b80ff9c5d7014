//! Grouping of scored rows into surface points.
//!
//! Predictions are joined positionally with the `(a, b)` labels recorded at
//! expansion time, so nothing depends on the scorer echoing the swept
//! columns back. Labels are folded through [`Value::normalized`] before
//! grouping: a missing cell and a literal `"N/A"` land in the same group.

use std::collections::HashMap;

use crate::error::{PdError, PdResult};
use crate::types::{Prediction, TargetKind, Value, ValueKey};

use super::SurfacePoint;

#[derive(Default)]
struct Accumulator {
    a: Option<Value>,
    b: Option<Value>,
    sum: f64,
    count: usize,
}

/// Mean prediction per distinct `(a, b)` pair, sorted by `(a, b)`.
///
/// NaN predictions are left out of the mean; a group with nothing else
/// reports `NaN`. Infinite predictions are kept and carry into the mean.
pub fn aggregate(
    predictions: &[Prediction],
    labels_a: &[Value],
    labels_b: &[Value],
    kind: TargetKind,
) -> PdResult<Vec<SurfacePoint>> {
    if predictions.len() != labels_a.len() || predictions.len() != labels_b.len() {
        return Err(PdError::scoring(format!(
            "cannot join {} predictions with {} x {} labels",
            predictions.len(),
            labels_a.len(),
            labels_b.len()
        )));
    }

    let mut groups: HashMap<(ValueKey, ValueKey), Accumulator> = HashMap::new();
    let mut skipped = 0usize;

    for ((prediction, a), b) in predictions.iter().zip(labels_a).zip(labels_b) {
        let value = prediction.select(kind)?;
        let a = a.normalized();
        let b = b.normalized();

        let acc = groups.entry((a.key(), b.key())).or_default();
        if acc.a.is_none() {
            acc.a = Some(a);
            acc.b = Some(b);
        }
        if !value.is_nan() {
            acc.sum += value;
            acc.count += 1;
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "NaN predictions left out of the surface means");
    }

    let mut points: Vec<SurfacePoint> = groups
        .into_values()
        .filter_map(|acc| {
            let mean = if acc.count == 0 {
                f64::NAN
            } else {
                acc.sum / acc.count as f64
            };
            Some(SurfacePoint {
                a: acc.a?,
                b: acc.b?,
                mean,
            })
        })
        .collect();

    points.sort_by(|x, y| x.a.total_cmp(&y.a).then_with(|| x.b.total_cmp(&y.b)));
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MISSING_SENTINEL;

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    #[test]
    fn test_constant_groups_keep_exact_constant() {
        let labels_a = vec![n(1.0), n(1.0), n(2.0), n(2.0)];
        let labels_b = vec![n(5.0), n(5.0), n(5.0), n(5.0)];
        let preds = vec![
            Prediction::estimate(0.1),
            Prediction::estimate(0.1),
            Prediction::estimate(7.25),
            Prediction::estimate(7.25),
        ];
        let points = aggregate(&preds, &labels_a, &labels_b, TargetKind::Regression).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].mean, 0.1);
        assert_eq!(points[1].mean, 7.25);
    }

    #[test]
    fn test_mean_and_sort_order() {
        let labels_a = vec![n(2.0), n(1.0), n(1.0), Value::text("z"), n(1.0)];
        let labels_b = vec![n(0.0), n(3.0), n(3.0), n(0.0), n(-1.0)];
        let preds: Vec<Prediction> = [0.5, 0.2, 0.4, 0.9, 0.7]
            .into_iter()
            .map(Prediction::probability)
            .collect();

        let points = aggregate(&preds, &labels_a, &labels_b, TargetKind::Binary).unwrap();
        let keys: Vec<(Value, Value)> = points.iter().map(|p| (p.a.clone(), p.b.clone())).collect();
        assert_eq!(
            keys,
            vec![
                (n(1.0), n(-1.0)),
                (n(1.0), n(3.0)),
                (n(2.0), n(0.0)),
                (Value::text("z"), n(0.0)),
            ]
        );
        assert!((points[1].mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_missing_labels_group_under_sentinel() {
        let labels_a = vec![Value::Missing, Value::text(MISSING_SENTINEL), n(f64::NAN)];
        let labels_b = vec![n(4.0), n(4.0), n(4.0)];
        let preds = vec![
            Prediction::estimate(1.0),
            Prediction::estimate(2.0),
            Prediction::estimate(3.0),
        ];
        let points = aggregate(&preds, &labels_a, &labels_b, TargetKind::Regression).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].a, Value::text(MISSING_SENTINEL));
        assert_eq!(points[0].b, n(4.0));
        assert_eq!(points[0].mean, 2.0);
    }

    #[test]
    fn test_nan_skipped_infinity_kept() {
        let labels_a = vec![n(1.0), n(1.0), n(2.0)];
        let labels_b = vec![n(1.0), n(1.0), n(1.0)];
        let preds = vec![
            Prediction::estimate(f64::NAN),
            Prediction::estimate(4.0),
            Prediction::estimate(f64::INFINITY),
        ];
        let points = aggregate(&preds, &labels_a, &labels_b, TargetKind::Regression).unwrap();
        assert_eq!(points[0].mean, 4.0);
        assert_eq!(points[1].mean, f64::INFINITY);

        let all_nan = aggregate(&[Prediction::estimate(f64::NAN)], &[n(1.0)], &[n(1.0)], TargetKind::Regression)
            .unwrap();
        assert!(all_nan[0].mean.is_nan());
    }

    #[test]
    fn test_length_mismatch_and_kind_mismatch() {
        let err = aggregate(&[Prediction::estimate(1.0)], &[n(1.0), n(2.0)], &[n(1.0), n(2.0)], TargetKind::Regression)
            .unwrap_err();
        assert!(matches!(err, PdError::Scoring(_)));

        let err = aggregate(&[Prediction::estimate(1.0)], &[n(1.0)], &[n(1.0)], TargetKind::Binary).unwrap_err();
        assert!(matches!(err, PdError::Scoring(_)));
    }
}
