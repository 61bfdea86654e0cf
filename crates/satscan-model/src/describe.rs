//! Descriptive statistics for identifier and label summaries.

use serde::Serialize;

use crate::{ModelError, node::N_CLASSES};

/// Count, mean, spread and quartiles of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (divides by `n - 1`); `None` for a single value.
    pub std: Option<f64>,
    /// Smallest value.
    pub min: f64,
    /// First quartile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q75: f64,
    /// Largest value.
    pub max: f64,
}

/// Summarize a numeric column. Quantiles interpolate linearly between ranks.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::EmptyInput`] | `values` is empty |
/// | [`ModelError::NonFiniteValue`] | A value is NaN or infinite |
pub fn describe(values: &[f64]) -> Result<ColumnSummary, ModelError> {
    if values.is_empty() {
        return Err(ModelError::EmptyInput);
    }
    if let Some(sample_index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFiniteValue {
            sample_index,
            feature_index: 0,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let ss: f64 = sorted.iter().map(|&v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });

    Ok(ColumnSummary {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Per-class sample counts of a binary label column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassBalance {
    /// Samples labeled 0 and 1.
    pub counts: [usize; N_CLASSES],
    /// Share of samples labeled 1.
    pub positive_fraction: f64,
}

impl ClassBalance {
    /// Count the classes of a binary label column.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyInput`] | `labels` is empty |
    /// | [`ModelError::NonBinaryLabel`] | A label is not 0 or 1 |
    pub fn from_labels(labels: &[usize]) -> Result<Self, ModelError> {
        if labels.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        crate::confusion::check_binary(labels)?;
        let mut counts = [0usize; N_CLASSES];
        for &label in labels {
            counts[label] += 1;
        }
        Ok(Self {
            counts,
            positive_fraction: counts[1] as f64 / labels.len() as f64,
        })
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_interpolate() {
        let s = describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert!((s.q25 - 1.75).abs() < 1e-12);
        assert!((s.median - 2.5).abs() < 1e-12);
        assert!((s.q75 - 3.25).abs() < 1e-12);
        assert_eq!(s.max, 4.0);
        let expected_std = (5.0f64 / 3.0).sqrt();
        assert!((s.std.unwrap() - expected_std).abs() < 1e-12);
    }

    #[test]
    fn single_value_has_no_std() {
        let s = describe(&[7.0]).unwrap();
        assert_eq!(s.std, None);
        assert_eq!(s.median, 7.0);
    }

    #[test]
    fn empty_and_nan_rejected() {
        assert!(describe(&[]).is_err());
        assert!(matches!(
            describe(&[1.0, f64::NAN]),
            Err(ModelError::NonFiniteValue { sample_index: 1, .. })
        ));
    }

    #[test]
    fn class_balance_counts() {
        let b = ClassBalance::from_labels(&[0, 0, 0, 1]).unwrap();
        assert_eq!(b.counts, [3, 1]);
        assert_eq!(b.total(), 4);
        assert!((b.positive_fraction - 0.25).abs() < 1e-12);
    }

    #[test]
    fn class_balance_rejects_non_binary() {
        assert!(ClassBalance::from_labels(&[0, 2]).is_err());
    }
}
