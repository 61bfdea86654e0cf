//! The Metric Reporter: sensitivity, specificity and ROC-AUC for binary labels.

use serde::{Deserialize, Serialize};

use crate::{ModelError, confusion::ConfusionMatrix};

/// Sensitivity, specificity and ROC-AUC computed from one evaluation.
///
/// A `None` field is the undefined marker: the rate's denominator was zero or
/// a class was absent. It serializes as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    /// Recall of the positive class.
    pub sensitivity: Option<f64>,
    /// Recall of the negative class.
    pub specificity: Option<f64>,
    /// Area under the ROC curve of the predictions.
    pub roc_auc: Option<f64>,
}

impl MetricReport {
    /// A report with every metric undefined.
    pub const UNDEFINED: Self = Self {
        sensitivity: None,
        specificity: None,
        roc_auc: None,
    };

    /// Average several reports field by field.
    ///
    /// A field of the mean is `None` as soon as one input has it `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyInput`] if `reports` is empty.
    pub fn mean(reports: &[MetricReport]) -> Result<MetricReport, ModelError> {
        if reports.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        let avg = |get: fn(&MetricReport) -> Option<f64>| -> Option<f64> {
            let sum = reports.iter().map(get).sum::<Option<f64>>()?;
            Some(sum / reports.len() as f64)
        };
        Ok(MetricReport {
            sensitivity: avg(|r| r.sensitivity),
            specificity: avg(|r| r.specificity),
            roc_auc: avg(|r| r.roc_auc),
        })
    }
}

/// Compute sensitivity, specificity and ROC-AUC from hard binary predictions.
///
/// The ROC-AUC is taken over the predicted labels themselves, so for a binary
/// predictor it equals the mean of sensitivity and specificity.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::EmptyInput`] | Zero labels provided |
/// | [`ModelError::LengthMismatch`] | `y_true.len() != y_pred.len()` |
/// | [`ModelError::NonBinaryLabel`] | A value in either sequence is not 0 or 1 |
pub fn report(y_true: &[usize], y_pred: &[usize]) -> Result<MetricReport, ModelError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
    let scores: Vec<f64> = y_pred.iter().map(|&p| p as f64).collect();
    Ok(MetricReport {
        sensitivity: cm.sensitivity(),
        specificity: cm.specificity(),
        roc_auc: roc_auc(y_true, &scores)?,
    })
}

/// Recall of the positive class. `None` when no sample is labeled 1.
///
/// # Errors
///
/// Same as [`ConfusionMatrix::from_labels`].
pub fn sensitivity_score(y_true: &[usize], y_pred: &[usize]) -> Result<Option<f64>, ModelError> {
    Ok(ConfusionMatrix::from_labels(y_true, y_pred)?.sensitivity())
}

/// Recall of the negative class. `None` when no sample is labeled 0.
///
/// # Errors
///
/// Same as [`ConfusionMatrix::from_labels`].
pub fn specificity_score(y_true: &[usize], y_pred: &[usize]) -> Result<Option<f64>, ModelError> {
    Ok(ConfusionMatrix::from_labels(y_true, y_pred)?.specificity())
}

/// Rank-based ROC-AUC (Mann–Whitney U) of `scores` against binary `y_true`.
///
/// Tied scores share their average rank, so a tie between a positive and a
/// negative counts as half a correct ordering. Returns `Ok(None)` when either
/// class is absent from `y_true`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::EmptyInput`] | Zero labels provided |
/// | [`ModelError::LengthMismatch`] | `y_true.len() != scores.len()` |
/// | [`ModelError::NonBinaryLabel`] | A label is not 0 or 1 |
pub fn roc_auc(y_true: &[usize], scores: &[f64]) -> Result<Option<f64>, ModelError> {
    if y_true.len() != scores.len() {
        return Err(ModelError::LengthMismatch {
            left: y_true.len(),
            right: scores.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyInput);
    }
    crate::confusion::check_binary(y_true)?;

    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based: the tie group covers ranks start+1 ..= end.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| y_true[i] == 1).count();
        rank_sum_pos += avg_rank * positives as f64;
        start = end;
    }

    let n_pos_f = n_pos as f64;
    let u = rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0;
    Ok(Some(u / (n_pos_f * n_neg as f64)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-12)
    }

    #[test]
    fn worked_example() {
        let r = report(&[1, 1, 0, 0], &[1, 0, 0, 0]).unwrap();
        assert!(close(r.sensitivity, 0.5));
        assert!(close(r.specificity, 1.0));
        assert!(close(r.roc_auc, 0.75));
    }

    #[test]
    fn all_negative_labels_surface_undefined_marker() {
        let r = report(&[0, 0, 0, 0], &[0, 0, 0, 0]).unwrap();
        assert_eq!(r.sensitivity, None);
        assert!(close(r.specificity, 1.0));
        assert_eq!(r.roc_auc, None);
    }

    #[test]
    fn swap_invariance() {
        let y_true = [1, 0, 1, 1, 0, 0, 1, 0];
        let y_pred = [1, 0, 0, 1, 1, 0, 1, 0];
        let flip = |v: &[usize]| v.iter().map(|&x| 1 - x).collect::<Vec<_>>();
        let r = report(&y_true, &y_pred).unwrap();
        let s = report(&flip(&y_true), &flip(&y_pred)).unwrap();
        assert_eq!(r.sensitivity, s.specificity);
        assert_eq!(r.specificity, s.sensitivity);
        assert!(close(s.roc_auc, r.roc_auc.unwrap()));
    }

    #[test]
    fn hard_prediction_auc_is_mean_of_rates() {
        let y_true = [1, 1, 1, 0, 0, 0, 0, 0];
        let y_pred = [1, 1, 0, 0, 0, 1, 0, 0];
        let r = report(&y_true, &y_pred).unwrap();
        let expected = (r.sensitivity.unwrap() + r.specificity.unwrap()) / 2.0;
        assert!(close(r.roc_auc, expected));
    }

    #[test]
    fn auc_perfect_and_inverted_scores() {
        let y = [0, 0, 1, 1];
        assert!(close(roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0));
        assert!(close(roc_auc(&y, &[0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0));
        assert!(close(roc_auc(&y, &[0.5, 0.5, 0.5, 0.5]).unwrap(), 0.5));
    }

    #[test]
    fn auc_single_class_is_none() {
        assert_eq!(roc_auc(&[1, 1, 1], &[0.2, 0.4, 0.6]).unwrap(), None);
    }

    #[test]
    fn scorers_match_report() {
        let y_true = [1, 0, 1, 0, 0];
        let y_pred = [1, 1, 0, 0, 0];
        let r = report(&y_true, &y_pred).unwrap();
        assert_eq!(sensitivity_score(&y_true, &y_pred).unwrap(), r.sensitivity);
        assert_eq!(specificity_score(&y_true, &y_pred).unwrap(), r.specificity);
    }

    #[test]
    fn mean_propagates_undefined() {
        let a = MetricReport {
            sensitivity: Some(0.5),
            specificity: Some(1.0),
            roc_auc: Some(0.75),
        };
        let b = MetricReport {
            sensitivity: None,
            specificity: Some(0.5),
            roc_auc: Some(0.25),
        };
        let m = MetricReport::mean(&[a, b]).unwrap();
        assert_eq!(m.sensitivity, None);
        assert!(close(m.specificity, 0.75));
        assert!(close(m.roc_auc, 0.5));
        assert!(MetricReport::mean(&[]).is_err());
    }

    #[test]
    fn undefined_serializes_as_null() {
        let json = serde_json::to_string(&MetricReport::UNDEFINED).unwrap();
        assert_eq!(
            json,
            r#"{"sensitivity":null,"specificity":null,"roc_auc":null}"#
        );
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(matches!(
            report(&[0, 1, 1], &[0, 1]),
            Err(ModelError::LengthMismatch { left: 3, right: 2 })
        ));
    }
}
