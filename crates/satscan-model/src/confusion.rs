//! Binary confusion matrix and the rates derived from it.

use std::fmt;

use crate::ModelError;

/// Reject any value outside {0, 1}.
pub(crate) fn check_binary(values: &[usize]) -> Result<(), ModelError> {
    match values.iter().position(|&v| v > 1) {
        Some(index) => Err(ModelError::NonBinaryLabel {
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

/// A 2×2 confusion matrix over binary labels, class 1 being positive.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyInput`] | Zero labels provided |
    /// | [`ModelError::LengthMismatch`] | `y_true.len() != y_pred.len()` |
    /// | [`ModelError::NonBinaryLabel`] | A value in either sequence is not 0 or 1 |
    pub fn from_labels(y_true: &[usize], y_pred: &[usize]) -> Result<Self, ModelError> {
        if y_true.len() != y_pred.len() {
            return Err(ModelError::LengthMismatch {
                left: y_true.len(),
                right: y_pred.len(),
            });
        }
        if y_true.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        check_binary(y_true)?;
        check_binary(y_pred)?;

        let mut matrix = [[0usize; 2]; 2];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            matrix[t][p] += 1;
        }
        Ok(Self { matrix })
    }

    /// True positives: label 1 predicted 1.
    #[must_use]
    pub fn tp(&self) -> usize {
        self.matrix[1][1]
    }

    /// True negatives: label 0 predicted 0.
    #[must_use]
    pub fn tn(&self) -> usize {
        self.matrix[0][0]
    }

    /// False positives: label 0 predicted 1.
    #[must_use]
    pub fn fp(&self) -> usize {
        self.matrix[0][1]
    }

    /// False negatives: label 1 predicted 0.
    #[must_use]
    pub fn fn_(&self) -> usize {
        self.matrix[1][0]
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        (self.tp() + self.tn()) as f64 / self.total() as f64
    }

    /// Recall of the positive class: `tp / (tp + fn)`.
    ///
    /// `None` when there are no positive-labeled samples.
    #[must_use]
    pub fn sensitivity(&self) -> Option<f64> {
        rate(self.tp(), self.tp() + self.fn_())
    }

    /// Recall of the negative class: `tn / (tn + fp)`.
    ///
    /// `None` when there are no negative-labeled samples.
    #[must_use]
    pub fn specificity(&self) -> Option<f64> {
        rate(self.tn(), self.tn() + self.fp())
    }

    /// Return the same counts with the positive and negative classes swapped.
    #[must_use]
    pub fn swapped(&self) -> Self {
        let m = self.matrix;
        Self {
            matrix: [[m[1][1], m[1][0]], [m[0][1], m[0][0]]],
        }
    }
}

fn rate(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>8} {:>8}", "", "pred_0", "pred_1")?;
        for (i, row) in self.matrix.iter().enumerate() {
            writeln!(f, "{:>8} {:>8} {:>8}", format!("true_{i}"), row[0], row[1])?;
        }
        Ok(())
    }
}
