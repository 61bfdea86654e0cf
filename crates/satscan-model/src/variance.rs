//! Variance-based feature filtering.

use tracing::debug;

use crate::ModelError;

/// Keeps feature columns whose population variance exceeds a threshold.
///
/// The default threshold of 0.0 drops exactly the constant columns.
#[derive(Debug, Clone, Copy)]
pub struct VarianceThreshold {
    threshold: f64,
}

/// Result of applying a [`VarianceThreshold`].
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceSelection {
    /// Indices of the kept columns, ascending.
    pub selected: Vec<usize>,
    /// Population variance of every input column.
    pub variances: Vec<f64>,
}

impl VarianceThreshold {
    /// Create a filter with the given threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidVarianceThreshold`] if `threshold` is negative or NaN.
    pub fn new(threshold: f64) -> Result<Self, ModelError> {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(ModelError::InvalidVarianceThreshold { threshold });
        }
        Ok(Self { threshold })
    }

    /// Return the threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compute per-column variances and select the columns above the threshold.
    ///
    /// `columns` is column-major. An empty column has variance 0.0.
    #[must_use]
    pub fn select(&self, columns: &[Vec<f64>]) -> VarianceSelection {
        let variances: Vec<f64> = columns.iter().map(|c| population_variance(c)).collect();
        let selected: Vec<usize> = variances
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > self.threshold)
            .map(|(i, _)| i)
            .collect();
        debug!(
            n_columns = columns.len(),
            n_selected = selected.len(),
            threshold = self.threshold,
            "variance threshold applied"
        );
        VarianceSelection {
            selected,
            variances,
        }
    }
}

impl Default for VarianceThreshold {
    fn default() -> Self {
        Self { threshold: 0.0 }
    }
}

impl VarianceSelection {
    /// Indices of the dropped columns, ascending.
    #[must_use]
    pub fn dropped(&self) -> Vec<usize> {
        (0..self.variances.len())
            .filter(|i| self.selected.binary_search(i).is_err())
            .collect()
    }

    /// Keep only the selected entries of a per-column slice (columns or names).
    #[must_use]
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.selected.iter().map(|&i| items[i].clone()).collect()
    }
}

/// Population variance (divides by `n`). Constant columns return exactly 0.0.
#[must_use]
pub fn population_variance(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    if values.iter().all(|&v| v == first) {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
}
