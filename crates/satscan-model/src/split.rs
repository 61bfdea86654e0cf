use crate::ModelError;
use crate::node::{FeatureIndex, Impurity, N_CLASSES};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class-weighted counts.
    ///
    /// `class_weights[c]` is the summed sample weight of class `c` in the node
    /// and `total` their sum. Returns zero for an empty node.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64; N_CLASSES], total: f64) -> Impurity {
        if total <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_weights
                .iter()
                .filter(|&&w| w > 0.0)
                .map(|&w| {
                    let p = w / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value.max(0.0))
    }
}

/// How per-sample weights are derived from the training labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClassWeight {
    /// Every sample weighs 1.0.
    Uniform,
    /// Weights inversely proportional to class frequency:
    /// `n_samples / (n_present_classes * count_c)`.
    Balanced,
}

impl ClassWeight {
    /// Resolve the per-class sample weight for the given training labels.
    ///
    /// Absent classes get weight 0.0 under `Balanced`; they contribute no
    /// mass either way.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NonBinaryLabel`] if a label is outside {0, 1}.
    pub fn resolve(&self, labels: &[usize]) -> Result<[f64; N_CLASSES], ModelError> {
        crate::confusion::check_binary(labels)?;
        Ok(match self {
            ClassWeight::Uniform => [1.0; N_CLASSES],
            ClassWeight::Balanced => {
                let mut counts = [0usize; N_CLASSES];
                for &label in labels {
                    counts[label] += 1;
                }
                let n_present = counts.iter().filter(|&&c| c > 0).count();
                let n = labels.len() as f64;
                let mut weights = [0.0; N_CLASSES];
                for (w, &c) in weights.iter_mut().zip(&counts) {
                    if c > 0 {
                        *w = n / (n_present as f64 * c as f64);
                    }
                }
                weights
            }
        })
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    /// Smallest value routed right; `value < threshold` goes left.
    pub(crate) threshold: f64,
    /// Weighted impurity decrease: `W·I - W_l·I_l - W_r·I_r`.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best split over every feature column.
///
/// For each column the `(value, sample)` pairs are sorted and scanned
/// left-to-right with incremental class-weight sums. Candidate boundaries sit
/// between consecutive distinct values. Columns are scanned in order and a
/// later candidate only wins with a strictly larger decrease, so ties keep the
/// lowest feature index and the leftmost boundary.
///
/// Returns `None` when no boundary exists (every column is constant over
/// `sample_indices`) or when every boundary violates `min_samples_leaf`.
///
/// `columns` is column-major: `columns[feature][sample]`.
pub(crate) fn find_best_split(
    columns: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    class_weight: &[f64; N_CLASSES],
    criterion: SplitCriterion,
    min_samples_leaf: usize,
) -> Option<SplitResult> {
    let n_samples = sample_indices.len();
    if n_samples < 2 || columns.is_empty() {
        return None;
    }

    let mut parent = [0.0f64; N_CLASSES];
    for &si in sample_indices {
        parent[labels[si]] += class_weight[labels[si]];
    }
    let parent_total: f64 = parent.iter().sum();
    let parent_impurity = criterion.impurity(&parent, parent_total);

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

    for (feat_idx, column) in columns.iter().enumerate() {
        sorted.clear();
        sorted.extend(sample_indices.iter().map(|&si| (column[si], si)));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = [0.0f64; N_CLASSES];
        for i in 0..(n_samples - 1) {
            let (value, si) = sorted[i];
            left[labels[si]] += class_weight[labels[si]];

            let next_value = sorted[i + 1].0;
            if value == next_value {
                continue;
            }
            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let right = [parent[0] - left[0], parent[1] - left[1]];
            let left_total = left[0] + left[1];
            let right_total = right[0] + right[1];
            let decrease = parent_total * parent_impurity.value()
                - left_total * criterion.impurity(&left, left_total).value()
                - right_total * criterion.impurity(&right, right_total).value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), next_value));
            }
        }
    }

    let (feature, threshold) = best?;
    let column = &columns[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| column[si] < threshold);

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::{ClassWeight, SplitCriterion, find_best_split};
    use crate::ModelError;

    #[test]
    fn gini_pure_and_balanced() {
        let pure = SplitCriterion::Gini.impurity(&[4.0, 0.0], 4.0);
        assert!(pure.value().abs() < f64::EPSILON);
        let half = SplitCriterion::Gini.impurity(&[2.5, 2.5], 5.0);
        assert!((half.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn entropy_balanced_is_ln2() {
        let imp = SplitCriterion::Entropy.impurity(&[3.0, 3.0], 6.0);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn empty_node_has_zero_impurity() {
        let imp = SplitCriterion::Gini.impurity(&[0.0, 0.0], 0.0);
        assert_eq!(imp.value(), 0.0);
    }

    #[test]
    fn balanced_weights_equalize_class_mass() {
        // 8 negatives, 2 positives.
        let labels = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let w = ClassWeight::Balanced.resolve(&labels).unwrap();
        assert!((w[0] - 10.0 / 16.0).abs() < 1e-12);
        assert!((w[1] - 10.0 / 4.0).abs() < 1e-12);
        assert!((w[0] * 8.0 - w[1] * 2.0).abs() < 1e-12);
    }

    #[test]
    fn balanced_weights_single_class() {
        let w = ClassWeight::Balanced.resolve(&[0, 0, 0]).unwrap();
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn resolve_rejects_non_binary_labels() {
        let err = ClassWeight::Balanced.resolve(&[0, 1, 2]).unwrap_err();
        assert!(matches!(err, ModelError::NonBinaryLabel { index: 2, value: 2 }));
        assert!(ClassWeight::Uniform.resolve(&[3]).is_err());
    }

    #[test]
    fn threshold_is_smallest_right_value() {
        let columns = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = [0, 0, 0, 1, 1, 1];
        let indices: Vec<usize> = (0..6).collect();
        let split = find_best_split(
            &columns,
            &labels,
            &indices,
            &[1.0, 1.0],
            SplitCriterion::Gini,
            1,
        )
        .expect("separable column must split");
        assert_eq!(split.feature.index(), 0);
        assert_eq!(split.threshold, 10.0);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn constant_column_has_no_split() {
        let columns = vec![vec![7.0; 4]];
        let labels = [0, 1, 0, 1];
        let indices: Vec<usize> = (0..4).collect();
        let split = find_best_split(
            &columns,
            &labels,
            &indices,
            &[1.0, 1.0],
            SplitCriterion::Gini,
            1,
        );
        assert!(split.is_none());
    }

    #[test]
    fn balanced_split_isolates_minority() {
        // One positive among nine negatives: the best boundary puts the
        // positive at the right edge of the left child.
        let columns = vec![vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]];
        let labels = [0, 0, 0, 0, 1, 0, 0, 0, 0, 0];
        let indices: Vec<usize> = (0..10).collect();
        let weights = ClassWeight::Balanced.resolve(&labels).unwrap();
        let split = find_best_split(
            &columns,
            &labels,
            &indices,
            &weights,
            SplitCriterion::Gini,
            1,
        )
        .unwrap();
        assert_eq!(split.threshold, 5.0);
        assert_eq!(split.left_indices.len(), 5);
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let columns = vec![vec![1.0, 10.0]];
        let labels = [0, 1];
        let indices = [0, 1];
        let split = find_best_split(
            &columns,
            &labels,
            &indices,
            &[1.0, 1.0],
            SplitCriterion::Gini,
            2,
        );
        assert!(split.is_none());
    }
}
