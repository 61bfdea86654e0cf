use tracing::{debug, instrument};

use crate::{
    ModelError,
    node::{FeatureIndex, N_CLASSES, Node, NodeIndex},
    split::{ClassWeight, SplitCriterion, find_best_split},
};

/// Configuration for a class-weighted CART decision tree on binary labels.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default            |
/// |---------------------|--------------------|
/// | `criterion`         | `Gini`             |
/// | `class_weight`      | `Balanced`         |
/// | `max_depth`         | `None` (unlimited) |
/// | `min_samples_split` | 2                  |
/// | `min_samples_leaf`  | 1                  |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) class_weight: ClassWeight,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            class_weight: ClassWeight::Balanced,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the class weighting scheme.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Set the maximum tree depth. `Some(1)` grows a stump.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each child after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the class weighting scheme.
    #[must_use]
    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Train a tree on a row-major matrix: `features[sample][feature]`.
    ///
    /// # Errors
    ///
    /// Same as [`DecisionTreeConfig::fit_columns`], plus
    /// [`ModelError::FeatureCountMismatch`] for ragged rows.
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        let n_features = features[0].len();
        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(ModelError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
        }
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();
        self.fit_columns(&columns, labels)
    }

    /// Train a tree on a column-major matrix: `columns[feature][sample]`.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                   |
    /// |----------------------------------------|----------------------------------------|
    /// | [`ModelError::ZeroFeatures`]           | `columns` is empty                     |
    /// | [`ModelError::EmptyInput`]             | zero samples                           |
    /// | [`ModelError::LengthMismatch`]         | a column length differs from `labels`  |
    /// | [`ModelError::NonBinaryLabel`]         | a label is outside {0, 1}              |
    /// | [`ModelError::NonFiniteValue`]         | a value is NaN or infinite             |
    /// | [`ModelError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`               |
    /// | [`ModelError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                |
    /// | [`ModelError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                 |
    #[instrument(skip_all, fields(n_features = columns.len(), n_samples = labels.len()))]
    pub fn fit_columns(
        &self,
        columns: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<DecisionTree, ModelError> {
        if columns.is_empty() {
            return Err(ModelError::ZeroFeatures);
        }
        if labels.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        for (feature_index, column) in columns.iter().enumerate() {
            if column.len() != labels.len() {
                return Err(ModelError::LengthMismatch {
                    left: labels.len(),
                    right: column.len(),
                });
            }
            if let Some(sample_index) = column.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
        crate::confusion::check_binary(labels)?;

        if self.max_depth == Some(0) {
            return Err(ModelError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ModelError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }

        let class_weight = self.class_weight.resolve(labels)?;
        let sample_indices: Vec<usize> = (0..labels.len()).collect();
        let mut arena: Vec<Node> = Vec::new();

        build_tree(
            columns,
            labels,
            &sample_indices,
            &class_weight,
            self,
            0,
            &mut arena,
        );

        debug!(n_nodes = arena.len(), ?class_weight, "decision tree built");

        Ok(DecisionTree {
            nodes: arena,
            n_features: columns.len(),
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively grow the tree into `arena`, returning the new node's index.
fn build_tree(
    columns: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    class_weight: &[f64; N_CLASSES],
    config: &DecisionTreeConfig,
    depth: usize,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let n_samples = sample_indices.len();

    let mut mass = [0.0f64; N_CLASSES];
    for &si in sample_indices {
        mass[labels[si]] += class_weight[labels[si]];
    }
    let total = mass[0] + mass[1];
    let impurity = config.criterion.impurity(&mass, total);

    let depth_reached = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_few = n_samples < config.min_samples_split;
    let pure = impurity.value() <= f64::EPSILON;

    let split = if depth_reached || too_few || pure {
        None
    } else {
        find_best_split(
            columns,
            labels,
            sample_indices,
            class_weight,
            config.criterion,
            config.min_samples_leaf,
        )
    };

    let Some(split) = split else {
        let distribution = if total > 0.0 {
            [mass[0] / total, mass[1] / total]
        } else {
            [0.5, 0.5]
        };
        let idx = arena.len();
        arena.push(Node::Leaf {
            prediction: usize::from(mass[1] > mass[0]),
            distribution,
            impurity,
            n_samples,
        });
        return NodeIndex::new(idx);
    };

    // Reserve the slot, grow both children, then write the split over it.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: 0,
        distribution: [0.5, 0.5],
        impurity,
        n_samples,
    });

    let left = build_tree(
        columns,
        labels,
        &split.left_indices,
        class_weight,
        config,
        depth + 1,
        arena,
    );
    let right = build_tree(
        columns,
        labels,
        &split.right_indices,
        class_weight,
        config,
        depth + 1,
        arena,
    );

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity,
        n_samples,
        impurity_decrease: split.impurity_decrease,
    };

    NodeIndex::new(node_idx)
}

/// A fitted binary decision tree.
///
/// Nodes live in an arena (`Vec<Node>`); the root is always index 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Predict the class of a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when `sample.len() != n_features`,
    /// or [`ModelError::NonFiniteValue`] when a value is NaN or infinite.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ModelError> {
        self.walk(sample, 0).map(|(prediction, _)| prediction)
    }

    /// Return the class-weighted probability of the positive class for a sample.
    ///
    /// # Errors
    ///
    /// Same as [`DecisionTree::predict`].
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError> {
        self.walk(sample, 0).map(|(_, distribution)| distribution[1])
    }

    /// Predict every row of a row-major matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] if any row has the wrong width,
    /// or [`ModelError::NonFiniteValue`] naming the first non-finite cell.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        features
            .iter()
            .enumerate()
            .map(|(sample_index, row)| {
                self.walk(row, sample_index).map(|(prediction, _)| prediction)
            })
            .collect()
    }

    /// Predict every sample of a column-major matrix.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::PredictionFeatureMismatch`] | `columns.len() != n_features` |
    /// | [`ModelError::LengthMismatch`] | columns differ in length |
    /// | [`ModelError::NonFiniteValue`] | a value is NaN or infinite |
    pub fn predict_columns(&self, columns: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        if columns.len() != self.n_features {
            return Err(ModelError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: columns.len(),
            });
        }
        let n_samples = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_samples) {
            return Err(ModelError::LengthMismatch {
                left: n_samples,
                right: bad.len(),
            });
        }
        let mut sample = vec![0.0; self.n_features];
        (0..n_samples)
            .map(|i| {
                for (slot, column) in sample.iter_mut().zip(columns) {
                    *slot = column[i];
                }
                self.walk(&sample, i).map(|(prediction, _)| prediction)
            })
            .collect()
    }

    /// Weighted impurity-decrease importance per feature, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease.max(0.0);
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the arena nodes; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of features this tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of internal decision nodes.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.nodes.len() - self.n_leaves()
    }

    /// Return the depth of the deepest leaf. A lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    /// Return the feature tested at the root, if the root splits.
    #[must_use]
    pub fn root_feature(&self) -> Option<FeatureIndex> {
        match self.nodes.first() {
            Some(Node::Split { feature, .. }) => Some(*feature),
            _ => None,
        }
    }

    /// Walk from the root to a leaf, returning its prediction and class shares.
    ///
    /// `sample_index` only labels a [`ModelError::NonFiniteValue`].
    fn walk(
        &self,
        sample: &[f64],
        sample_index: usize,
    ) -> Result<(usize, [f64; N_CLASSES]), ModelError> {
        if sample.len() != self.n_features {
            return Err(ModelError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        if let Some(feature_index) = sample.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    prediction,
                    distribution,
                    ..
                } => return Ok((*prediction, *distribution)),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] < *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn empty_dataset_error() {
        let err = DecisionTreeConfig::new().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyInput));
    }

    #[test]
    fn zero_features_error() {
        let err = DecisionTreeConfig::new().fit_columns(&[], &[0, 1]).unwrap_err();
        assert!(matches!(err, ModelError::ZeroFeatures));
    }

    #[test]
    fn pure_labels_single_leaf() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[1, 1, 1]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[0.0]).unwrap(), 1);
    }

    #[test]
    fn separable_stump() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_splits(), 1);
        assert_eq!(tree.root_feature(), Some(FeatureIndex::new(0)));
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[10.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.predict(&[9.999, 0.0]).unwrap(), 0);
    }

    #[test]
    fn constant_feature_is_a_leaf_predicting_zero_on_tie() {
        let columns = vec![vec![5.0; 6]];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit_columns(&columns, &[0, 0, 0, 0, 1, 1])
            .unwrap();
        assert_eq!(tree.n_splits(), 0);
        // Balanced weights give both classes equal mass.
        assert_eq!(tree.predict(&[5.0]).unwrap(), 0);
    }

    #[test]
    fn uniform_weights_predict_majority() {
        let columns = vec![vec![5.0; 6]];
        let tree = DecisionTreeConfig::new()
            .with_class_weight(ClassWeight::Uniform)
            .fit_columns(&columns, &[0, 1, 1, 1, 1, 1])
            .unwrap();
        assert_eq!(tree.predict(&[5.0]).unwrap(), 1);
        assert!((tree.predict_proba(&[5.0]).unwrap() - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn xor_needs_depth_two() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let labels = vec![0, 1, 1, 0];
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.predict_batch(&features).unwrap(), labels);
    }

    #[test]
    fn max_depth_limits_tree() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&features, &[0, 1, 1, 0])
            .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let features = vec![
            vec![1.0, 100.0],
            vec![2.0, 200.0],
            vec![3.0, 300.0],
            vec![10.0, 100.0],
            vec![11.0, 200.0],
            vec![12.0, 300.0],
        ];
        let tree = DecisionTreeConfig::new()
            .fit(&features, &[0, 0, 0, 1, 1, 1])
            .unwrap();
        let importances = tree.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((importances[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn predict_columns_matches_rows() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        let columns = vec![
            features.iter().map(|r| r[0]).collect::<Vec<_>>(),
            features.iter().map(|r| r[1]).collect::<Vec<_>>(),
        ];
        assert_eq!(
            tree.predict_columns(&columns).unwrap(),
            tree.predict_batch(&features).unwrap()
        );
    }

    #[test]
    fn non_binary_label_rejected() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0], vec![2.0]], &[0, 2])
            .unwrap_err();
        assert!(matches!(err, ModelError::NonBinaryLabel { index: 1, value: 2 }));
    }

    #[test]
    fn non_finite_value_rejected() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0, f64::NAN], vec![3.0, 4.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::NonFiniteValue { sample_index: 0, feature_index: 1 }
        ));
    }

    #[test]
    fn prediction_width_checked() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn non_finite_prediction_rejected() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert!(matches!(
            tree.predict(&[f64::NAN, 0.0]).unwrap_err(),
            ModelError::NonFiniteValue { sample_index: 0, feature_index: 0 }
        ));
        assert!(tree.predict_proba(&[1.0, f64::INFINITY]).is_err());
        let columns = vec![vec![1.0, 2.0, f64::NAN], vec![0.0; 3]];
        assert!(matches!(
            tree.predict_columns(&columns).unwrap_err(),
            ModelError::NonFiniteValue { sample_index: 2, feature_index: 0 }
        ));
        let rows = vec![vec![1.0, 0.0], vec![2.0, f64::NEG_INFINITY]];
        assert!(matches!(
            tree.predict_batch(&rows).unwrap_err(),
            ModelError::NonFiniteValue { sample_index: 1, feature_index: 1 }
        ));
    }

    #[test]
    fn root_node_holds_threshold() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        match &tree.nodes()[0] {
            Node::Split {
                feature,
                threshold,
                n_samples,
                ..
            } => {
                assert_eq!(*feature, FeatureIndex::new(0));
                assert_eq!(*threshold, 10.0);
                assert_eq!(*n_samples, 6);
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
        assert_eq!(tree.nodes().len(), tree.n_nodes());
    }

    #[test]
    fn min_samples_leaf_blocks_small_children() {
        let (features, labels) = separable();
        // Both children of the only useful boundary hold 3 samples.
        let tree = DecisionTreeConfig::new()
            .with_min_samples_leaf(4)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_splits(), 0);
        let tree = DecisionTreeConfig::new()
            .with_min_samples_leaf(3)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_splits(), 1);
    }

    #[test]
    fn min_samples_split_stops_growth() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new()
            .with_min_samples_split(7)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        let tree = DecisionTreeConfig::new()
            .with_min_samples_split(6)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_splits(), 1);
    }

    #[test]
    fn invalid_min_samples_rejected() {
        let (features, labels) = separable();
        let err = DecisionTreeConfig::new()
            .with_min_samples_leaf(0)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidMinSamplesLeaf { min_samples_leaf: 0 }));
        let err = DecisionTreeConfig::new()
            .with_min_samples_split(1)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidMinSamplesSplit { min_samples_split: 1 }));
    }

    #[test]
    fn zero_depth_rejected() {
        let (features, labels) = separable();
        let err = DecisionTreeConfig::new()
            .with_max_depth(Some(0))
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidMaxDepth { max_depth: 0 }));
    }
}
