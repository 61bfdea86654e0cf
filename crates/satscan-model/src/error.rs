/// Errors from metric computation, tree fitting and evaluation routines.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when a label or prediction sequence is empty.
    #[error("input has zero samples")]
    EmptyInput,

    /// Returned when two parallel sequences differ in length.
    #[error("length mismatch: expected {left} values, got {right}")]
    LengthMismatch {
        /// Length of the reference sequence (usually the true labels).
        left: usize,
        /// Length of the sequence that disagrees with it.
        right: usize,
    },

    /// Returned when a label or prediction is outside {0, 1}.
    #[error("value {value} at index {index} is not a binary label")]
    NonBinaryLabel {
        /// Zero-based position of the offending value.
        index: usize,
        /// The offending value.
        value: usize,
    },

    /// Returned when the training matrix has zero feature columns.
    #[error("training data has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a prediction input has the wrong number of features.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when the fitted tree has no internal split to read a cutoff from.
    #[error("decision tree has no decision boundary (root is a leaf)")]
    NoDecisionBoundary,

    /// Returned when a cutoff is requested from a tree with more than one split.
    #[error("decision tree is not a stump: it has {n_splits} splits")]
    NotAStump {
        /// Number of internal split nodes in the tree.
        n_splits: usize,
    },

    /// Returned when the holdout fraction is not in (0.0, 1.0).
    #[error("test_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTestFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when a partition would leave the train or test side empty.
    #[error("{n_samples} samples cannot be split into non-empty train and test sets with test_fraction {fraction}")]
    TooFewSamplesForSplit {
        /// Number of samples to partition.
        n_samples: usize,
        /// The requested holdout fraction.
        fraction: f64,
    },

    /// Returned when a candidate feature name is not part of the dataset.
    #[error("unknown feature \"{name}\"")]
    UnknownFeature {
        /// The name that could not be resolved.
        name: String,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when the depth search range is empty or starts at zero.
    #[error("invalid depth range {min_depth}..={max_depth}")]
    InvalidDepthRange {
        /// Smallest depth to evaluate.
        min_depth: usize,
        /// Largest depth to evaluate.
        max_depth: usize,
    },

    /// Returned when a class has fewer samples than the number of folds.
    #[error("class {class} has only {count} samples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        /// The class label with insufficient samples.
        class: usize,
        /// The number of samples belonging to that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when a variance threshold is negative or NaN.
    #[error("variance threshold must be a non-negative number, got {threshold}")]
    InvalidVarianceThreshold {
        /// The invalid threshold provided.
        threshold: f64,
    },

    /// Returned when a computation needs both classes but one is absent.
    #[error("class {class} has no samples")]
    MissingClass {
        /// The absent class label.
        class: usize,
    },
}
