//! Binary-classification evaluation for tabular customer data.
//!
//! Provides a class-weighted CART decision tree, the sensitivity /
//! specificity / ROC-AUC reporter, cutoff extraction from stumps, a seeded
//! single-feature sweep ranked by holdout ROC-AUC, and a depth search with
//! stratified k-fold cross-validation. Supporting utilities cover variance
//! filtering, importance ranking, cumulative class distributions and
//! descriptive statistics.

mod confusion;
mod cumulative;
mod cutoff;
mod describe;
mod error;
mod importance;
mod node;
mod partition;
mod report;
mod search;
mod split;
mod sweep;
mod tree;
mod variance;

pub use confusion::ConfusionMatrix;
pub use cumulative::{CumulativePoint, cumulative_distribution};
pub use describe::{ClassBalance, ColumnSummary, describe};
pub use error::ModelError;
pub use importance::{RankedFeature, rank_importances};
pub use node::{FeatureIndex, Impurity, N_CLASSES, Node, NodeIndex};
pub use partition::{DEFAULT_TEST_FRACTION, Partition, TrainTestSplit};
pub use report::{MetricReport, report, roc_auc, sensitivity_score, specificity_score};
pub use search::{DepthScore, DepthSearch, DepthSearchResult};
pub use split::{ClassWeight, SplitCriterion};
pub use sweep::{FittedFeature, SweepConfig, SweepResult, SweepRow, SweepTable};
pub use tree::{DecisionTree, DecisionTreeConfig};
pub use variance::{VarianceSelection, VarianceThreshold, population_variance};
