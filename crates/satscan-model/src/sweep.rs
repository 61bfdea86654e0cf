//! Single-feature sweep: one stump per candidate feature, ranked by holdout ROC-AUC.

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    ModelError,
    node::FeatureIndex,
    partition::{DEFAULT_TEST_FRACTION, Partition, TrainTestSplit, gather},
    report::{MetricReport, report},
    split::{ClassWeight, SplitCriterion},
    tree::{DecisionTree, DecisionTreeConfig},
};

/// Configuration for a single-feature sweep.
///
/// Class weighting is always [`ClassWeight::Balanced`]: without it a stump on
/// imbalanced labels collapses to the majority class.
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `max_depth`     | 1       |
/// | `test_fraction` | 0.25    |
/// | `seed`          | 42      |
/// | `criterion`     | `Gini`  |
#[derive(Debug, Clone)]
pub struct SweepConfig {
    max_depth: usize,
    test_fraction: f64,
    seed: u64,
    criterion: SplitCriterion,
}

/// One evaluated candidate feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    /// Candidate feature name.
    pub feature: String,
    /// Holdout metrics of the feature's boundary.
    #[serde(flatten)]
    pub metrics: MetricReport,
    /// Threshold of the stump's single split; `None` when the boundary has
    /// no split or more than one.
    pub cutoff: Option<f64>,
}

/// Sweep rows ordered by descending ROC-AUC, undefined scores last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SweepTable {
    rows: Vec<SweepRow>,
}

/// A boundary fitted during the sweep, in candidate order.
#[derive(Debug, Clone)]
pub struct FittedFeature {
    /// Candidate feature name.
    pub feature: String,
    /// Column of the feature in the input matrix.
    pub index: FeatureIndex,
    /// The single-feature tree trained on the training partition.
    pub tree: DecisionTree,
}

/// Output of [`SweepConfig::run`].
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// Ranked per-feature results.
    pub table: SweepTable,
    /// Fitted boundaries for the candidates that trained successfully.
    pub fitted: Vec<FittedFeature>,
    /// The train/holdout partition shared by every candidate.
    pub partition: Partition,
}

impl SweepConfig {
    /// Create a sweep config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: 1,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: 42,
            criterion: SplitCriterion::Gini,
        }
    }

    /// Set the maximum depth of each per-feature tree.
    ///
    /// Cutoffs are only defined for depth-1 boundaries; deeper trees report
    /// `cutoff = None` whenever they split more than once.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the holdout fraction.
    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Set the partition seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the split criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Return the maximum depth of each per-feature tree.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the holdout fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the partition seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run the sweep over `candidates`.
    ///
    /// `columns` is column-major (`columns[feature][sample]`) and parallel to
    /// `feature_names`. The partition is drawn once from `seed` and shared by
    /// every candidate. Each candidate is fitted and scored independently on
    /// the rayon pool; a candidate that fails to train yields a row with every
    /// field `None` instead of aborting the sweep.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::InvalidMaxDepth`] | `max_depth` is 0 |
    /// | [`ModelError::InvalidTestFraction`] | `test_fraction` not in (0, 1) |
    /// | [`ModelError::EmptyInput`] | Zero samples |
    /// | [`ModelError::LengthMismatch`] | `columns`/`feature_names`, or a column and `labels`, differ in length |
    /// | [`ModelError::NonBinaryLabel`] | A label is not 0 or 1 |
    /// | [`ModelError::UnknownFeature`] | A candidate is not in `feature_names` |
    /// | [`ModelError::TooFewSamplesForSplit`] | The partition would leave a side empty |
    #[instrument(skip_all, fields(n_candidates = candidates.len(), seed = self.seed, max_depth = self.max_depth))]
    pub fn run(
        &self,
        columns: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        candidates: &[String],
    ) -> Result<SweepResult, ModelError> {
        if self.max_depth == 0 {
            return Err(ModelError::InvalidMaxDepth { max_depth: 0 });
        }
        let splitter = TrainTestSplit::new(self.test_fraction)?.with_seed(self.seed);
        if labels.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if columns.len() != feature_names.len() {
            return Err(ModelError::LengthMismatch {
                left: feature_names.len(),
                right: columns.len(),
            });
        }
        if let Some(bad) = columns.iter().find(|c| c.len() != labels.len()) {
            return Err(ModelError::LengthMismatch {
                left: labels.len(),
                right: bad.len(),
            });
        }
        crate::confusion::check_binary(labels)?;

        let lookup: HashMap<&str, usize> = feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let resolved = candidates
            .iter()
            .map(|name| {
                lookup
                    .get(name.as_str())
                    .map(|&i| (name, FeatureIndex::new(i)))
                    .ok_or_else(|| ModelError::UnknownFeature { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let partition = splitter.split(labels.len())?;
        let train_labels = gather(labels, &partition.train);
        let test_labels = gather(labels, &partition.test);
        let tree_config = DecisionTreeConfig::new()
            .with_criterion(self.criterion)
            .with_class_weight(ClassWeight::Balanced)
            .with_max_depth(Some(self.max_depth));

        let evaluated: Vec<(SweepRow, Option<FittedFeature>)> = resolved
            .par_iter()
            .map(|&(name, index)| {
                let column = &columns[index.index()];
                match evaluate_feature(
                    &tree_config,
                    column,
                    &partition,
                    &train_labels,
                    &test_labels,
                ) {
                    Ok((metrics, tree)) => {
                        let cutoff = match tree.cutoff() {
                            Ok(cutoff) => Some(cutoff),
                            Err(e) => {
                                debug!(feature = %name, reason = %e, "no cutoff");
                                None
                            }
                        };
                        let row = SweepRow {
                            feature: name.clone(),
                            metrics,
                            cutoff,
                        };
                        let fitted = FittedFeature {
                            feature: name.clone(),
                            index,
                            tree,
                        };
                        (row, Some(fitted))
                    }
                    Err(e) => {
                        warn!(feature = %name, error = %e, "feature skipped");
                        let row = SweepRow {
                            feature: name.clone(),
                            metrics: MetricReport::UNDEFINED,
                            cutoff: None,
                        };
                        (row, None)
                    }
                }
            })
            .collect();

        let (rows, fitted): (Vec<SweepRow>, Vec<Option<FittedFeature>>) =
            evaluated.into_iter().unzip();
        let table = SweepTable::ranked(rows);
        let fitted: Vec<FittedFeature> = fitted.into_iter().flatten().collect();

        info!(
            n_rows = table.len(),
            n_fitted = fitted.len(),
            best = table.rows().first().map(|r| r.feature.as_str()),
            "sweep complete"
        );

        Ok(SweepResult {
            table,
            fitted,
            partition,
        })
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fit one feature on the training side and score it on the holdout side.
fn evaluate_feature(
    config: &DecisionTreeConfig,
    column: &[f64],
    partition: &Partition,
    train_labels: &[usize],
    test_labels: &[usize],
) -> Result<(MetricReport, DecisionTree), ModelError> {
    let train = [gather(column, &partition.train)];
    let test = [gather(column, &partition.test)];
    let tree = config.fit_columns(&train, train_labels)?;
    let predictions = tree.predict_columns(&test)?;
    let metrics = report(test_labels, &predictions)?;
    Ok((metrics, tree))
}

impl SweepTable {
    /// Stable-sort `rows` by ROC-AUC descending; undefined scores go last and
    /// ties keep their input order.
    #[must_use]
    pub fn ranked(mut rows: Vec<SweepRow>) -> Self {
        rows.sort_by(|a, b| match (a.metrics.roc_auc, b.metrics.roc_auc) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Self { rows }
    }

    /// Return the ranked rows.
    #[must_use]
    pub fn rows(&self) -> &[SweepRow] {
        &self.rows
    }

    /// Return at most the first `n` rows.
    #[must_use]
    pub fn top(&self, n: usize) -> &[SweepRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Look up the row for a feature by name.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&SweepRow> {
        self.rows.iter().find(|r| r.feature == feature)
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
