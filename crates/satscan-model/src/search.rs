//! Depth search: stratified k-fold cross-validation over a range of tree depths.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    ModelError,
    node::N_CLASSES,
    partition::gather,
    report::{MetricReport, report},
    split::{ClassWeight, SplitCriterion},
    tree::{DecisionTree, DecisionTreeConfig},
};

/// Grid search over `max_depth` with class-balanced trees.
///
/// Construct via [`DepthSearch::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter   | Default |
/// |-------------|---------|
/// | `n_folds`   | 5       |
/// | `seed`      | 42      |
/// | `criterion` | `Gini`  |
#[derive(Debug, Clone)]
pub struct DepthSearch {
    min_depth: usize,
    max_depth: usize,
    n_folds: usize,
    seed: u64,
    criterion: SplitCriterion,
}

/// Cross-validated metrics for one candidate depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthScore {
    /// The candidate `max_depth`.
    pub max_depth: usize,
    /// Field-wise mean of the fold reports.
    pub mean: MetricReport,
    /// One report per fold, in fold order.
    pub folds: Vec<MetricReport>,
}

/// Output of [`DepthSearch::run`].
#[derive(Debug, Clone, Serialize)]
pub struct DepthSearchResult {
    /// Scores for every candidate depth, ascending by depth.
    pub scores: Vec<DepthScore>,
    /// The depth with the highest mean ROC-AUC.
    pub best_depth: usize,
    /// Number of folds used.
    pub n_folds: usize,
    /// Tree refitted on all samples at `best_depth`.
    #[serde(skip)]
    pub tree: DecisionTree,
}

impl DepthSearchResult {
    /// Return the scores ordered by mean ROC-AUC descending, shallower first on ties.
    #[must_use]
    pub fn ranked(&self) -> Vec<&DepthScore> {
        let mut ranked: Vec<&DepthScore> = self.scores.iter().collect();
        ranked.sort_by(|a, b| {
            let a_auc = a.mean.roc_auc.unwrap_or(f64::NEG_INFINITY);
            let b_auc = b.mean.roc_auc.unwrap_or(f64::NEG_INFINITY);
            b_auc.total_cmp(&a_auc).then(a.max_depth.cmp(&b.max_depth))
        });
        ranked
    }

    /// Return the score of the selected depth.
    #[must_use]
    pub fn best(&self) -> Option<&DepthScore> {
        self.scores.iter().find(|s| s.max_depth == self.best_depth)
    }
}

impl DepthSearch {
    /// Create a search over `min_depth..=max_depth`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidDepthRange`] if `min_depth` is 0 or
    /// `min_depth > max_depth`.
    pub fn new(min_depth: usize, max_depth: usize) -> Result<Self, ModelError> {
        if min_depth == 0 || min_depth > max_depth {
            return Err(ModelError::InvalidDepthRange {
                min_depth,
                max_depth,
            });
        }
        Ok(Self {
            min_depth,
            max_depth,
            n_folds: 5,
            seed: 42,
            criterion: SplitCriterion::Gini,
        })
    }

    /// Set the number of cross-validation folds.
    #[must_use]
    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Set the random seed for fold shuffling.
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

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Evaluate every depth with stratified k-fold CV and refit the best one.
    ///
    /// Each fold is scored with [`report`] on hard predictions. Depths are
    /// evaluated in parallel; the fold assignment is drawn once and shared.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::InvalidFoldCount`] | `n_folds` < 2 |
    /// | [`ModelError::EmptyInput`] | Zero samples |
    /// | [`ModelError::LengthMismatch`] | A column and `labels` differ in length |
    /// | [`ModelError::NonBinaryLabel`] | A label is not 0 or 1 |
    /// | [`ModelError::TooFewSamplesForFolds`] | A present class has fewer samples than folds |
    /// | Other model errors | From tree training |
    #[instrument(skip_all, fields(
        min_depth = self.min_depth,
        max_depth = self.max_depth,
        n_folds = self.n_folds,
        n_samples = labels.len(),
    ))]
    pub fn run(&self, columns: &[Vec<f64>], labels: &[usize]) -> Result<DepthSearchResult, ModelError> {
        if self.n_folds < 2 {
            return Err(ModelError::InvalidFoldCount {
                n_folds: self.n_folds,
            });
        }
        if labels.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if let Some(bad) = columns.iter().find(|c| c.len() != labels.len()) {
            return Err(ModelError::LengthMismatch {
                left: labels.len(),
                right: bad.len(),
            });
        }
        crate::confusion::check_binary(labels)?;

        let fold_assignments = self.stratified_folds(labels)?;
        let folds: Vec<(Vec<usize>, Vec<usize>)> = (0..self.n_folds)
            .map(|fold| {
                (0..labels.len()).partition(|&i| fold_assignments[i] != fold)
            })
            .collect();

        let scores = (self.min_depth..=self.max_depth)
            .into_par_iter()
            .map(|depth| self.score_depth(depth, columns, labels, &folds))
            .collect::<Result<Vec<_>, _>>()?;

        let best_depth = scores
            .iter()
            .fold(None::<&DepthScore>, |best, s| match best {
                Some(b)
                    if s.mean.roc_auc.unwrap_or(f64::NEG_INFINITY)
                        <= b.mean.roc_auc.unwrap_or(f64::NEG_INFINITY) =>
                {
                    Some(b)
                }
                _ => Some(s),
            })
            .map_or(self.min_depth, |s| s.max_depth);

        let tree = self.tree_config(best_depth).fit_columns(columns, labels)?;

        info!(
            best_depth,
            roc_auc = ?scores.iter().find(|s| s.max_depth == best_depth).and_then(|s| s.mean.roc_auc),
            "depth search complete"
        );

        Ok(DepthSearchResult {
            scores,
            best_depth,
            n_folds: self.n_folds,
            tree,
        })
    }

    fn tree_config(&self, depth: usize) -> DecisionTreeConfig {
        DecisionTreeConfig::new()
            .with_criterion(self.criterion)
            .with_class_weight(ClassWeight::Balanced)
            .with_max_depth(Some(depth))
    }

    fn score_depth(
        &self,
        depth: usize,
        columns: &[Vec<f64>],
        labels: &[usize],
        folds: &[(Vec<usize>, Vec<usize>)],
    ) -> Result<DepthScore, ModelError> {
        let config = self.tree_config(depth);
        let mut reports = Vec::with_capacity(folds.len());
        for (train, test) in folds {
            let train_columns: Vec<Vec<f64>> = columns.iter().map(|c| gather(c, train)).collect();
            let test_columns: Vec<Vec<f64>> = columns.iter().map(|c| gather(c, test)).collect();
            let tree = config.fit_columns(&train_columns, &gather(labels, train))?;
            let predictions = tree.predict_columns(&test_columns)?;
            reports.push(report(&gather(labels, test), &predictions)?);
        }
        let mean = MetricReport::mean(&reports)?;
        Ok(DepthScore {
            max_depth: depth,
            mean,
            folds: reports,
        })
    }

    /// Create stratified fold assignments.
    ///
    /// Groups samples by class, shuffles within each class, then
    /// round-robins across folds so each fold gets approximately
    /// equal representation of each class.
    fn stratified_folds(&self, labels: &[usize]) -> Result<Vec<usize>, ModelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut class_indices: [Vec<usize>; N_CLASSES] = [Vec::new(), Vec::new()];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[label].push(i);
        }

        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < self.n_folds {
                return Err(ModelError::TooFewSamplesForFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut fold_assignments = vec![0usize; labels.len()];
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for (j, &idx) in indices.iter().enumerate() {
                fold_assignments[idx] = j % self.n_folds;
            }
        }

        Ok(fold_assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Positives sit in two bands of `x`; negatives fill the gaps.
    /// A stump can isolate only one band, depth 2 can isolate both.
    fn banded() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let v = i as f64;
            x.push(v);
            labels.push(usize::from((10..20).contains(&i) || (40..50).contains(&i)));
        }
        (vec![x], labels)
    }

    #[test]
    fn deeper_tree_wins_on_banded_data() {
        let (columns, labels) = banded();
        let result = DepthSearch::new(1, 3)
            .unwrap()
            .with_folds(5)
            .run(&columns, &labels)
            .unwrap();
        assert_eq!(result.scores.len(), 3);
        assert!(result.best_depth >= 2, "best_depth = {}", result.best_depth);
        let ranked = result.ranked();
        assert_eq!(ranked[0].max_depth, result.best_depth);
        assert_eq!(result.tree.predict(&[15.0]).unwrap(), 1);
        assert_eq!(result.tree.predict(&[30.0]).unwrap(), 0);
    }

    #[test]
    fn fold_reports_per_depth() {
        let (columns, labels) = banded();
        let result = DepthSearch::new(2, 2)
            .unwrap()
            .with_folds(4)
            .run(&columns, &labels)
            .unwrap();
        assert_eq!(result.scores[0].folds.len(), 4);
        assert_eq!(result.n_folds, 4);
        assert!(result.best().is_some());
    }

    #[test]
    fn search_is_deterministic() {
        let (columns, labels) = banded();
        let search = DepthSearch::new(1, 4).unwrap().with_seed(9);
        let a = search.run(&columns, &labels).unwrap();
        let b = search.run(&columns, &labels).unwrap();
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.best_depth, b.best_depth);
    }

    #[test]
    fn ties_prefer_shallower_depth() {
        // Perfectly separable: every depth scores 1.0.
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let labels: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let result = DepthSearch::new(2, 5).unwrap().run(&[x], &labels).unwrap();
        assert_eq!(result.best_depth, 2);
    }

    #[test]
    fn short_column_is_length_mismatch() {
        let (_, labels) = banded();
        let short: Vec<f64> = (0..10).map(f64::from).collect();
        let err = DepthSearch::new(1, 2)
            .unwrap()
            .run(&[short], &labels)
            .unwrap_err();
        assert!(matches!(err, ModelError::LengthMismatch { left: 60, right: 10 }));
    }

    #[test]
    fn folds_default_to_five() {
        let search = DepthSearch::new(2, 3).unwrap();
        assert_eq!(search.n_folds(), 5);
        assert_eq!(search.with_folds(3).n_folds(), 3);
    }

    #[test]
    fn invalid_depth_range() {
        assert!(matches!(
            DepthSearch::new(0, 3),
            Err(ModelError::InvalidDepthRange { min_depth: 0, max_depth: 3 })
        ));
        assert!(DepthSearch::new(4, 3).is_err());
    }

    #[test]
    fn invalid_fold_count() {
        let (columns, labels) = banded();
        let err = DepthSearch::new(1, 2)
            .unwrap()
            .with_folds(1)
            .run(&columns, &labels)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidFoldCount { n_folds: 1 }));
    }

    #[test]
    fn too_few_samples_for_folds() {
        let columns = vec![vec![1.0, 2.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 1, 1, 1];
        let err = DepthSearch::new(1, 2)
            .unwrap()
            .run(&columns, &labels)
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::TooFewSamplesForFolds {
                class: 0,
                count: 2,
                n_folds: 5
            }
        ));
    }
}
