//! Ranking of a fitted tree's nonzero feature importances.

use serde::Serialize;

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score.
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Pair importances with names, drop the zero ones, sort descending, and
/// assign 1-based ranks.
///
/// Equal importances keep their column order. Extra entries in either slice
/// beyond the shorter one are ignored.
#[must_use]
pub fn rank_importances(importances: &[f64], names: &[String]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(importances)
        .filter(|&(_, &importance)| importance > 0.0)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}
