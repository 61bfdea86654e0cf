//! Seeded train/holdout partition of sample indices.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::debug;

use crate::ModelError;

/// Default holdout share: one test sample for every three training samples.
pub const DEFAULT_TEST_FRACTION: f64 = 0.25;

/// Configuration for a reproducible train/test split.
///
/// # Defaults
///
/// | Parameter | Default |
/// |---|---|
/// | `seed` | 42 |
#[derive(Debug, Clone, Copy)]
pub struct TrainTestSplit {
    test_fraction: f64,
    seed: u64,
}

/// Disjoint train and test index sets covering `0..n_samples`.
///
/// Both sets are sorted ascending, so rows keep their original relative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// Indices of training samples.
    pub train: Vec<usize>,
    /// Indices of holdout samples.
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Create a split that holds out `test_fraction` of the samples.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTestFraction`] unless `0.0 < test_fraction < 1.0`.
    pub fn new(test_fraction: f64) -> Result<Self, ModelError> {
        if test_fraction.is_nan() || test_fraction <= 0.0 || test_fraction >= 1.0 {
            return Err(ModelError::InvalidTestFraction {
                fraction: test_fraction,
            });
        }
        Ok(Self {
            test_fraction,
            seed: 42,
        })
    }

    /// Set the random seed for the shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the holdout fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the shuffle seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Shuffle `0..n_samples` and cut off the first `ceil(n * test_fraction)`
    /// indices as the holdout set.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TooFewSamplesForSplit`] if either side would be empty.
    pub fn split(&self, n_samples: usize) -> Result<Partition, ModelError> {
        let n_test = (n_samples as f64 * self.test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n_samples {
            return Err(ModelError::TooFewSamplesForSplit {
                n_samples,
                fraction: self.test_fraction,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut indices: Vec<usize> = (0..n_samples).collect();
        indices.shuffle(&mut rng);

        let mut test = indices[..n_test].to_vec();
        let mut train = indices[n_test..].to_vec();
        test.sort_unstable();
        train.sort_unstable();

        debug!(n_train = train.len(), n_test = test.len(), seed = self.seed, "partition created");
        Ok(Partition { train, test })
    }
}

impl Default for TrainTestSplit {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: 42,
        }
    }
}

/// Gather `values[i]` for every `i` in `indices`.
pub(crate) fn gather<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_to_one_split() {
        let p = TrainTestSplit::default().split(100).unwrap();
        assert_eq!(p.test.len(), 25);
        assert_eq!(p.train.len(), 75);
    }

    #[test]
    fn disjoint_and_covering() {
        let p = TrainTestSplit::new(0.3).unwrap().with_seed(7).split(41).unwrap();
        let mut all: Vec<usize> = p.train.iter().chain(&p.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..41).collect::<Vec<_>>());
        assert_eq!(p.test.len(), 13);
    }

    #[test]
    fn same_seed_same_partition() {
        let a = TrainTestSplit::default().with_seed(3).split(50).unwrap();
        let b = TrainTestSplit::default().with_seed(3).split(50).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_partition() {
        let a = TrainTestSplit::default().with_seed(1).split(200).unwrap();
        let b = TrainTestSplit::default().with_seed(2).split(200).unwrap();
        assert_ne!(a.test, b.test);
    }

    #[test]
    fn invalid_fraction() {
        for f in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                TrainTestSplit::new(f),
                Err(ModelError::InvalidTestFraction { .. })
            ));
        }
    }

    #[test]
    fn too_few_samples() {
        assert!(matches!(
            TrainTestSplit::default().split(1),
            Err(ModelError::TooFewSamplesForSplit { n_samples: 1, .. })
        ));
        assert!(TrainTestSplit::default().split(0).is_err());
        assert!(TrainTestSplit::default().split(2).is_ok());
    }

    #[test]
    fn gather_picks_in_order() {
        assert_eq!(gather(&[10, 20, 30, 40], &[3, 0]), vec![40, 10]);
    }
}
