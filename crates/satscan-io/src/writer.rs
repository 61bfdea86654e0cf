//! JSON and CSV result writers for summaries, sweeps, depth searches and submissions.

use std::fs;
use std::path::{Path, PathBuf};

use satscan_model::{CumulativePoint, DepthScore, DepthSearchResult, RankedFeature, SweepRow, SweepTable};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{CustomerId, DatasetSummary, ExperimentName};

/// Name of the label column in a submission file.
pub const SUBMISSION_LABEL_COLUMN: &str = "TARGET";

/// Writes analysis results to an output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_summary.json`, `{experiment}_sweep.json`,
/// `{experiment}_search.json`, `{experiment}_cumulative.csv` and
/// `{experiment}_submission.csv`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

/// Partition settings recorded alongside a sweep table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SweepSettings {
    /// Seed of the train/holdout shuffle.
    pub seed: u64,
    /// Holdout share.
    pub test_fraction: f64,
    /// Depth limit of each per-feature tree.
    pub max_depth: usize,
    /// Number of training samples.
    pub n_train: usize,
    /// Number of holdout samples.
    pub n_test: usize,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write a dataset summary to `{experiment}_summary.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all)]
    pub fn write_summary(&self, summary: &DatasetSummary) -> Result<PathBuf, IoError> {
        let path = self.path_for("summary.json");
        let artifact = SummaryArtifact {
            experiment: self.experiment.as_str(),
            summary,
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "summary written");
        Ok(path)
    }

    /// Write a ranked sweep table to `{experiment}_sweep.json`.
    ///
    /// Undefined metrics and cutoffs are written as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all, fields(n_rows = table.len()))]
    pub fn write_sweep(&self, table: &SweepTable, settings: SweepSettings) -> Result<PathBuf, IoError> {
        let path = self.path_for("sweep.json");
        let artifact = SweepArtifact {
            experiment: self.experiment.as_str(),
            settings,
            rows: table.rows(),
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "sweep table written");
        Ok(path)
    }

    /// Write a depth search and the final tree's ranked importances to
    /// `{experiment}_search.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all, fields(best_depth = result.best_depth))]
    pub fn write_search(
        &self,
        result: &DepthSearchResult,
        selected_features: &[String],
        importances: &[RankedFeature],
    ) -> Result<PathBuf, IoError> {
        let path = self.path_for("search.json");
        let artifact = SearchArtifact {
            experiment: self.experiment.as_str(),
            best_depth: result.best_depth,
            n_folds: result.n_folds,
            n_selected_features: selected_features.len(),
            scores: &result.scores,
            feature_importances: importances,
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "depth search written");
        Ok(path)
    }

    /// Write a cumulative class distribution to `{experiment}_cumulative.csv`.
    ///
    /// Columns are the feature name, `0` and `1`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::CsvWrite`] if the file cannot be written.
    #[instrument(skip_all, fields(feature = %feature, n_points = points.len()))]
    pub fn write_cumulative(&self, feature: &str, points: &[CumulativePoint]) -> Result<PathBuf, IoError> {
        let path = self.path_for("cumulative.csv");
        let csv_err = |e: csv::Error| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record([feature, "0", "1"]).map_err(csv_err)?;
        for p in points {
            wtr.write_record([
                p.value.to_string(),
                p.class_0.to_string(),
                p.class_1.to_string(),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "cumulative distribution written");
        Ok(path)
    }

    /// Write predictions to `{experiment}_submission.csv`, one row per
    /// identifier in the given order, with header `{id_column},TARGET`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Model`] | `ids` and `predictions` differ in length |
    /// | [`IoError::CsvWrite`] | The file cannot be written |
    #[instrument(skip_all, fields(n_rows = ids.len()))]
    pub fn write_submission(
        &self,
        id_column: &str,
        ids: &[CustomerId],
        predictions: &[usize],
    ) -> Result<PathBuf, IoError> {
        if ids.len() != predictions.len() {
            return Err(satscan_model::ModelError::LengthMismatch {
                left: ids.len(),
                right: predictions.len(),
            }
            .into());
        }
        let path = self.path_for("submission.csv");
        let csv_err = |e: csv::Error| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record([id_column, SUBMISSION_LABEL_COLUMN])
            .map_err(csv_err)?;
        for (id, &prediction) in ids.iter().zip(predictions) {
            let label = prediction.to_string();
            wtr.write_record([id.as_str(), label.as_str()])
                .map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "submission written");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Serialization shadow structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SummaryArtifact<'a> {
    experiment: &'a str,
    #[serde(flatten)]
    summary: &'a DatasetSummary,
}

#[derive(Serialize)]
struct SweepArtifact<'a> {
    experiment: &'a str,
    #[serde(flatten)]
    settings: SweepSettings,
    rows: &'a [SweepRow],
}

#[derive(Serialize)]
struct SearchArtifact<'a> {
    experiment: &'a str,
    best_depth: usize,
    n_folds: usize,
    n_selected_features: usize,
    scores: &'a [DepthScore],
    feature_importances: &'a [RankedFeature],
}
