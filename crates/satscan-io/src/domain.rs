//! Domain types for satscan-io.

use std::collections::HashMap;

use satscan_model::{
    ClassBalance, ColumnSummary, FeatureIndex, VarianceThreshold, describe,
};
use serde::Serialize;

use crate::IoError;

/// A customer identifier.
///
/// Wraps the non-empty cell of the identifier column. Identifiers are
/// carried through to the submission file but never used as a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomerId(String);

impl CustomerId {
    /// Create a new customer ID from a non-empty string.
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "customer ID must not be empty");
        Self(id)
    }

    /// Return the customer ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the identifier as a number, if it is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered feature names with a name → column lookup, built once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    names: Vec<String>,
    lookup: HashMap<String, FeatureIndex>,
}

impl Schema {
    /// Build a schema from unique, ordered feature names.
    pub(crate) fn new(names: Vec<String>) -> Self {
        let lookup = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), FeatureIndex::new(i)))
            .collect();
        Self { names, lookup }
    }

    /// Return the feature names in column order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` if the schema has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up the column of a feature.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<FeatureIndex> {
        self.lookup.get(name).copied()
    }

    /// Resolve every name to its column, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownFeature`] for the first name not in the schema.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<FeatureIndex>, IoError> {
        names
            .iter()
            .map(|name| {
                self.index_of(name)
                    .ok_or_else(|| IoError::UnknownFeature { name: name.clone() })
            })
            .collect()
    }
}

/// Training data: identifiers, binary labels and column-major features.
///
/// Produced by [`CustomerReader::read_labeled`](crate::CustomerReader::read_labeled).
/// `ids[i]`, `labels[i]` and `columns[f][i]` describe the same customer.
#[derive(Debug)]
pub struct LabeledDataset {
    ids: Vec<CustomerId>,
    schema: Schema,
    columns: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

/// Features without labels, e.g. the customers to predict for a submission.
///
/// Produced by [`CustomerReader::read_unlabeled`](crate::CustomerReader::read_unlabeled).
#[derive(Debug)]
pub struct UnlabeledDataset {
    ids: Vec<CustomerId>,
    schema: Schema,
    columns: Vec<Vec<f64>>,
}

/// Shape, identifier statistics, class balance and constant columns of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    /// Number of data rows.
    pub n_rows: usize,
    /// Number of feature columns.
    pub n_features: usize,
    /// Statistics of the identifier column when every identifier is numeric.
    pub id: Option<ColumnSummary>,
    /// Label counts.
    pub class_balance: ClassBalance,
    /// Features with zero variance.
    pub constant_features: Vec<String>,
}

fn select_columns(
    schema: &Schema,
    columns: &[Vec<f64>],
    names: &[String],
) -> Result<Vec<Vec<f64>>, IoError> {
    Ok(schema
        .resolve(names)?
        .into_iter()
        .map(|idx| columns[idx.index()].clone())
        .collect())
}

impl LabeledDataset {
    pub(crate) fn new(
        ids: Vec<CustomerId>,
        schema: Schema,
        columns: Vec<Vec<f64>>,
        labels: Vec<usize>,
    ) -> Self {
        Self {
            ids,
            schema,
            columns,
            labels,
        }
    }

    /// Return the customer IDs in file order.
    #[must_use]
    pub fn ids(&self) -> &[CustomerId] {
        &self.ids
    }

    /// Return the feature schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the feature names in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        self.schema.names()
    }

    /// Return the feature matrix (column-major).
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Return one feature column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.schema
            .index_of(name)
            .map(|idx| self.columns[idx.index()].as_slice())
    }

    /// Copy the named columns, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownFeature`] if a name is not in the schema.
    pub fn select(&self, names: &[String]) -> Result<Vec<Vec<f64>>, IoError> {
        select_columns(&self.schema, &self.columns, names)
    }

    /// Return the binary labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.schema.len()
    }

    /// Compute the dataset summary.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Model`] if a statistic cannot be computed.
    pub fn summary(&self) -> Result<DatasetSummary, IoError> {
        let numeric_ids: Option<Vec<f64>> = self.ids.iter().map(CustomerId::as_f64).collect();
        let id = numeric_ids.map(|v| describe(&v)).transpose()?;
        let selection = VarianceThreshold::default().select(&self.columns);
        let constant_features = selection
            .dropped()
            .into_iter()
            .map(|i| self.schema.names()[i].clone())
            .collect();
        Ok(DatasetSummary {
            n_rows: self.n_samples(),
            n_features: self.n_features(),
            id,
            class_balance: ClassBalance::from_labels(&self.labels)?,
            constant_features,
        })
    }
}

impl UnlabeledDataset {
    pub(crate) fn new(ids: Vec<CustomerId>, schema: Schema, columns: Vec<Vec<f64>>) -> Self {
        Self {
            ids,
            schema,
            columns,
        }
    }

    /// Return the customer IDs in file order.
    #[must_use]
    pub fn ids(&self) -> &[CustomerId] {
        &self.ids
    }

    /// Return the feature schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the feature matrix (column-major).
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Copy the named columns, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownFeature`] if a name is not in the schema.
    pub fn select(&self, names: &[String]) -> Result<Vec<Vec<f64>>, IoError> {
        select_columns(&self.schema, &self.columns, names)
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }
}
