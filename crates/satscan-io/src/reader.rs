//! CSV customer table reader with full input validation.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{CustomerId, LabeledDataset, Schema, UnlabeledDataset};

/// Reads a customer table from a CSV file.
///
/// Expected CSV format:
/// - Header row required
/// - One identifier column (default `ID`), one binary label column (default
///   `TARGET`, labeled reads only), every other column a numeric feature
/// - Header names are matched case-insensitively; feature names are stored
///   lower-cased
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | Identifier or label column absent from header |
/// | [`IoError::NoFeatureColumns`] | Header has no feature columns |
/// | [`IoError::DuplicateColumn`] | Two headers collide after lower-casing |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptyId`] | Identifier cell is empty |
/// | [`IoError::DuplicateId`] | Same identifier appears twice |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidLabel`] | Label cell is not 0 or 1 |
pub struct CustomerReader {
    path: PathBuf,
    id_column: String,
    label_column: String,
}

/// Raw table contents shared by the labeled and unlabeled reads.
struct Table {
    ids: Vec<CustomerId>,
    schema: Schema,
    columns: Vec<Vec<f64>>,
    labels: Option<Vec<usize>>,
}

impl CustomerReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            id_column: "ID".to_string(),
            label_column: "TARGET".to_string(),
        }
    }

    /// Set the identifier column name (matched case-insensitively).
    #[must_use]
    pub fn with_id_column(mut self, name: impl Into<String>) -> Self {
        self.id_column = name.into();
        self
    }

    /// Set the label column name (matched case-insensitively).
    #[must_use]
    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    /// Read a training table: identifier, label and features.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_labeled(&self) -> Result<LabeledDataset, IoError> {
        let table = self.read_table(true)?;
        let labels = table.labels.unwrap_or_default();
        info!(
            n_samples = table.ids.len(),
            n_features = table.schema.len(),
            n_positive = labels.iter().filter(|&&y| y == 1).count(),
            "labeled dataset loaded"
        );
        Ok(LabeledDataset::new(
            table.ids,
            table.schema,
            table.columns,
            labels,
        ))
    }

    /// Read a table without labels: identifier and features.
    ///
    /// A label column, if present, is treated as a feature.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_unlabeled(&self) -> Result<UnlabeledDataset, IoError> {
        let table = self.read_table(false)?;
        info!(
            n_samples = table.ids.len(),
            n_features = table.schema.len(),
            "unlabeled dataset loaded"
        );
        Ok(UnlabeledDataset::new(table.ids, table.schema, table.columns))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn find_column(&self, header: &csv::StringRecord, name: &str) -> Result<usize, IoError> {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    fn read_table(&self, labeled: bool) -> Result<Table, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) allows rows with varying column counts so that our own
        // InconsistentRowLength check fires instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();

        let id_col = self.find_column(&header, &self.id_column)?;
        let label_col = if labeled {
            Some(self.find_column(&header, &self.label_column)?)
        } else {
            None
        };

        let feature_cols: Vec<usize> = (0..expected_cols)
            .filter(|&c| c != id_col && Some(c) != label_col)
            .collect();
        if feature_cols.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let mut names = Vec::with_capacity(feature_cols.len());
        let mut seen_names: HashSet<String> = HashSet::new();
        for &c in &feature_cols {
            let name = header.get(c).unwrap_or("").trim().to_lowercase();
            if !seen_names.insert(name.clone()) {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    column: name,
                });
            }
            names.push(name);
        }
        debug!(expected_cols, n_features = names.len(), "read CSV header");

        let mut ids = Vec::new();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); feature_cols.len()];
        let mut labels = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    id: record.get(id_col).unwrap_or("").to_string(),
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let id = record.get(id_col).unwrap_or("").trim().to_string();
            if id.is_empty() {
                return Err(IoError::EmptyId {
                    path: self.path.clone(),
                    row_index,
                });
            }
            if let Some(&first_row) = seen.get(&id) {
                return Err(IoError::DuplicateId {
                    path: self.path.clone(),
                    id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(id.clone(), row_index);

            if let Some(label_col) = label_col {
                let raw = record.get(label_col).unwrap_or("").trim();
                labels.push(parse_label(raw).ok_or_else(|| IoError::InvalidLabel {
                    path: self.path.clone(),
                    row_index,
                    raw: raw.to_string(),
                })?);
            }

            for (column, (&c, name)) in columns.iter_mut().zip(feature_cols.iter().zip(&names)) {
                let raw = record.get(c).unwrap_or("").trim();
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: name.clone(),
                        raw: raw.to_string(),
                    })?;
                column.push(value);
            }

            ids.push(CustomerId::new(id));
        }

        if ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        Ok(Table {
            ids,
            schema: Schema::new(names),
            columns,
            labels: label_col.map(|_| labels),
        })
    }
}

/// Accept `0`/`1` written as integers or floats.
fn parse_label(raw: &str) -> Option<usize> {
    match raw.parse::<f64>().ok()? {
        v if v == 0.0 => Some(0),
        v if v == 1.0 => Some(1),
        _ => None,
    }
}
