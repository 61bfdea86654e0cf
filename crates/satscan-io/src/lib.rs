//! File I/O, validation, and serialization for the satscan pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{
    CustomerId, DatasetSummary, ExperimentName, LabeledDataset, Schema, UnlabeledDataset,
};
pub use error::IoError;
pub use reader::CustomerReader;
pub use writer::{ResultWriter, SUBMISSION_LABEL_COLUMN, SweepSettings};
