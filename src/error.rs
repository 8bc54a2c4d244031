//! Data errors raised while loading, splitting and plotting the tree table

use std::path::PathBuf;
use thiserror::Error;

/// Faults in the input data or in what the pipeline was asked to do with it
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("dataset not found: {0}")]
    MissingFile(PathBuf),

    #[error("expected column '{0}' is missing from the dataset")]
    MissingColumn(String),

    #[error("height value '{value}' in data row {row} is not a number")]
    UnparseableHeight { row: usize, value: String },

    #[error("cannot plot '{0}': the table has no rows")]
    EmptyTable(&'static str),

    #[error("diameter bucket {bucket} has only one member, it cannot be split")]
    SparseStratum { bucket: u8 },

    #[error("{side} set of {size} rows is smaller than the {buckets} diameter buckets")]
    TooFewRows {
        side: &'static str,
        size: usize,
        buckets: usize,
    },

    #[error("invalid split: {0}")]
    InvalidSplit(String),
}
