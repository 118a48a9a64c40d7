//! Error type for the batch input boundary.
//!
//! Stage-level failures inside the pipeline are data (sentinel values plus
//! entries in the row's error list), never `Err`; this type only covers the
//! top-level input-validation case where the whole batch is rejected before
//! any row runs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("input table has no data rows")]
    EmptyInput,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
