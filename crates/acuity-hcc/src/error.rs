use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HccError {
    #[error("HCC reference table not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read HCC reference table: {0}")]
    Csv(#[from] csv::Error),

    #[error("HCC reference table is missing the {0:?} column")]
    MissingColumn(&'static str),
}
