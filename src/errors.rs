use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for loading inputs, writing results and talking to the encyclopedia.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed profession list for legislator '{id}': {source}")]
    ProfessionList {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid reference date '{0}' (expected YYYY-MM-DD)")]
    ReferenceDate(String),
    #[error("population table '{0}' has no usable rows")]
    EmptyPopulation(String),
    #[error("encyclopedia request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
