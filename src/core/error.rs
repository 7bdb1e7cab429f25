use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while decoding or rebuilding a filter tree
#[derive(Debug, Error)]
pub enum FilterTreeError {
    #[error("invalid filter value: {0}")]
    InvalidValue(#[from] serde_json::Error),

    #[error("unexpected {found} at ordinal {ordinal}")]
    UnexpectedToken { ordinal: usize, found: &'static str },

    #[error("parenthesis opened at ordinal {0} is never closed")]
    UnclosedParenthesis(usize),

    #[error("filter expression ended early")]
    UnexpectedEnd,
}

/// Errors raised by cohort files and the cohort store
#[derive(Debug, Error)]
pub enum CohortError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cohort JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown phenotype '{0}'")]
    UnknownPhenotype(String),

    #[error("cohort has no file path; use save as")]
    NoPath,

    #[error("cohort store lock was poisoned")]
    Poisoned,
}
