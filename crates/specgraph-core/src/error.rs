//! Error types for spec loading.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading spec files from disk.
///
/// Individual malformed records are not errors; they are reported as
/// [`crate::RejectedRecord`]s and loading continues.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: `{key}` must be an array of records")]
    InvalidCollection { path: PathBuf, key: &'static str },
}

pub type Result<T> = std::result::Result<T, SpecError>;
