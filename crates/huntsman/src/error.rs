//! Crate-level error types.
//!
//! Each module carries its own error enum; `HuntsmanError` is the
//! umbrella the pipeline and the CLI work with. Only infrastructure
//! failures surface here — per-record failures are data (status
//! `error` on the record), not errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::generate::GenerateError;
use crate::scoring::ScoringError;
use crate::stage::ingest::IngestError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {message}")]
    Validation { message: String },
}

#[derive(Debug, Error)]
pub enum HuntsmanError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

pub type Result<T> = std::result::Result<T, HuntsmanError>;
