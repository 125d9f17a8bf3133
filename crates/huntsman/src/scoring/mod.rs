//! Keyword scoring engine.
//!
//! Templates (YAML) describe what a good posting looks like; the
//! matcher turns a title and description into a score and a verdict.
//! Scoring is pure and deterministic: same text and templates, same
//! result, regardless of call order.

use std::path::PathBuf;

use thiserror::Error;

pub mod matcher;
pub mod template;

pub use matcher::{ScoreResult, TemplateMatcher};
pub use template::{ScoringDefaults, ScoringTemplate, TemplateSet};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Failed to read template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid template '{template}': {reason}")]
    Invalid { template: String, reason: String },

    #[error("Keyword pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
