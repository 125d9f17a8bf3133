//! Ingest stage: pulls job drafts from a source into the store.
//!
//! Ingest is not a claim-based stage; it has no input status. Every
//! draft is upserted by `external_id`, so running it twice with the
//! same source is harmless and re-ingesting a posting that already
//! progressed past `scraped` only refreshes its content fields.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::db::job_repo::{self, JobDraft};
use crate::db::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read input {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input: {0}")]
    Format(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Supplies job drafts from somewhere upstream.
pub trait IngestSource {
    fn fetch(&self) -> Result<Vec<JobDraft>, IngestError>;
}

/// Reads drafts from a JSON file holding an array of draft objects.
/// The reference source; a scraper client would implement
/// `IngestSource` the same way.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IngestSource for JsonFileSource {
    fn fetch(&self) -> Result<Vec<JobDraft>, IngestError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| IngestError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Counters for one ingest run. `fetched` may exceed
/// `inserted + updated` when the source returns duplicate
/// external ids; later duplicates win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: u64,
    pub inserted: u64,
    pub updated: u64,
}

/// Fetches from the source and upserts every draft.
pub fn run_ingest(db: &Database, source: &dyn IngestSource) -> Result<IngestReport, IngestError> {
    let drafts = source.fetch()?;
    let mut report = IngestReport {
        fetched: drafts.len() as u64,
        ..IngestReport::default()
    };

    for draft in &drafts {
        let span = tracing::info_span!("ingest", external_id = %draft.external_id);
        let _enter = span.enter();

        let (_, inserted) = job_repo::upsert_by_external_id(db, draft)?;
        if inserted {
            report.inserted += 1;
        } else {
            report.updated += 1;
        }
    }

    log::info!(
        "Ingest done: {} fetched, {} inserted, {} updated",
        report.fetched,
        report.inserted,
        report.updated
    );

    Ok(report)
}

/// Convenience wrapper for the JSON-file source.
pub fn run_ingest_file(db: &Database, path: &Path) -> Result<IngestReport, IngestError> {
    run_ingest(db, &JsonFileSource::new(path))
}
