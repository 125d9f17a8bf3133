//! Generic stage runner.
//!
//! Every processing stage is the same loop: claim a batch of records
//! in the stage's input status, run a transform on each, and commit
//! the outcome guarded on the claim marker. The runner owns the loop;
//! stages supply a `StageSpec` and a transform closure.
//!
//! Failure handling splits two ways. A transform error is a per-record
//! problem: the record moves to the stage's failure status with the
//! message attached, and the run continues. A `DatabaseError` is an
//! infrastructure problem and aborts the whole run.

use std::time::Instant;

use thiserror::Error;
use tracing::info_span;

use crate::db::job_repo::{self, JobRow, JobUpdate};
use crate::db::{Database, DatabaseError, JobStatus};

pub mod generate;
pub mod ingest;
pub mod rank;

/// A per-record processing failure inside a transform.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Static description of a stage.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: &'static str,
    pub input_status: JobStatus,
    pub claim_status: JobStatus,
    pub failure_status: JobStatus,
    pub claim_limit: u64,
    /// Records not reached by this instant are released back to the
    /// input status instead of processed.
    pub deadline: Option<Instant>,
}

/// Counters for one stage run. `claimed` equals the sum of the other
/// four fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub claimed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub race_losses: u64,
    pub released: u64,
}

/// Claims one batch and drains it through `transform`.
pub fn run_stage<F>(
    db: &Database,
    spec: &StageSpec,
    mut transform: F,
) -> Result<StageReport, DatabaseError>
where
    F: FnMut(&JobRow) -> Result<JobUpdate, TransformError>,
{
    let claimed = job_repo::claim_batch(db, spec.input_status, spec.claim_limit, spec.claim_status)?;
    let mut report = StageReport {
        claimed: claimed.len() as u64,
        ..StageReport::default()
    };

    if claimed.is_empty() {
        log::debug!("Stage '{}': nothing to claim", spec.name);
        return Ok(report);
    }

    log::info!("Stage '{}': claimed {} records", spec.name, report.claimed);

    for (index, job) in claimed.iter().enumerate() {
        if let Some(deadline) = spec.deadline {
            if Instant::now() >= deadline {
                let remaining: Vec<String> =
                    claimed[index..].iter().map(|j| j.id.clone()).collect();
                report.released = job_repo::release_claims(
                    db,
                    &remaining,
                    spec.claim_status,
                    spec.input_status,
                )?;
                log::warn!(
                    "Stage '{}': deadline hit, released {} unprocessed records",
                    spec.name,
                    report.released
                );
                break;
            }
        }

        let span = info_span!("stage", name = spec.name, job_id = %job.id);
        let _enter = span.enter();

        let (update, is_failure) = match transform(job) {
            Ok(update) => (update, false),
            Err(e) => {
                tracing::warn!(error = %e, "record failed, moving to {}", spec.failure_status);
                (
                    JobUpdate {
                        status: Some(spec.failure_status),
                        error_message: Some(e.to_string()),
                        ..JobUpdate::default()
                    },
                    true,
                )
            }
        };

        if job_repo::commit(db, &job.id, spec.claim_status, &update)? {
            if is_failure {
                report.failed += 1;
            } else {
                report.succeeded += 1;
            }
        } else {
            // Another writer moved the record while we worked on it.
            tracing::debug!("lost commit race, skipping");
            report.race_losses += 1;
        }
    }

    log::info!(
        "Stage '{}' done: {} ok, {} failed, {} race losses, {} released",
        spec.name,
        report.succeeded,
        report.failed,
        report.race_losses,
        report.released
    );

    Ok(report)
}
