//! Generate stage: `qualified` → `generated`.
//!
//! Unlike rank, the success path does not commit through `job_repo`:
//! creating the Application and flipping the Job must be one
//! transaction, so it goes through `application_repo::insert_for_job`.
//! The rest of the loop (claim, deadline, failure and race handling)
//! mirrors the generic runner.

use std::time::Instant;

use tracing::info_span;

use crate::db::application_repo::{self, NewApplication};
use crate::db::job_repo::{self, JobUpdate};
use crate::db::{Database, DatabaseError, JobStatus};
use crate::generate::{DocumentGenerator, Renderer};

use super::StageReport;

pub struct GenerateOptions<'a> {
    pub renderer: Option<&'a dyn Renderer>,
    pub limit: u64,
    pub deadline: Option<Instant>,
}

pub fn run_generate(
    db: &Database,
    generator: &dyn DocumentGenerator,
    options: &GenerateOptions<'_>,
) -> Result<StageReport, DatabaseError> {
    let claimed = job_repo::claim_batch(
        db,
        JobStatus::Qualified,
        options.limit,
        JobStatus::Generating,
    )?;
    let mut report = StageReport {
        claimed: claimed.len() as u64,
        ..StageReport::default()
    };

    if claimed.is_empty() {
        log::debug!("Stage 'generate': nothing to claim");
        return Ok(report);
    }

    log::info!("Stage 'generate': claimed {} records", report.claimed);

    for (index, job) in claimed.iter().enumerate() {
        if let Some(deadline) = options.deadline {
            if Instant::now() >= deadline {
                let remaining: Vec<String> =
                    claimed[index..].iter().map(|j| j.id.clone()).collect();
                report.released = job_repo::release_claims(
                    db,
                    &remaining,
                    JobStatus::Generating,
                    JobStatus::Qualified,
                )?;
                log::warn!(
                    "Stage 'generate': deadline hit, released {} unprocessed records",
                    report.released
                );
                break;
            }
        }

        let span = info_span!("stage", name = "generate", job_id = %job.id);
        let _enter = span.enter();

        let outcome = generate_one(db, generator, options, job);
        match outcome {
            Ok(Outcome::Generated) => report.succeeded += 1,
            Ok(Outcome::RaceLoss) => {
                tracing::debug!("lost commit race, skipping");
                report.race_losses += 1;
            }
            Ok(Outcome::Failed(message)) => {
                tracing::warn!(error = %message, "record failed, moving to error");
                let update = JobUpdate::error(message);
                if job_repo::commit(db, &job.id, JobStatus::Generating, &update)? {
                    report.failed += 1;
                } else {
                    report.race_losses += 1;
                }
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "Stage 'generate' done: {} ok, {} failed, {} race losses, {} released",
        report.succeeded,
        report.failed,
        report.race_losses,
        report.released
    );

    Ok(report)
}

enum Outcome {
    Generated,
    RaceLoss,
    Failed(String),
}

fn generate_one(
    db: &Database,
    generator: &dyn DocumentGenerator,
    options: &GenerateOptions<'_>,
    job: &job_repo::JobRow,
) -> Result<Outcome, DatabaseError> {
    let documents = match generator.generate(job) {
        Ok(documents) => documents,
        Err(e) => return Ok(Outcome::Failed(e.to_string())),
    };

    let files = match options.renderer {
        Some(renderer) => match renderer.render(job, &documents) {
            Ok(files) => files,
            Err(e) => return Ok(Outcome::Failed(e.to_string())),
        },
        None => Default::default(),
    };

    let new = NewApplication {
        resume_content: Some(documents.resume),
        cover_letter_content: Some(documents.cover_letter),
        resume_path: files.resume_path.map(|p| p.display().to_string()),
        cover_letter_path: files.cover_letter_path.map(|p| p.display().to_string()),
    };

    match application_repo::insert_for_job(db, &job.id, &new, JobStatus::Generating) {
        Ok(Some(_)) => {
            tracing::info!("generated application documents");
            Ok(Outcome::Generated)
        }
        Ok(None) => Ok(Outcome::RaceLoss),
        // An active application already exists for this job; the
        // record is inconsistent and goes to error for an operator.
        Err(DatabaseError::Conflict { .. }) => Ok(Outcome::Failed(
            "an active application already exists for this job".to_string(),
        )),
        Err(e) => Err(e),
    }
}
