//! Rank stage: `scraped` → `qualified` / `disqualified`.
//!
//! Optionally translates the description first (the matcher wants the
//! target language), scores it against every template, and commits the
//! verdict together with the score, the matched keyword sets and the
//! translation in one write.

use std::time::Instant;

use crate::db::job_repo::JobUpdate;
use crate::db::{now_timestamp, Database, DatabaseError, JobStatus};
use crate::scoring::TemplateMatcher;
use crate::translate::{translate_if_needed, Translator};

use super::{run_stage, StageReport, StageSpec};

pub struct RankOptions<'a> {
    pub translator: Option<&'a dyn Translator>,
    pub target_language: &'a str,
    pub limit: u64,
    pub deadline: Option<Instant>,
}

pub fn run_rank(
    db: &Database,
    matcher: &TemplateMatcher,
    options: &RankOptions<'_>,
) -> Result<StageReport, DatabaseError> {
    let spec = StageSpec {
        name: "rank",
        input_status: JobStatus::Scraped,
        claim_status: JobStatus::Ranking,
        failure_status: JobStatus::Error,
        claim_limit: options.limit,
        deadline: options.deadline,
    };

    run_stage(db, &spec, |job| {
        // A translation persisted by an earlier run is reused as-is;
        // only untranslated records go through the adapter.
        let (description, translated) = if job.description_translated.is_some() {
            (job.matching_description().to_string(), false)
        } else {
            match options.translator {
                Some(translator) => {
                    translate_if_needed(translator, &job.description, options.target_language)
                }
                None => (job.description.clone(), false),
            }
        };

        let result = matcher.score_best(&job.title, &description);
        tracing::info!(
            score = result.total,
            template = %result.template_name,
            passed = result.passed,
            "ranked"
        );

        let status = if result.passed {
            JobStatus::Qualified
        } else {
            JobStatus::Disqualified
        };

        Ok(JobUpdate {
            status: Some(status),
            score: Some(result.total),
            matched_triggers: Some(result.matched_triggers.into_iter().collect()),
            matched_support: Some(result.matched_support.into_iter().collect()),
            ranked_at: Some(now_timestamp()),
            description_translated: translated.then_some(description),
            ..JobUpdate::default()
        })
    })
}
