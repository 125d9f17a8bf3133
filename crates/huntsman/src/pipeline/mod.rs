//! Pipeline orchestrator.
//!
//! Owns the database handle, the settings and the adapter seams, and
//! exposes one method per operator-facing operation. Each run is
//! self-contained: stages load their inputs (templates, profile) at
//! the start of the run, so edits to those files take effect on the
//! next run without a restart.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::db::{self, job_repo, Database, JobStatus};
use crate::error::{HuntsmanError, Result};
use crate::generate::{FileRenderer, MarkdownGenerator, Profile, Renderer};
use crate::scoring::{TemplateMatcher, TemplateSet};
use crate::stage::generate::{run_generate, GenerateOptions};
use crate::stage::ingest::{run_ingest_file, IngestReport};
use crate::stage::rank::{run_rank, RankOptions};
use crate::stage::StageReport;
use crate::translate::Translator;

/// Per-run overrides on top of `Settings`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Batch size override for this run.
    pub limit: Option<u64>,
    /// Reset already-processed records back to the stage's input
    /// status before claiming. Off by default; normal runs only touch
    /// the declared input status.
    pub reprocess: bool,
    /// Rank only: translate foreign descriptions when a translator is
    /// wired.
    pub translate: bool,
    /// Generate only: skip file artifacts.
    pub skip_rendering: Option<bool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: None,
            reprocess: false,
            translate: true,
            skip_rendering: None,
        }
    }
}

/// Stale-claim sweep outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub ranking_reset: u64,
    pub generating_reset: u64,
}

/// One full pipeline cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub sweep: SweepReport,
    pub ingest: Option<IngestReport>,
    pub rank: StageReport,
    pub generate: StageReport,
}

pub struct Pipeline {
    db: Database,
    settings: Settings,
    translator: Option<Box<dyn Translator>>,
}

impl Pipeline {
    /// Opens the database from settings and builds the pipeline.
    pub fn new(settings: Settings) -> Result<Self> {
        let path = match &settings.database_path {
            Some(path) => path.clone(),
            None => db::default_database_path().ok_or_else(|| {
                HuntsmanError::Config(crate::error::ConfigError::Validation {
                    message: "cannot determine home directory; set database_path".to_string(),
                })
            })?,
        };
        let db = Database::open(&path)?;
        Ok(Self::with_database(db, settings))
    }

    /// Builds a pipeline on an existing handle. Used by tests with
    /// in-memory databases.
    pub fn with_database(db: Database, settings: Settings) -> Self {
        Self {
            db,
            settings,
            translator: None,
        }
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn deadline(&self) -> Option<Instant> {
        (self.settings.stage_time_budget_secs > 0)
            .then(|| Instant::now() + Duration::from_secs(self.settings.stage_time_budget_secs))
    }

    /// Ingests job drafts from a JSON file.
    pub fn run_scrape(&self, input: &Path) -> Result<IngestReport> {
        Ok(run_ingest_file(&self.db, input)?)
    }

    /// Ranks scraped jobs against the scoring templates.
    pub fn run_rank(&self, options: &RunOptions) -> Result<StageReport> {
        if options.reprocess {
            let reset = job_repo::reset_status(
                &self.db,
                &[
                    JobStatus::Qualified,
                    JobStatus::Disqualified,
                    JobStatus::Error,
                ],
                JobStatus::Scraped,
            )?;
            log::info!("Reprocess: reset {reset} records to scraped");
        }

        let matcher = TemplateMatcher::new(TemplateSet::load(&self.settings.templates_path)?)
            .map_err(HuntsmanError::Scoring)?;

        let translator = options
            .translate
            .then_some(self.translator.as_deref())
            .flatten();

        let report = run_rank(
            &self.db,
            &matcher,
            &RankOptions {
                translator,
                target_language: &self.settings.target_language,
                limit: options.limit.unwrap_or(self.settings.rank_limit),
                deadline: self.deadline(),
            },
        )?;
        Ok(report)
    }

    /// Generates application documents for qualified jobs.
    pub fn run_generate(&self, options: &RunOptions) -> Result<StageReport> {
        if options.reprocess {
            let reset =
                job_repo::reset_status(&self.db, &[JobStatus::Error], JobStatus::Qualified)?;
            log::info!("Reprocess: reset {reset} records to qualified");
        }

        let profile = Profile::load(&self.settings.profile_path)?;
        let generator = MarkdownGenerator::new(profile);

        let skip_rendering = options
            .skip_rendering
            .unwrap_or(self.settings.skip_rendering);
        let renderer = (!skip_rendering).then(|| FileRenderer::new(&self.settings.output_dir));

        let report = run_generate(
            &self.db,
            &generator,
            &GenerateOptions {
                renderer: renderer.as_ref().map(|r| r as &dyn Renderer),
                limit: options.limit.unwrap_or(self.settings.generate_limit),
                deadline: self.deadline(),
            },
        )?;
        Ok(report)
    }

    /// Returns stuck claims to their input statuses.
    pub fn sweep(&self) -> Result<SweepReport> {
        let timeout = self.settings.stale_claim_timeout_secs;
        let report = SweepReport {
            ranking_reset: job_repo::sweep_stale_claims(
                &self.db,
                JobStatus::Ranking,
                JobStatus::Scraped,
                timeout,
            )?,
            generating_reset: job_repo::sweep_stale_claims(
                &self.db,
                JobStatus::Generating,
                JobStatus::Qualified,
                timeout,
            )?,
        };
        if report.ranking_reset > 0 || report.generating_reset > 0 {
            log::warn!(
                "Sweep recovered {} ranking and {} generating claims",
                report.ranking_reset,
                report.generating_reset
            );
        }
        Ok(report)
    }

    /// Resets errored records for the named stage so the next run
    /// picks them up again.
    pub fn reprocess_errors(&self, stage: ReprocessStage) -> Result<u64> {
        let to = match stage {
            ReprocessStage::Rank => JobStatus::Scraped,
            ReprocessStage::Generate => JobStatus::Qualified,
        };
        let reset = job_repo::reset_status(&self.db, &[JobStatus::Error], to)?;
        log::info!("Reset {reset} errored records to {to}");
        Ok(reset)
    }

    /// One full cycle: sweep, optional ingest, rank, generate.
    pub fn run_once(&self, input: Option<&Path>, options: &RunOptions) -> Result<CycleReport> {
        let sweep = self.sweep()?;
        let ingest = match input {
            Some(path) => Some(self.run_scrape(path)?),
            None => None,
        };
        let rank = self.run_rank(options)?;
        let generate = self.run_generate(options)?;
        Ok(CycleReport {
            sweep,
            ingest,
            rank,
            generate,
        })
    }

    /// Record counts per status, for the status report.
    pub fn status_counts(&self) -> Result<Vec<(JobStatus, u64)>> {
        let statuses = [
            JobStatus::Scraped,
            JobStatus::Ranking,
            JobStatus::Qualified,
            JobStatus::Disqualified,
            JobStatus::Generating,
            JobStatus::Generated,
            JobStatus::Applied,
            JobStatus::Rejected,
            JobStatus::Interview,
            JobStatus::Error,
        ];
        statuses
            .into_iter()
            .map(|status| Ok((status, job_repo::count_by_status(&self.db, status)?)))
            .collect()
    }
}

/// Stage selector for error reprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprocessStage {
    Rank,
    Generate,
}
