use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Pipeline settings, loaded from YAML. Every field has a default so
/// an empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Database file. Defaults to `~/.huntsman/data/huntsman.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Scoring template file.
    #[serde(default = "default_templates_path")]
    pub templates_path: PathBuf,

    /// Applicant profile for document generation.
    #[serde(default = "default_profile_path")]
    pub profile_path: PathBuf,

    /// Directory for rendered document artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Language the matcher expects descriptions in.
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Batch size per rank run.
    #[serde(default = "default_rank_limit")]
    pub rank_limit: u64,

    /// Batch size per generate run.
    #[serde(default = "default_generate_limit")]
    pub generate_limit: u64,

    /// Claims older than this are considered abandoned.
    #[serde(default = "default_stale_claim_timeout_secs")]
    pub stale_claim_timeout_secs: u64,

    /// Per-stage wall-clock budget. 0 means unlimited.
    #[serde(default)]
    pub stage_time_budget_secs: u64,

    /// Sleep between cycles in daemon mode.
    #[serde(default = "default_daemon_interval_secs")]
    pub daemon_interval_secs: u64,

    /// Skip file rendering; documents are only stored in the database.
    #[serde(default)]
    pub skip_rendering: bool,
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("templates.yaml")
}

fn default_profile_path() -> PathBuf {
    PathBuf::from("profile.yaml")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_rank_limit() -> u64 {
    100
}

fn default_generate_limit() -> u64 {
    10
}

fn default_stale_claim_timeout_secs() -> u64 {
    900
}

fn default_daemon_interval_secs() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            templates_path: default_templates_path(),
            profile_path: default_profile_path(),
            output_dir: default_output_dir(),
            target_language: default_target_language(),
            rank_limit: default_rank_limit(),
            generate_limit: default_generate_limit(),
            stale_claim_timeout_secs: default_stale_claim_timeout_secs(),
            stage_time_budget_secs: 0,
            daemon_interval_secs: default_daemon_interval_secs(),
            skip_rendering: false,
        }
    }
}
