//! Shared helpers for huntsman integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use huntsman::config::Settings;
use huntsman::db::job_repo::JobDraft;
use huntsman::db::Database;

pub const TEMPLATES_YAML: &str = r#"
scoring:
  min_score: 30
  min_triggers: 2
templates:
  security:
    trigger_keywords: [siem, incident response, soc]
    support_keywords: [python, linux, splunk]
    negative_keywords: [sales]
"#;

pub const PROFILE_YAML: &str = r#"
name: Jo Example
email: jo@example.com
headline: Security Engineer
summary: Blue-team generalist.
skills: [Python, SIEM]
"#;

pub fn test_db() -> Database {
    Database::open_in_memory().expect("Failed to create test database")
}

pub fn draft(external_id: &str, title: &str, description: &str) -> JobDraft {
    JobDraft {
        external_id: external_id.to_string(),
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Zurich".to_string(),
        description: description.to_string(),
        url: None,
        apply_url: None,
        posted_at: None,
    }
}

/// Writes templates, profile and a drafts file into `dir` and returns
/// settings pointing at them.
pub fn settings_in(dir: &Path) -> Settings {
    std::fs::write(dir.join("templates.yaml"), TEMPLATES_YAML).unwrap();
    std::fs::write(dir.join("profile.yaml"), PROFILE_YAML).unwrap();

    Settings {
        templates_path: dir.join("templates.yaml"),
        profile_path: dir.join("profile.yaml"),
        output_dir: dir.join("output"),
        ..Settings::default()
    }
}

pub fn write_drafts(dir: &Path, drafts: &[JobDraft]) -> PathBuf {
    let path = dir.join("drafts.json");
    std::fs::write(&path, serde_json::to_string(drafts).unwrap()).unwrap();
    path
}
