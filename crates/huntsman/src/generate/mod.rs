//! Application document generation.
//!
//! `DocumentGenerator` produces resume and cover letter content for a
//! qualified job; `Renderer` turns that content into files on disk.
//! Both are trait seams: the shipped implementations are the
//! deterministic `MarkdownGenerator` and `FileRenderer`, and anything
//! fancier (LLM tailoring, PDF output) plugs in behind the same
//! traits.

use std::path::PathBuf;

use thiserror::Error;

use crate::db::job_repo::JobRow;

pub mod markdown;
pub mod profile;
pub mod renderer;

pub use markdown::MarkdownGenerator;
pub use profile::Profile;
pub use renderer::FileRenderer;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Failed to read profile {path}: {source}")]
    ProfileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse profile: {0}")]
    ProfileFormat(#[from] serde_yaml::Error),

    #[error("Invalid profile: {0}")]
    ProfileInvalid(String),

    #[error("Document generation failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Generated document content for one job.
#[derive(Debug, Clone)]
pub struct Documents {
    pub resume: String,
    pub cover_letter: String,
}

/// File artifacts produced by a renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderedFiles {
    pub resume_path: Option<PathBuf>,
    pub cover_letter_path: Option<PathBuf>,
}

/// Produces application document content for a job.
pub trait DocumentGenerator {
    fn generate(&self, job: &JobRow) -> Result<Documents, GenerateError>;
}

/// Writes document content to artifacts on disk.
pub trait Renderer {
    fn render(&self, job: &JobRow, documents: &Documents) -> Result<RenderedFiles, RenderError>;
}
