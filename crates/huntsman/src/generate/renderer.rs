//! File renderer: writes generated documents as markdown artifacts.
//!
//! Output layout: `<output_dir>/<company>_<title>_<job id prefix>/`
//! containing `resume.md` and `cover_letter.md`. Company and title are
//! slugged; the id prefix keeps two postings with the same title from
//! colliding.

use std::path::{Path, PathBuf};

use crate::db::job_repo::JobRow;

use super::{Documents, RenderError, Renderer};

pub struct FileRenderer {
    output_dir: PathBuf,
}

impl FileRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn job_dir(&self, job: &JobRow) -> PathBuf {
        let id_prefix: String = job.id.chars().take(8).collect();
        self.output_dir.join(format!(
            "{}_{}_{}",
            slug(&job.company),
            slug(&job.title),
            id_prefix
        ))
    }
}

/// Lowercases and keeps alphanumerics, collapsing everything else to
/// single dashes.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("untitled");
    }
    out
}

fn write_file(path: &Path, content: &str) -> Result<(), RenderError> {
    std::fs::write(path, content).map_err(|e| RenderError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

impl Renderer for FileRenderer {
    fn render(
        &self,
        job: &JobRow,
        documents: &Documents,
    ) -> Result<super::RenderedFiles, RenderError> {
        let dir = self.job_dir(job);
        std::fs::create_dir_all(&dir).map_err(|e| RenderError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let resume_path = dir.join("resume.md");
        write_file(&resume_path, &documents.resume)?;

        let cover_letter_path = dir.join("cover_letter.md");
        write_file(&cover_letter_path, &documents.cover_letter)?;

        log::debug!("Rendered documents to {}", dir.display());

        Ok(super::RenderedFiles {
            resume_path: Some(resume_path),
            cover_letter_path: Some(cover_letter_path),
        })
    }
}
