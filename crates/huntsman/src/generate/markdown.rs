//! Deterministic markdown document generator.
//!
//! Builds a resume and cover letter from the applicant profile and the
//! job row. Skills the job actually matched on are surfaced first, so
//! the documents lean toward what got the posting through ranking.

use std::fmt::Write;

use crate::db::job_repo::JobRow;

use super::profile::Profile;
use super::{DocumentGenerator, Documents, GenerateError};

pub struct MarkdownGenerator {
    profile: Profile,
}

impl MarkdownGenerator {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    fn resume(&self, job: &JobRow) -> String {
        let p = &self.profile;
        let mut out = String::new();

        let _ = writeln!(out, "# {}", p.name);
        if let Some(headline) = &p.headline {
            let _ = writeln!(out, "\n*{headline}*");
        }

        let mut contact = vec![p.email.clone()];
        contact.extend(p.phone.clone());
        contact.extend(p.location.clone());
        contact.extend(p.links.clone());
        let _ = writeln!(out, "\n{}", contact.join(" · "));

        if let Some(summary) = &p.summary {
            let _ = writeln!(out, "\n## Summary\n\n{summary}");
        }

        if !p.skills.is_empty() {
            let _ = writeln!(out, "\n## Skills\n");
            for skill in ordered_skills(&p.skills, job) {
                let _ = writeln!(out, "- {skill}");
            }
        }

        if !p.experience.is_empty() {
            let _ = writeln!(out, "\n## Experience");
            for exp in &p.experience {
                let _ = write!(out, "\n### {} — {}", exp.title, exp.company);
                if let Some(period) = &exp.period {
                    let _ = write!(out, " ({period})");
                }
                let _ = writeln!(out);
                for highlight in &exp.highlights {
                    let _ = writeln!(out, "- {highlight}");
                }
            }
        }

        if !p.education.is_empty() {
            let _ = writeln!(out, "\n## Education\n");
            for edu in &p.education {
                let _ = write!(out, "- {}, {}", edu.degree, edu.institution);
                if let Some(period) = &edu.period {
                    let _ = write!(out, " ({period})");
                }
                let _ = writeln!(out);
            }
        }

        out
    }

    fn cover_letter(&self, job: &JobRow) -> String {
        let p = &self.profile;
        let mut out = String::new();

        let _ = writeln!(out, "Dear {} hiring team,", job.company);
        let _ = writeln!(
            out,
            "\nI am writing to apply for the {} position{}.",
            job.title,
            if job.location.is_empty() {
                String::new()
            } else {
                format!(" in {}", job.location)
            }
        );

        if !job.matched_triggers.is_empty() {
            let _ = writeln!(
                out,
                "\nMy background maps directly onto what you are looking for, \
                 in particular: {}.",
                job.matched_triggers.join(", ")
            );
        }

        if let Some(summary) = &p.summary {
            let _ = writeln!(out, "\n{summary}");
        }

        let _ = writeln!(
            out,
            "\nI would welcome the chance to discuss the role.\n\nKind regards,\n{}",
            p.name
        );

        out
    }
}

/// Skills matched by ranking first (in their stored order), then the
/// rest in profile order.
fn ordered_skills<'a>(skills: &'a [String], job: &JobRow) -> Vec<&'a str> {
    let is_matched = |skill: &str| {
        job.matched_triggers
            .iter()
            .chain(job.matched_support.iter())
            .any(|m| m.eq_ignore_ascii_case(skill))
    };

    let (matched, rest): (Vec<&String>, Vec<&String>) =
        skills.iter().partition(|s| is_matched(s));
    matched
        .into_iter()
        .chain(rest)
        .map(String::as_str)
        .collect()
}

impl DocumentGenerator for MarkdownGenerator {
    fn generate(&self, job: &JobRow) -> Result<Documents, GenerateError> {
        Ok(Documents {
            resume: self.resume(job),
            cover_letter: self.cover_letter(job),
        })
    }
}
