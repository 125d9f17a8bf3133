//! Typed lifecycle statuses, stored as TEXT.
//!
//! `Ranking` and `Generating` are transient claim markers: a stage
//! claims a batch by flipping records into its marker, and every later
//! write is guarded on the marker still being in place. Records stuck
//! in a marker (a crash between claim and commit) are returned to
//! their input status by the stale-claim sweep.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Ingested, waiting for ranking.
    Scraped,
    /// Claimed by a rank run (transient).
    Ranking,
    /// Passed ranking, waiting for document generation.
    Qualified,
    /// Failed ranking. Terminal.
    Disqualified,
    /// Claimed by a generate run (transient).
    Generating,
    /// Documents generated, application record created. Terminal here.
    Generated,
    /// Application submitted (future applicant stage).
    Applied,
    /// Application rejected (future applicant stage).
    Rejected,
    /// Interview obtained (future applicant stage).
    Interview,
    /// Unrecoverable per-record processing failure.
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Scraped => "scraped",
            JobStatus::Ranking => "ranking",
            JobStatus::Qualified => "qualified",
            JobStatus::Disqualified => "disqualified",
            JobStatus::Generating => "generating",
            JobStatus::Generated => "generated",
            JobStatus::Applied => "applied",
            JobStatus::Rejected => "rejected",
            JobStatus::Interview => "interview",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scraped" => Some(JobStatus::Scraped),
            "ranking" => Some(JobStatus::Ranking),
            "qualified" => Some(JobStatus::Qualified),
            "disqualified" => Some(JobStatus::Disqualified),
            "generating" => Some(JobStatus::Generating),
            "generated" => Some(JobStatus::Generated),
            "applied" => Some(JobStatus::Applied),
            "rejected" => Some(JobStatus::Rejected),
            "interview" => Some(JobStatus::Interview),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }

    /// True for the transient claim markers.
    pub fn is_claim_marker(&self) -> bool {
        matches!(self, JobStatus::Ranking | JobStatus::Generating)
    }

    /// The input status a stale claim marker falls back to.
    pub fn claim_input_status(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Ranking => Some(JobStatus::Scraped),
            JobStatus::Generating => Some(JobStatus::Qualified),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Submitted,
    Failed,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationStatus::Pending),
            "submitted" => Some(ApplicationStatus::Submitted),
            "failed" => Some(ApplicationStatus::Failed),
            "withdrawn" => Some(ApplicationStatus::Withdrawn),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_round_trip() {
        for status in [
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
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn test_claim_markers() {
        assert!(JobStatus::Ranking.is_claim_marker());
        assert!(JobStatus::Generating.is_claim_marker());
        assert!(!JobStatus::Scraped.is_claim_marker());

        assert_eq!(
            JobStatus::Ranking.claim_input_status(),
            Some(JobStatus::Scraped)
        );
        assert_eq!(
            JobStatus::Generating.claim_input_status(),
            Some(JobStatus::Qualified)
        );
        assert_eq!(JobStatus::Generated.claim_input_status(), None);
    }

    #[test]
    fn test_application_status_round_trip() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Submitted,
            ApplicationStatus::Failed,
            ApplicationStatus::Withdrawn,
        ] {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::parse(""), None);
    }
}
