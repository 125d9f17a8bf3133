//! Application repository — persistence for the `applications` table.
//!
//! `insert_for_job` is the one multi-table write in the system: it
//! creates the application record and flips the job to `generated` in
//! a single transaction, guarded on the job still holding its claim
//! marker. Either both writes land or neither does.

use rusqlite::{params, Row};
use uuid::Uuid;

use super::status::{ApplicationStatus, JobStatus};
use super::{now_timestamp, Database, DatabaseError};

/// An application row from the database.
#[derive(Debug, Clone)]
pub struct ApplicationRow {
    pub id: String,
    pub job_id: String,
    pub resume_content: Option<String>,
    pub cover_letter_content: Option<String>,
    pub resume_path: Option<String>,
    pub cover_letter_path: Option<String>,
    pub status: ApplicationStatus,
    pub submitted_at: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApplicationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_raw: String = row.get("status")?;
        let status = ApplicationStatus::parse(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown application status '{status_raw}'").into(),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            resume_content: row.get("resume_content")?,
            cover_letter_content: row.get("cover_letter_content")?,
            resume_path: row.get("resume_path")?,
            cover_letter_path: row.get("cover_letter_path")?,
            status,
            submitted_at: row.get("submitted_at")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Generated documents to persist for a job.
#[derive(Debug, Clone, Default)]
pub struct NewApplication {
    pub resume_content: Option<String>,
    pub cover_letter_content: Option<String>,
    pub resume_path: Option<String>,
    pub cover_letter_path: Option<String>,
}

/// Creates a pending application for `job_id` and moves the job from
/// `expected_job_status` to `generated`, atomically.
///
/// Returns `None` (with nothing written) when the job no longer holds
/// `expected_job_status`, i.e. a concurrent writer got there first.
/// A second active application for the job maps to
/// `DatabaseError::Conflict`.
pub fn insert_for_job(
    db: &Database,
    job_id: &str,
    new: &NewApplication,
    expected_job_status: JobStatus,
) -> Result<Option<ApplicationRow>, DatabaseError> {
    let now = now_timestamp();
    let id = Uuid::new_v4().to_string();

    db.with_conn(|conn| {
        conn.execute_batch("BEGIN IMMEDIATE")?;

        let result = conn.execute(
            "INSERT INTO applications (id, job_id, resume_content, cover_letter_content,
             resume_path, cover_letter_path, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                job_id,
                new.resume_content,
                new.cover_letter_content,
                new.resume_path,
                new.cover_letter_path,
                ApplicationStatus::Pending.as_str(),
                now,
                now,
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if DatabaseError::is_constraint_violation(&e) => {
                conn.execute_batch("ROLLBACK")?;
                return Err(DatabaseError::Conflict {
                    key: job_id.to_string(),
                });
            }
            Err(e) => {
                conn.execute_batch("ROLLBACK")?;
                return Err(e.into());
            }
        }

        let flipped = conn.execute(
            "UPDATE jobs SET status = ?1, claimed_at = NULL, error_message = NULL,
             updated_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                JobStatus::Generated.as_str(),
                now,
                job_id,
                expected_job_status.as_str(),
            ],
        )?;

        if flipped != 1 {
            conn.execute_batch("ROLLBACK")?;
            return Ok(None);
        }

        conn.execute_batch("COMMIT")?;

        let mut stmt = conn.prepare("SELECT * FROM applications WHERE id = ?1")?;
        let row = stmt.query_row(params![id], ApplicationRow::from_row)?;
        Ok(Some(row))
    })
}

/// Finds the applications for a job, newest first.
pub fn find_by_job(db: &Database, job_id: &str) -> Result<Vec<ApplicationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM applications WHERE job_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows: Vec<ApplicationRow> = stmt
            .query_map(params![job_id], ApplicationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Updates an application's status. `Submitted` also stamps
/// `submitted_at`.
pub fn update_status(
    db: &Database,
    id: &str,
    status: ApplicationStatus,
) -> Result<bool, DatabaseError> {
    let now = now_timestamp();
    let submitted_at = matches!(status, ApplicationStatus::Submitted).then(|| now.clone());

    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE applications SET status = ?1,
             submitted_at = COALESCE(?2, submitted_at), updated_at = ?3
             WHERE id = ?4",
            params![status.as_str(), submitted_at, now, id],
        )?;
        Ok(changed == 1)
    })
}

/// Counts applications with the given status.
pub fn count_by_status(db: &Database, status: ApplicationStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM applications WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::job_repo::{self, JobDraft};

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn generating_job(db: &Database) -> String {
        let draft = JobDraft {
            external_id: "li-1".to_string(),
            title: "Security Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Zurich".to_string(),
            description: "SIEM work".to_string(),
            url: None,
            apply_url: None,
            posted_at: None,
        };
        let job = job_repo::insert(db, &draft).unwrap();
        job_repo::claim_batch(db, JobStatus::Scraped, 10, JobStatus::Ranking).unwrap();
        job_repo::commit(
            db,
            &job.id,
            JobStatus::Ranking,
            &job_repo::JobUpdate::status(JobStatus::Qualified),
        )
        .unwrap();
        job_repo::claim_batch(db, JobStatus::Qualified, 10, JobStatus::Generating).unwrap();
        job.id
    }

    fn sample_docs() -> NewApplication {
        NewApplication {
            resume_content: Some("# Resume".to_string()),
            cover_letter_content: Some("Dear team".to_string()),
            resume_path: Some("/tmp/resume.md".to_string()),
            cover_letter_path: None,
        }
    }

    #[test]
    fn test_insert_for_job_flips_job_atomically() {
        let db = test_db();
        let job_id = generating_job(&db);

        let app = insert_for_job(&db, &job_id, &sample_docs(), JobStatus::Generating)
            .unwrap()
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.job_id, job_id);
        assert_eq!(app.resume_content.as_deref(), Some("# Resume"));

        let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Generated);
        assert!(job.claimed_at.is_none());
    }

    #[test]
    fn test_insert_for_job_guard_miss_writes_nothing() {
        let db = test_db();
        let job_id = generating_job(&db);

        // Another writer errored the job out from under us.
        job_repo::commit(
            &db,
            &job_id,
            JobStatus::Generating,
            &job_repo::JobUpdate::error("boom"),
        )
        .unwrap();

        let result =
            insert_for_job(&db, &job_id, &sample_docs(), JobStatus::Generating).unwrap();
        assert!(result.is_none());

        // No orphaned application row.
        assert!(find_by_job(&db, &job_id).unwrap().is_empty());
        let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
    }

    #[test]
    fn test_second_active_application_is_conflict() {
        let db = test_db();
        let job_id = generating_job(&db);
        insert_for_job(&db, &job_id, &sample_docs(), JobStatus::Generating)
            .unwrap()
            .unwrap();

        // Force the job back into generating to attempt a duplicate.
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE jobs SET status = 'generating' WHERE id = ?1",
                params![job_id],
            )?;
            Ok(())
        })
        .unwrap();

        let err = insert_for_job(&db, &job_id, &sample_docs(), JobStatus::Generating)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict { ref key } if key == &job_id));

        // The failed attempt must not have flipped the job.
        let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Generating);
    }

    #[test]
    fn test_update_status_stamps_submitted_at() {
        let db = test_db();
        let job_id = generating_job(&db);
        let app = insert_for_job(&db, &job_id, &sample_docs(), JobStatus::Generating)
            .unwrap()
            .unwrap();
        assert!(app.submitted_at.is_none());

        assert!(update_status(&db, &app.id, ApplicationStatus::Submitted).unwrap());
        let after = find_by_job(&db, &job_id).unwrap().remove(0);
        assert_eq!(after.status, ApplicationStatus::Submitted);
        assert!(after.submitted_at.is_some());

        // Moving on does not clear the submission timestamp.
        assert!(update_status(&db, &after.id, ApplicationStatus::Failed).unwrap());
        let failed = find_by_job(&db, &job_id).unwrap().remove(0);
        assert_eq!(failed.status, ApplicationStatus::Failed);
        assert_eq!(failed.submitted_at, after.submitted_at);
    }

    #[test]
    fn test_update_status_unknown_id() {
        let db = test_db();
        assert!(!update_status(&db, "missing", ApplicationStatus::Withdrawn).unwrap());
    }

    #[test]
    fn test_count_by_status() {
        let db = test_db();
        let job_id = generating_job(&db);
        insert_for_job(&db, &job_id, &sample_docs(), JobStatus::Generating)
            .unwrap()
            .unwrap();

        assert_eq!(count_by_status(&db, ApplicationStatus::Pending).unwrap(), 1);
        assert_eq!(
            count_by_status(&db, ApplicationStatus::Submitted).unwrap(),
            0
        );
    }
}
