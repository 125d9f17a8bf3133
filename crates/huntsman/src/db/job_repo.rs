//! Job repository — persistence for the `jobs` table.
//!
//! The two operations with real invariants live here:
//!
//! - `claim_batch` atomically selects eligible rows and flips them into
//!   a transient claim marker in a single UPDATE, so concurrent stage
//!   runs can never pick up the same record.
//! - `commit` is a conditional update guarded on the status still being
//!   the claim marker; a `false` return means another writer won the
//!   race and the caller must skip the record.

use rusqlite::{params, Row};
use uuid::Uuid;

use super::status::JobStatus;
use super::{now_timestamp, Database, DatabaseError};

/// A job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub description_translated: Option<String>,
    pub url: Option<String>,
    pub apply_url: Option<String>,
    pub posted_at: Option<String>,
    pub score: Option<i64>,
    pub matched_triggers: Vec<String>,
    pub matched_support: Vec<String>,
    pub ranked_at: Option<String>,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub claimed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let id: String = row.get("id")?;
        let status_raw: String = row.get("status")?;
        let status = JobStatus::parse(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown job status '{status_raw}'").into(),
            )
        })?;

        Ok(Self {
            external_id: row.get("external_id")?,
            title: row.get("title")?,
            company: row.get("company")?,
            location: row.get("location")?,
            description: row.get("description")?,
            description_translated: row.get("description_translated")?,
            url: row.get("url")?,
            apply_url: row.get("apply_url")?,
            posted_at: row.get("posted_at")?,
            score: row.get("score")?,
            matched_triggers: decode_keywords(row.get("matched_triggers")?),
            matched_support: decode_keywords(row.get("matched_support")?),
            ranked_at: row.get("ranked_at")?,
            status,
            error_message: row.get("error_message")?,
            claimed_at: row.get("claimed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            id,
        })
    }

    /// Full text used for keyword matching: the translated description
    /// when present, otherwise the raw one.
    pub fn matching_description(&self) -> &str {
        self.description_translated
            .as_deref()
            .unwrap_or(&self.description)
    }
}

fn decode_keywords(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn encode_keywords(keywords: &[String]) -> String {
    serde_json::to_string(keywords).unwrap_or_else(|_| "[]".to_string())
}

/// An incoming job from an ingest source. `external_id` is the sole
/// deduplication key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JobDraft {
    pub external_id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
    #[serde(default)]
    pub posted_at: Option<String>,
}

/// Sparse update applied by `commit`. Only populated fields are
/// written; `claimed_at` is always cleared and `error_message` is
/// always overwritten (NULL unless this commit records an error), so a
/// record only carries an error message while its status is `error`.
#[derive(Debug, Default, Clone)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub score: Option<i64>,
    pub matched_triggers: Option<Vec<String>>,
    pub matched_support: Option<Vec<String>>,
    pub ranked_at: Option<String>,
    pub description_translated: Option<String>,
    pub error_message: Option<String>,
}

impl JobUpdate {
    /// Update that only moves the record to a new status.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Update that records a per-record failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub company: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new job from a draft in status `scraped`.
///
/// A unique-constraint rejection on `external_id` maps to
/// `DatabaseError::Conflict` so callers can convert the race into an
/// update.
pub fn insert(db: &Database, draft: &JobDraft) -> Result<JobRow, DatabaseError> {
    let now = now_timestamp();
    let id = Uuid::new_v4().to_string();

    db.with_conn(|conn| {
        let result = conn.execute(
            "INSERT INTO jobs (id, external_id, title, company, location, description,
             url, apply_url, posted_at, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id,
                draft.external_id,
                draft.title,
                draft.company,
                draft.location,
                draft.description,
                draft.url,
                draft.apply_url,
                draft.posted_at,
                JobStatus::Scraped.as_str(),
                now,
                now,
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if DatabaseError::is_constraint_violation(&e) => {
                return Err(DatabaseError::Conflict {
                    key: draft.external_id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        fetch_by_id(conn, &id)?.ok_or(DatabaseError::CorruptRow {
            id: id.clone(),
            reason: "row missing after insert".to_string(),
        })
    })
}

/// Upserts a job by `external_id`. Returns `(job, inserted)`.
///
/// On an existing record only the content fields (title, company,
/// location, description, url, apply_url, posted_at) are refreshed:
/// status, score and all ranking/generation outputs stay untouched, so
/// re-ingesting can never drag a job back to `scraped`.
pub fn upsert_by_external_id(
    db: &Database,
    draft: &JobDraft,
) -> Result<(JobRow, bool), DatabaseError> {
    match insert(db, draft) {
        Ok(row) => Ok((row, true)),
        Err(DatabaseError::Conflict { .. }) => {
            let now = now_timestamp();
            db.with_conn(|conn| {
                conn.execute(
                    "UPDATE jobs SET title = ?2, company = ?3, location = ?4,
                     description = ?5, url = ?6, apply_url = ?7, posted_at = ?8,
                     updated_at = ?9
                     WHERE external_id = ?1",
                    params![
                        draft.external_id,
                        draft.title,
                        draft.company,
                        draft.location,
                        draft.description,
                        draft.url,
                        draft.apply_url,
                        draft.posted_at,
                        now,
                    ],
                )?;

                let row = fetch_by_external_id(conn, &draft.external_id)?.ok_or(
                    DatabaseError::CorruptRow {
                        id: draft.external_id.clone(),
                        reason: "row missing after upsert".to_string(),
                    },
                )?;
                Ok((row, false))
            })
        }
        Err(e) => Err(e),
    }
}

/// Atomically claims up to `limit` jobs in `input_status`, flipping
/// them to `claim_status` and stamping `claimed_at`, all in a single
/// UPDATE. Returns the claimed rows; no other caller can see them in
/// `input_status` anymore.
pub fn claim_batch(
    db: &Database,
    input_status: JobStatus,
    limit: u64,
    claim_status: JobStatus,
) -> Result<Vec<JobRow>, DatabaseError> {
    let now = now_timestamp();

    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "UPDATE jobs SET status = ?1, claimed_at = ?2, updated_at = ?2
             WHERE id IN (
                 SELECT id FROM jobs WHERE status = ?3
                 ORDER BY created_at ASC, id ASC LIMIT ?4
             )
             RETURNING *",
        )?;
        let rows: Vec<JobRow> = stmt
            .query_map(
                params![claim_status.as_str(), now, input_status.as_str(), limit],
                JobRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Conditionally applies `update` to a job, guarded on its status still
/// being `expected_status`. Returns `false` when the guard fails (a
/// concurrent writer got there first); the row is left untouched.
pub fn commit(
    db: &Database,
    id: &str,
    expected_status: JobStatus,
    update: &JobUpdate,
) -> Result<bool, DatabaseError> {
    let now = now_timestamp();

    // SET clause built dynamically from the populated fields.
    let mut assignments = vec![
        "updated_at = ?1".to_string(),
        "claimed_at = NULL".to_string(),
    ];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];

    if let Some(status) = update.status {
        values.push(Box::new(status.as_str().to_string()));
        assignments.push(format!("status = ?{}", values.len()));
    }
    if let Some(score) = update.score {
        values.push(Box::new(score));
        assignments.push(format!("score = ?{}", values.len()));
    }
    if let Some(ref triggers) = update.matched_triggers {
        values.push(Box::new(encode_keywords(triggers)));
        assignments.push(format!("matched_triggers = ?{}", values.len()));
    }
    if let Some(ref support) = update.matched_support {
        values.push(Box::new(encode_keywords(support)));
        assignments.push(format!("matched_support = ?{}", values.len()));
    }
    if let Some(ref ranked_at) = update.ranked_at {
        values.push(Box::new(ranked_at.clone()));
        assignments.push(format!("ranked_at = ?{}", values.len()));
    }
    if let Some(ref translated) = update.description_translated {
        values.push(Box::new(translated.clone()));
        assignments.push(format!("description_translated = ?{}", values.len()));
    }
    match update.error_message {
        Some(ref message) => {
            values.push(Box::new(message.clone()));
            assignments.push(format!("error_message = ?{}", values.len()));
        }
        None => assignments.push("error_message = NULL".to_string()),
    }

    values.push(Box::new(id.to_string()));
    let id_param = values.len();
    values.push(Box::new(expected_status.as_str().to_string()));
    let status_param = values.len();

    let sql = format!(
        "UPDATE jobs SET {} WHERE id = ?{} AND status = ?{}",
        assignments.join(", "),
        id_param,
        status_param,
    );

    db.with_conn(|conn| {
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, params_ref.as_slice())?;
        Ok(changed == 1)
    })
}

/// Reverts unprocessed claims back to their input status. Used when a
/// stage run hits its time budget before draining the batch.
pub fn release_claims(
    db: &Database,
    ids: &[String],
    claim_status: JobStatus,
    input_status: JobStatus,
) -> Result<u64, DatabaseError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let now = now_timestamp();
    let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 4)).collect();
    let sql = format!(
        "UPDATE jobs SET status = ?1, claimed_at = NULL, updated_at = ?2
         WHERE status = ?3 AND id IN ({})",
        placeholders.join(", ")
    );

    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(input_status.as_str().to_string()),
        Box::new(now),
        Box::new(claim_status.as_str().to_string()),
    ];
    for id in ids {
        values.push(Box::new(id.clone()));
    }

    db.with_conn(|conn| {
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, params_ref.as_slice())?;
        Ok(changed as u64)
    })
}

/// Resets claims older than `older_than_secs` back to their input
/// status. Recovers records abandoned by a crash between claim and
/// commit.
pub fn sweep_stale_claims(
    db: &Database,
    claim_status: JobStatus,
    input_status: JobStatus,
    older_than_secs: u64,
) -> Result<u64, DatabaseError> {
    let now = now_timestamp();
    let cutoff = (chrono::Utc::now() - chrono::Duration::seconds(older_than_secs as i64))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = ?1, claimed_at = NULL, updated_at = ?2
             WHERE status = ?3 AND claimed_at IS NOT NULL AND claimed_at < ?4",
            params![
                input_status.as_str(),
                now,
                claim_status.as_str(),
                cutoff
            ],
        )?;
        Ok(changed as u64)
    })
}

/// Moves every job in one of `from` statuses back to `to`, clearing any
/// error message. Operator-initiated reprocessing only; normal stage
/// runs never call this.
pub fn reset_status(
    db: &Database,
    from: &[JobStatus],
    to: JobStatus,
) -> Result<u64, DatabaseError> {
    if from.is_empty() {
        return Ok(0);
    }

    let now = now_timestamp();
    let placeholders: Vec<String> = (0..from.len()).map(|i| format!("?{}", i + 3)).collect();
    let sql = format!(
        "UPDATE jobs SET status = ?1, claimed_at = NULL, error_message = NULL,
         updated_at = ?2
         WHERE status IN ({})",
        placeholders.join(", ")
    );

    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(to.as_str().to_string()), Box::new(now)];
    for status in from {
        values.push(Box::new(status.as_str().to_string()));
    }

    db.with_conn(|conn| {
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, params_ref.as_slice())?;
        Ok(changed as u64)
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| fetch_by_id(conn, id))
}

/// Finds a job by its external (source-assigned) ID.
pub fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| fetch_by_external_id(conn, external_id))
}

/// Queries jobs with filters, ordered for display: score descending,
/// then newest first.
pub fn query(db: &Database, filter: &JobFilter) -> Result<Vec<JobRow>, DatabaseError> {
    let mut conditions = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str().to_string()));
        conditions.push(format!("status = ?{}", values.len()));
    }
    if let Some(ref company) = filter.company {
        values.push(Box::new(company.clone()));
        conditions.push(format!("company = ?{}", values.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    values.push(Box::new(filter.limit.unwrap_or(100) as i64));
    let limit_param = values.len();
    values.push(Box::new(filter.offset.unwrap_or(0) as i64));
    let offset_param = values.len();

    let sql = format!(
        "SELECT * FROM jobs {} ORDER BY score DESC, created_at DESC LIMIT ?{} OFFSET ?{}",
        where_clause, limit_param, offset_param,
    );

    db.with_conn(|conn| {
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: JobStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

fn fetch_by_id(
    conn: &rusqlite::Connection,
    id: &str,
) -> Result<Option<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

fn fetch_by_external_id(
    conn: &rusqlite::Connection,
    external_id: &str,
) -> Result<Option<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs WHERE external_id = ?1")?;
    let mut rows = stmt.query_map(params![external_id], JobRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}
