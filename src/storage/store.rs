//! Submission store.
//!
//! `SubmissionStore` is the seam between the pipeline and persistence. The
//! SQLite implementation enforces the record invariants in SQL:
//! - `url` is the primary key, a duplicate insert reports `AlreadyExists`
//! - classification updates only touch non-terminal rows
//! - identifier updates are compare-and-set against the expected identifier

use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::config::{DEDUP_LOOKUP_CHUNK, MAX_ERROR_MESSAGE_LENGTH};
use crate::error_handling::DatabaseError;
use crate::storage::migrations::run_migrations;
use crate::storage::models::{
    InsertOutcome, NewSubmission, SubmissionFilter, SubmissionRecord, SubmissionState,
};
use crate::storage::pool::{init_db_pool_with_path, DbPool};

/// Persistent store of submission records.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Inserts a row; a URL that is already stored yields `AlreadyExists`.
    async fn insert(&self, submission: &NewSubmission) -> Result<InsertOutcome, DatabaseError>;

    /// Returns the subset of `urls` that is already stored.
    async fn find_existing(&self, urls: &[String]) -> Result<HashSet<String>, DatabaseError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<SubmissionRecord>, DatabaseError>;

    /// Replaces the identifier of `url` only if it currently equals `expected`.
    async fn update_identifier(
        &self,
        url: &str,
        expected: &str,
        identifier: &str,
    ) -> Result<bool, DatabaseError>;

    /// Sets state and tags of a non-terminal record. Returns whether a row changed.
    async fn update_classification(
        &self,
        url: &str,
        state: SubmissionState,
        tags: &[String],
    ) -> Result<bool, DatabaseError>;

    /// Sets state and tags of every non-terminal record under `identifier`.
    async fn update_by_identifier(
        &self,
        identifier: &str,
        state: SubmissionState,
        tags: &[String],
    ) -> Result<u64, DatabaseError>;

    /// Records with an identifier and a non-terminal state, oldest first.
    async fn list_unresolved(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SubmissionRecord>, DatabaseError>;

    async fn list(
        &self,
        filter: &SubmissionFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SubmissionRecord>, DatabaseError>;

    async fn delete_by_urls(&self, urls: &[String]) -> Result<u64, DatabaseError>;

    async fn delete_by_states(&self, states: &[SubmissionState]) -> Result<u64, DatabaseError>;
}

/// SQLite-backed `SubmissionStore`.
#[derive(Clone)]
pub struct SqliteSubmissionStore {
    pool: DbPool,
}

impl SqliteSubmissionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &std::path::Path) -> Result<Self, DatabaseError> {
        let pool = init_db_pool_with_path(path).await?;
        run_migrations(pool.as_ref()).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Truncates long error texts (e.g. HTML error pages) on a char boundary.
fn truncate_error(error: &str) -> String {
    if error.chars().count() <= MAX_ERROR_MESSAGE_LENGTH {
        error.to_string()
    } else {
        let mut truncated: String = error.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect();
        truncated.push_str("...");
        truncated
    }
}

fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

fn row_to_record(row: &SqliteRow) -> Result<SubmissionRecord, DatabaseError> {
    let url: String = row.try_get("url")?;
    let state_str: String = row.try_get("state")?;
    let state = SubmissionState::from_str(&state_str).map_err(|_| DatabaseError::CorruptRow {
        url: url.clone(),
        reason: format!("unknown state '{state_str}'"),
    })?;
    let tags_json: String = row.try_get("tags")?;
    let tags: Vec<String> =
        serde_json::from_str(&tags_json).map_err(|e| DatabaseError::CorruptRow {
            url: url.clone(),
            reason: format!("tags are not a JSON string array: {e}"),
        })?;
    let reported_at_ms: i64 = row.try_get("reported_at_ms")?;
    let reported_at =
        DateTime::<Utc>::from_timestamp_millis(reported_at_ms).ok_or_else(|| {
            DatabaseError::CorruptRow {
                url: url.clone(),
                reason: format!("reported_at_ms out of range: {reported_at_ms}"),
            }
        })?;

    Ok(SubmissionRecord {
        identifier: row.try_get("identifier")?,
        error: row.try_get("error")?,
        url,
        state,
        tags,
        reported_at,
    })
}

const SELECT_COLUMNS: &str =
    "SELECT url, identifier, state, tags, error, reported_at_ms FROM submissions";

fn push_state_list(query_builder: &mut QueryBuilder<'_, Sqlite>, states: &[SubmissionState]) {
    query_builder.push("state IN (");
    let mut separated = query_builder.separated(", ");
    for state in states {
        separated.push_bind(state.to_string());
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl SubmissionStore for SqliteSubmissionStore {
    async fn insert(&self, submission: &NewSubmission) -> Result<InsertOutcome, DatabaseError> {
        let now = now_millis();
        let result = sqlx::query(
            "INSERT INTO submissions (url, identifier, state, tags, error, reported_at_ms, updated_at_ms)
             VALUES (?, ?, ?, '[]', ?, ?, ?)",
        )
        .bind(&submission.url)
        .bind(&submission.identifier)
        .bind(submission.state.to_string())
        .bind(submission.error.as_deref().map(truncate_error))
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Submission already stored: {}", submission.url);
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(DatabaseError::SqlError(e)),
        }
    }

    async fn find_existing(&self, urls: &[String]) -> Result<HashSet<String>, DatabaseError> {
        let mut existing = HashSet::new();
        for chunk in urls.chunks(DEDUP_LOOKUP_CHUNK) {
            let mut query_builder =
                QueryBuilder::<Sqlite>::new("SELECT url FROM submissions WHERE url IN (");
            let mut separated = query_builder.separated(", ");
            for url in chunk {
                separated.push_bind(url.as_str());
            }
            separated.push_unseparated(")");

            let rows = query_builder.build().fetch_all(self.pool.as_ref()).await?;
            for row in rows {
                existing.insert(row.try_get::<String, _>("url")?);
            }
        }
        Ok(existing)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<SubmissionRecord>, DatabaseError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE url = ?"))
            .bind(url)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn update_identifier(
        &self,
        url: &str,
        expected: &str,
        identifier: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE submissions SET identifier = ?, updated_at_ms = ?
             WHERE url = ? AND identifier = ?",
        )
        .bind(identifier)
        .bind(now_millis())
        .bind(url)
        .bind(expected)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            warn!("Identifier of {url} is no longer {expected}; not replaced with {identifier}");
        }
        Ok(result.rows_affected() > 0)
    }

    async fn update_classification(
        &self,
        url: &str,
        state: SubmissionState,
        tags: &[String],
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE submissions SET state = ?, tags = ?, updated_at_ms = ?
             WHERE url = ? AND state IN ('pending', 'processing')",
        )
        .bind(state.to_string())
        .bind(tags_to_json(tags))
        .bind(now_millis())
        .bind(url)
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_by_identifier(
        &self,
        identifier: &str,
        state: SubmissionState,
        tags: &[String],
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE submissions SET state = ?, tags = ?, updated_at_ms = ?
             WHERE identifier = ? AND state IN ('pending', 'processing')",
        )
        .bind(state.to_string())
        .bind(tags_to_json(tags))
        .bind(now_millis())
        .bind(identifier)
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_unresolved(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SubmissionRecord>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS}
             WHERE identifier IS NOT NULL AND state IN ('pending', 'processing')
             ORDER BY reported_at_ms, url
             LIMIT ? OFFSET ?"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(self.pool.as_ref())
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn list(
        &self,
        filter: &SubmissionFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SubmissionRecord>, DatabaseError> {
        let mut query_builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query_builder.push(" WHERE 1 = 1");

        if !filter.states.is_empty() {
            query_builder.push(" AND ");
            push_state_list(&mut query_builder, &filter.states);
        }
        if let Some(tag) = &filter.tag {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM json_each(submissions.tags) WHERE json_each.value = ",
            );
            query_builder.push_bind(tag.as_str());
            query_builder.push(")");
        }
        if let Some(identifier) = &filter.identifier {
            query_builder.push(" AND identifier = ");
            query_builder.push_bind(identifier.as_str());
        }

        query_builder.push(" ORDER BY reported_at_ms, url LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset as i64);

        let rows = query_builder.build().fetch_all(self.pool.as_ref()).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn delete_by_urls(&self, urls: &[String]) -> Result<u64, DatabaseError> {
        let mut deleted = 0;
        for chunk in urls.chunks(DEDUP_LOOKUP_CHUNK) {
            let mut query_builder =
                QueryBuilder::<Sqlite>::new("DELETE FROM submissions WHERE url IN (");
            let mut separated = query_builder.separated(", ");
            for url in chunk {
                separated.push_bind(url.as_str());
            }
            separated.push_unseparated(")");
            deleted += query_builder
                .build()
                .execute(self.pool.as_ref())
                .await?
                .rows_affected();
        }
        Ok(deleted)
    }

    async fn delete_by_states(&self, states: &[SubmissionState]) -> Result<u64, DatabaseError> {
        if states.is_empty() {
            return Ok(0);
        }
        let mut query_builder = QueryBuilder::<Sqlite>::new("DELETE FROM submissions WHERE ");
        push_state_list(&mut query_builder, states);
        let result = query_builder.build().execute(self.pool.as_ref()).await?;
        Ok(result.rows_affected())
    }
}
