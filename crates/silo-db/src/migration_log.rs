//! Persistent migration log.
//!
//! Every legacy record gets exactly one row keyed by
//! `(source_year, source_document_id)`. The row walks the state machine
//! seeded → pending → in_progress → {completed|failed|skipped}; failed rows
//! below the retry cap are picked up again by batch selection. The log
//! lives in its own `migration` schema so it can sit in a database separate
//! from the catalog.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use silo_core::defaults::ERROR_MESSAGE_MAX_CHARS;
use silo_core::{EnrichedMetadata, Error, MigrationLogEntry, MigrationOutcome, MigrationStatus, Result};

const LOG_COLUMNS: &str = "id, source_year, source_document_id, original_filename, \
     original_extension, claimed_content_type, source_file_size, source_record_date, status, \
     target_doc_id, target_bucket, target_filename, target_sha256, detected_content_type, \
     error_message, retry_count, worker_token, created_at, processed_at";

/// Rows per bulk-insert statement during seeding.
const SEED_CHUNK: usize = 1000;

/// Clamp an error message to the column limit, on a char boundary.
pub fn truncate_error_message(message: &str) -> String {
    message.chars().take(ERROR_MESSAGE_MAX_CHARS).collect()
}

/// PostgreSQL repository for `migration.migration_log`.
#[derive(Clone)]
pub struct PgMigrationLogRepository {
    pool: PgPool,
}

impl PgMigrationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Provision the schema, table, and indexes. Idempotent; safe to run on
    /// every worker start.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query("CREATE SCHEMA IF NOT EXISTS migration")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS migration.migration_log (
                   id BIGSERIAL PRIMARY KEY,
                   source_year INT NOT NULL,
                   source_document_id TEXT NOT NULL,
                   original_filename TEXT,
                   original_extension TEXT,
                   claimed_content_type TEXT,
                   source_file_size BIGINT,
                   source_record_date TIMESTAMPTZ,
                   status TEXT NOT NULL DEFAULT 'seeded',
                   target_doc_id TEXT,
                   target_bucket TEXT,
                   target_filename TEXT,
                   target_sha256 TEXT,
                   detected_content_type TEXT,
                   error_message TEXT,
                   retry_count INT NOT NULL DEFAULT 0,
                   worker_token INT,
                   created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                   processed_at TIMESTAMPTZ
               )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_migration_log_source
             ON migration.migration_log (source_year, source_document_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS ix_migration_log_status
             ON migration.migration_log (status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS ix_migration_log_worker_token
             ON migration.migration_log (worker_token)",
        )
        .execute(&self.pool)
        .await?;

        info!(
            subsystem = "migrate",
            component = "log",
            op = "ensure_schema",
            "Migration log schema ensured"
        );
        Ok(())
    }

    /// Insert missing rows at status `seeded`.
    ///
    /// `ON CONFLICT DO NOTHING` on the source key makes this a set
    /// difference: ids already logged for the year are left untouched, so
    /// re-running a crashed seed phase is safe. Returns the number of rows
    /// actually inserted.
    pub async fn seed(&self, year: i32, content_ids: &[String]) -> Result<u64> {
        let mut inserted = 0u64;
        for chunk in content_ids.chunks(SEED_CHUNK) {
            let result = sqlx::query(
                r#"INSERT INTO migration.migration_log (source_year, source_document_id, status)
                   SELECT $1, ids.id, 'seeded' FROM UNNEST($2::TEXT[]) AS ids(id)
                   ON CONFLICT (source_year, source_document_id) DO NOTHING"#,
            )
            .bind(year)
            .bind(chunk)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Fetch a batch of rows still waiting for enrichment.
    pub async fn seeded_batch(&self, year: i32, limit: i64) -> Result<Vec<MigrationLogEntry>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {LOG_COLUMNS} FROM migration.migration_log
               WHERE source_year = $1 AND status = 'seeded'
               ORDER BY source_document_id
               LIMIT $2"#
        ))
        .bind(year)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    /// Apply legacy metadata and move the row to `pending`.
    pub async fn enrich(&self, id: i64, meta: &EnrichedMetadata) -> Result<()> {
        sqlx::query(
            r#"UPDATE migration.migration_log
               SET original_filename = $2,
                   original_extension = $3,
                   claimed_content_type = $4,
                   source_file_size = $5,
                   source_record_date = $6,
                   status = 'pending'
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&meta.original_filename)
        .bind(&meta.original_extension)
        .bind(&meta.claimed_content_type)
        .bind(meta.source_file_size)
        .bind(meta.source_record_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminate a row as `skipped` with a reason.
    pub async fn skip(&self, id: i64, reason: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE migration.migration_log
               SET status = 'skipped', error_message = $2, processed_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(truncate_error_message(reason))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Select the next batch of migratable rows.
    ///
    /// Picks `pending` rows plus `failed` rows that still have retries
    /// left, pinned to the worker's shard when a token is configured,
    /// ordered by source document id.
    pub async fn select_batch(
        &self,
        year: i32,
        worker_token: Option<i32>,
        batch_size: i64,
        max_retries: i32,
    ) -> Result<Vec<MigrationLogEntry>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {LOG_COLUMNS} FROM migration.migration_log
               WHERE source_year = $1
                 AND (status = 'pending' OR (status = 'failed' AND retry_count < $2))
                 AND ($3::INT IS NULL OR worker_token = $3)
               ORDER BY source_document_id
               LIMIT $4"#
        ))
        .bind(year)
        .bind(max_retries)
        .bind(worker_token)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    /// Write barrier before the transfer starts: a crashed worker leaves
    /// its in-flight rows visible as `in_progress`.
    pub async fn mark_in_progress(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE migration.migration_log SET status = 'in_progress' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a successful transfer.
    pub async fn complete(&self, id: i64, outcome: &MigrationOutcome) -> Result<()> {
        sqlx::query(
            r#"UPDATE migration.migration_log
               SET status = 'completed',
                   target_doc_id = $2,
                   target_bucket = $3,
                   target_filename = $4,
                   target_sha256 = $5,
                   detected_content_type = $6,
                   error_message = NULL,
                   processed_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&outcome.target_doc_id)
        .bind(&outcome.target_bucket)
        .bind(&outcome.target_filename)
        .bind(&outcome.target_sha256)
        .bind(&outcome.detected_content_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt, bumping the retry counter.
    pub async fn fail(&self, id: i64, message: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE migration.migration_log
               SET status = 'failed',
                   retry_count = retry_count + 1,
                   error_message = $2,
                   processed_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(truncate_error_message(message))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Per-status row counts for the report phase.
    pub async fn status_counts(
        &self,
        year: i32,
        worker_token: Option<i32>,
    ) -> Result<Vec<(MigrationStatus, i64)>> {
        let rows = sqlx::query(
            r#"SELECT status, COUNT(*) AS n FROM migration.migration_log
               WHERE source_year = $1 AND ($2::INT IS NULL OR worker_token = $2)
               GROUP BY status
               ORDER BY status"#,
        )
        .bind(year)
        .bind(worker_token)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status: &str = row.get("status");
                MigrationStatus::parse(status)
                    .ok_or_else(|| Error::Internal(format!("unknown log status: {}", status)))
                    .map(|s| (s, row.get::<i64, _>("n")))
            })
            .collect()
    }

    /// Rows that have burned through every retry.
    pub async fn exhausted_count(
        &self,
        year: i32,
        worker_token: Option<i32>,
        max_retries: i32,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM migration.migration_log
               WHERE source_year = $1
                 AND ($2::INT IS NULL OR worker_token = $2)
                 AND status = 'failed' AND retry_count >= $3"#,
        )
        .bind(year)
        .bind(worker_token)
        .bind(max_retries)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }
}

/// Convert a database row to a MigrationLogEntry.
fn entry_from_row(row: &PgRow) -> MigrationLogEntry {
    let status: &str = row.get("status");
    MigrationLogEntry {
        id: row.get("id"),
        source_year: row.get("source_year"),
        source_document_id: row.get("source_document_id"),
        original_filename: row.get("original_filename"),
        original_extension: row.get("original_extension"),
        claimed_content_type: row.get("claimed_content_type"),
        source_file_size: row.get("source_file_size"),
        source_record_date: row.get("source_record_date"),
        status: MigrationStatus::parse(status).unwrap_or(MigrationStatus::Seeded),
        target_doc_id: row.get("target_doc_id"),
        target_bucket: row.get("target_bucket"),
        target_filename: row.get("target_filename"),
        target_sha256: row.get("target_sha256"),
        detected_content_type: row.get("detected_content_type"),
        error_message: row.get("error_message"),
        retry_count: row.get("retry_count"),
        worker_token: row.get("worker_token"),
        created_at: row.get("created_at"),
        processed_at: row.get("processed_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_message_unchanged() {
        assert_eq!(truncate_error_message("boom"), "boom");
    }

    #[test]
    fn test_truncate_long_message_to_limit() {
        let long = "x".repeat(5000);
        let truncated = truncate_error_message(&long);
        assert_eq!(truncated.chars().count(), ERROR_MESSAGE_MAX_CHARS);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(3000);
        let truncated = truncate_error_message(&long);
        assert_eq!(truncated.chars().count(), ERROR_MESSAGE_MAX_CHARS);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
