//! Object catalog repository.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use silo_core::{DetectionMethod, Error, ObjectRecord, Result};

use crate::escape_like;

const OBJECT_COLUMNS: &str = "id, bucket, filename, doc_id, year, size_bytes, sha256, \
     served_content_type, detected_content_type, claimed_content_type, detected_extension, \
     detection_method, is_mismatch, is_dangerous_mismatch, created_at";

/// Catalog row to insert after a blob has been committed to disk.
#[derive(Debug, Clone)]
pub struct NewObject {
    pub bucket: String,
    pub filename: String,
    pub doc_id: String,
    pub year: i32,
    pub size_bytes: i64,
    pub sha256: Vec<u8>,
    pub served_content_type: String,
    pub detected_content_type: String,
    pub claimed_content_type: Option<String>,
    pub detected_extension: Option<String>,
    pub detection_method: DetectionMethod,
    pub is_mismatch: bool,
    pub is_dangerous_mismatch: bool,
}

/// PostgreSQL repository for the `objects` table.
#[derive(Clone)]
pub struct PgObjectRepository {
    pool: PgPool,
}

impl PgObjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the catalog row for a committed blob.
    ///
    /// The unique index on `(bucket, filename)` decides races between
    /// simultaneous uploads of the same key; the loser receives
    /// [`Error::ObjectAlreadyExists`] and must clean up its blob file.
    pub async fn insert(&self, new: NewObject) -> Result<ObjectRecord> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO objects
               (bucket, filename, doc_id, year, size_bytes, sha256,
                served_content_type, detected_content_type, claimed_content_type,
                detected_extension, detection_method, is_mismatch, is_dangerous_mismatch)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING {OBJECT_COLUMNS}"#
        ))
        .bind(&new.bucket)
        .bind(&new.filename)
        .bind(&new.doc_id)
        .bind(new.year)
        .bind(new.size_bytes)
        .bind(&new.sha256)
        .bind(&new.served_content_type)
        .bind(&new.detected_content_type)
        .bind(&new.claimed_content_type)
        .bind(&new.detected_extension)
        .bind(new.detection_method.as_str())
        .bind(new.is_mismatch)
        .bind(new.is_dangerous_mismatch)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)
        .map_err(|e| {
            if e.is_unique_violation() {
                Error::ObjectAlreadyExists {
                    bucket: new.bucket.clone(),
                    filename: new.filename.clone(),
                }
            } else {
                e
            }
        })?;

        Ok(object_from_row(&row))
    }

    /// Whether a `(bucket, filename)` row exists.
    pub async fn exists(&self, bucket: &str, filename: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM objects WHERE bucket = $1 AND filename = $2) AS found",
        )
        .bind(bucket)
        .bind(filename)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("found"))
    }

    pub async fn get_by_doc_id(&self, bucket: &str, doc_id: &str) -> Result<Option<ObjectRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE bucket = $1 AND doc_id = $2"
        ))
        .bind(bucket)
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(object_from_row))
    }

    pub async fn get_by_name(&self, bucket: &str, filename: &str) -> Result<Option<ObjectRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE bucket = $1 AND filename = $2"
        ))
        .bind(bucket)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(object_from_row))
    }

    /// Cross-bucket lookup; DocIds are globally unique.
    pub async fn get_by_doc_id_global(&self, doc_id: &str) -> Result<Option<ObjectRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE doc_id = $1"
        ))
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(object_from_row))
    }

    /// Delete by DocId, returning the removed row for blob cleanup.
    pub async fn delete_by_doc_id(
        &self,
        bucket: &str,
        doc_id: &str,
    ) -> Result<Option<ObjectRecord>> {
        let row = sqlx::query(&format!(
            "DELETE FROM objects WHERE bucket = $1 AND doc_id = $2 RETURNING {OBJECT_COLUMNS}"
        ))
        .bind(bucket)
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(object_from_row))
    }

    /// Delete by original key, returning the removed row for blob cleanup.
    pub async fn delete_by_name(
        &self,
        bucket: &str,
        filename: &str,
    ) -> Result<Option<ObjectRecord>> {
        let row = sqlx::query(&format!(
            "DELETE FROM objects WHERE bucket = $1 AND filename = $2 RETURNING {OBJECT_COLUMNS}"
        ))
        .bind(bucket)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(object_from_row))
    }

    /// Cross-bucket delete by DocId.
    pub async fn delete_by_doc_id_global(&self, doc_id: &str) -> Result<Option<ObjectRecord>> {
        let row = sqlx::query(&format!(
            "DELETE FROM objects WHERE doc_id = $1 RETURNING {OBJECT_COLUMNS}"
        ))
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(object_from_row))
    }

    /// Page through a bucket's objects, optionally filtered by key prefix.
    ///
    /// Returns the page plus the total row count for the filter.
    pub async fn list(
        &self,
        bucket: &str,
        page: i64,
        page_size: i64,
        prefix: Option<&str>,
    ) -> Result<(Vec<ObjectRecord>, i64)> {
        let pattern = prefix.map(|p| format!("{}%", escape_like(p)));
        let offset = (page - 1) * page_size;

        let rows = sqlx::query(&format!(
            r#"SELECT {OBJECT_COLUMNS} FROM objects
               WHERE bucket = $1 AND ($2::TEXT IS NULL OR filename LIKE $2)
               ORDER BY filename
               LIMIT $3 OFFSET $4"#
        ))
        .bind(bucket)
        .bind(&pattern)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM objects
               WHERE bucket = $1 AND ($2::TEXT IS NULL OR filename LIKE $2)"#,
        )
        .bind(bucket)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?
        .get("n");

        Ok((rows.iter().map(object_from_row).collect(), total))
    }
}

/// Convert a database row to an ObjectRecord.
fn object_from_row(row: &PgRow) -> ObjectRecord {
    ObjectRecord {
        id: row.get("id"),
        bucket: row.get("bucket"),
        filename: row.get("filename"),
        doc_id: row.get("doc_id"),
        year: row.get("year"),
        size_bytes: row.get("size_bytes"),
        sha256: row.get("sha256"),
        served_content_type: row.get("served_content_type"),
        detected_content_type: row.get("detected_content_type"),
        claimed_content_type: row.get("claimed_content_type"),
        detected_extension: row.get("detected_extension"),
        detection_method: DetectionMethod::from_str_lossy(row.get("detection_method")),
        is_mismatch: row.get("is_mismatch"),
        is_dangerous_mismatch: row.get("is_dangerous_mismatch"),
        created_at: row.get("created_at"),
    }
}
