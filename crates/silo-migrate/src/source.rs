//! Legacy source database access.
//!
//! Two databases feed the migration: the documents database holding
//! per-record metadata keyed by `ContentId`, and the per-year content
//! database holding the raw bytes. Table names come from configuration and
//! are baked into the query strings at construction time.

use std::collections::HashMap;

use sqlx::{PgPool, Row};

use silo_core::{EnrichedMetadata, Result};

/// Legacy per-year content database.
#[derive(Clone)]
pub struct ContentDb {
    pool: PgPool,
    select_ids: String,
    select_content: String,
}

impl ContentDb {
    pub fn new(pool: PgPool, content_table: &str) -> Self {
        Self {
            select_ids: format!(r#"SELECT DISTINCT "ContentId" FROM "{}""#, content_table),
            select_content: format!(
                r#"SELECT "Content" FROM "{}" WHERE "ContentId" = $1"#,
                content_table
            ),
            pool,
        }
    }

    /// Every distinct ContentId present in the content table. Drives the
    /// seed phase.
    pub async fn distinct_content_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(&self.select_ids).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("ContentId"))
            .collect())
    }

    /// Raw bytes for one record, `None` when the row or its payload is
    /// absent.
    pub async fn fetch_content(&self, content_id: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query(&self.select_content)
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|row| row.get::<Option<Vec<u8>>, _>("Content")))
    }
}

/// Legacy documents metadata database.
#[derive(Clone)]
pub struct DocumentsDb {
    pool: PgPool,
    select_meta: String,
}

impl DocumentsDb {
    pub fn new(pool: PgPool, documents_table: &str) -> Self {
        Self {
            select_meta: format!(
                r#"SELECT "ContentId", "FileName", "Extension", "ContentType",
                          "FileSize", "RecordDate"
                   FROM "{}"
                   WHERE "DelStatus" = FALSE AND "ContentId" = ANY($1)"#,
                documents_table
            ),
            pool,
        }
    }

    /// Metadata for a batch of ContentIds, keyed by id. Records flagged as
    /// deleted are invisible here, which turns them into `skipped` rows.
    pub async fn fetch_metadata(
        &self,
        content_ids: &[String],
    ) -> Result<HashMap<String, EnrichedMetadata>> {
        let rows = sqlx::query(&self.select_meta)
            .bind(content_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let content_id: String = row.get("ContentId");
            map.insert(
                content_id,
                EnrichedMetadata {
                    original_filename: row.get("FileName"),
                    original_extension: row
                        .get::<Option<String>, _>("Extension")
                        .map(|ext| strip_leading_dot(&ext)),
                    claimed_content_type: row.get("ContentType"),
                    source_file_size: row.get("FileSize"),
                    source_record_date: row.get("RecordDate"),
                },
            );
        }
        Ok(map)
    }
}

/// Extensions are stored without their leading dot.
pub fn strip_leading_dot(ext: &str) -> String {
    ext.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_dot() {
        assert_eq!(strip_leading_dot(".pdf"), "pdf");
        assert_eq!(strip_leading_dot("pdf"), "pdf");
        assert_eq!(strip_leading_dot("..odd"), "odd");
        assert_eq!(strip_leading_dot(""), "");
    }
}
