//! Bucket catalog repository.

use sqlx::{PgPool, Row};

use silo_core::{Bucket, BucketSummary, Error, Result};

/// PostgreSQL repository for the `buckets` table.
#[derive(Clone)]
pub struct PgBucketRepository {
    pool: PgPool,
}

impl PgBucketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new bucket row.
    ///
    /// A duplicate name surfaces as [`Error::BucketAlreadyExists`]; the
    /// unique index on `name` serializes concurrent creators.
    pub async fn insert(&self, name: &str) -> Result<Bucket> {
        let row = sqlx::query(
            "INSERT INTO buckets (name) VALUES ($1) RETURNING name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)
        .map_err(|e| {
            if e.is_unique_violation() {
                Error::BucketAlreadyExists(name.to_string())
            } else {
                e
            }
        })?;

        Ok(Bucket {
            name: row.get("name"),
            created_at: row.get("created_at"),
        })
    }

    /// Fetch a bucket by name.
    pub async fn get(&self, name: &str) -> Result<Option<Bucket>> {
        let row = sqlx::query("SELECT name, created_at FROM buckets WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Bucket {
            name: row.get("name"),
            created_at: row.get("created_at"),
        }))
    }

    /// Fetch a bucket with aggregate object counts.
    pub async fn get_summary(&self, name: &str) -> Result<Option<BucketSummary>> {
        let row = sqlx::query(
            r#"SELECT b.name, b.created_at,
                      COUNT(o.id) AS object_count,
                      COALESCE(SUM(o.size_bytes), 0)::BIGINT AS total_size_bytes
               FROM buckets b
               LEFT JOIN objects o ON o.bucket = b.name
               WHERE b.name = $1
               GROUP BY b.name, b.created_at"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| BucketSummary {
            name: row.get("name"),
            created_at: row.get("created_at"),
            object_count: row.get("object_count"),
            total_size_bytes: row.get("total_size_bytes"),
        }))
    }

    /// List all buckets with aggregate object counts, ordered by name.
    pub async fn list_summaries(&self) -> Result<Vec<BucketSummary>> {
        let rows = sqlx::query(
            r#"SELECT b.name, b.created_at,
                      COUNT(o.id) AS object_count,
                      COALESCE(SUM(o.size_bytes), 0)::BIGINT AS total_size_bytes
               FROM buckets b
               LEFT JOIN objects o ON o.bucket = b.name
               GROUP BY b.name, b.created_at
               ORDER BY b.name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BucketSummary {
                name: row.get("name"),
                created_at: row.get("created_at"),
                object_count: row.get("object_count"),
                total_size_bytes: row.get("total_size_bytes"),
            })
            .collect())
    }

    /// Number of objects currently stored in a bucket.
    pub async fn object_count(&self, name: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM objects WHERE bucket = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Delete a bucket row. The caller verifies emptiness first; the FK
    /// restriction backstops a racing insert.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM buckets WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::BucketNotFound(name.to_string()));
        }
        Ok(())
    }
}
