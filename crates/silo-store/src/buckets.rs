//! Bucket lifecycle management.

use tracing::{info, warn};

use silo_core::{validate, Bucket, BucketSummary, Error, Result};
use silo_db::Database;

/// Create/list/get/delete buckets with the emptiness check on delete.
#[derive(Clone)]
pub struct BucketManager {
    db: Database,
}

impl BucketManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a bucket. Duplicate names surface as
    /// [`Error::BucketAlreadyExists`].
    pub async fn create(&self, name: &str) -> Result<BucketSummary> {
        validate::validate_bucket_name(name).map_err(Error::InvalidBucketName)?;
        let bucket = self.db.buckets.insert(name).await?;
        info!(
            subsystem = "store",
            component = "buckets",
            op = "create",
            bucket = name,
            "bucket created"
        );
        Ok(fresh_summary(bucket))
    }

    /// Idempotent create: returns the existing bucket on conflict.
    pub async fn ensure(&self, name: &str) -> Result<BucketSummary> {
        match self.create(name).await {
            Ok(summary) => Ok(summary),
            Err(Error::BucketAlreadyExists(_)) => self.get(name).await,
            Err(e) => Err(e),
        }
    }

    /// Fetch a bucket with aggregate counts.
    pub async fn get(&self, name: &str) -> Result<BucketSummary> {
        self.db
            .buckets
            .get_summary(name)
            .await?
            .ok_or_else(|| Error::BucketNotFound(name.to_string()))
    }

    /// List all buckets with aggregate counts.
    pub async fn list(&self) -> Result<Vec<BucketSummary>> {
        self.db.buckets.list_summaries().await
    }

    /// Delete a bucket, refusing while it still holds objects.
    pub async fn delete(&self, name: &str) -> Result<()> {
        if self.db.buckets.get(name).await?.is_none() {
            return Err(Error::BucketNotFound(name.to_string()));
        }
        if self.db.buckets.object_count(name).await? > 0 {
            return Err(Error::BucketNotEmpty(name.to_string()));
        }
        self.db.buckets.delete(name).await?;
        info!(
            subsystem = "store",
            component = "buckets",
            op = "delete",
            bucket = name,
            "bucket deleted"
        );
        Ok(())
    }

    /// Ensure the configured default buckets exist at startup. Invalid
    /// names are logged and skipped rather than failing the boot.
    pub async fn seed_defaults(&self, names: &[String]) -> Result<()> {
        for name in names {
            match self.ensure(name).await {
                Ok(_) => {}
                Err(Error::InvalidBucketName(reason)) => {
                    warn!(
                        subsystem = "store",
                        component = "buckets",
                        op = "seed_defaults",
                        bucket = %name,
                        error = %reason,
                        "skipping invalid default bucket name"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn fresh_summary(bucket: Bucket) -> BucketSummary {
    BucketSummary {
        name: bucket.name,
        created_at: bucket.created_at,
        object_count: 0,
        total_size_bytes: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_fresh_summary_has_zero_counts() {
        let summary = fresh_summary(Bucket {
            name: "invoices".into(),
            created_at: Utc::now(),
        });
        assert_eq!(summary.name, "invoices");
        assert_eq!(summary.object_count, 0);
        assert_eq!(summary.total_size_bytes, 0);
    }
}
