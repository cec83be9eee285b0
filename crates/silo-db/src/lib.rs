//! # silo-db
//!
//! PostgreSQL persistence layer for silo:
//!
//! - Connection pool management
//! - Catalog repositories for buckets and objects
//! - The migration log with its idempotent schema provisioning
//!
//! ## Example
//!
//! ```rust,ignore
//! use silo_db::Database;
//!
//! let db = Database::connect("postgres://localhost/silo").await?;
//! let bucket = db.buckets.insert("invoices").await?;
//! ```

pub mod buckets;
pub mod migration_log;
pub mod objects;
pub mod pool;

// Re-export core types
pub use silo_core::*;

pub use buckets::PgBucketRepository;
pub use migration_log::{truncate_error_message, PgMigrationLogRepository};
pub use objects::{NewObject, PgObjectRepository};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined catalog database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::PgPool,
    /// Bucket repository.
    pub buckets: PgBucketRepository,
    /// Object repository.
    pub objects: PgObjectRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            buckets: PgBucketRepository::new(pool.clone()),
            objects: PgObjectRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending catalog migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
