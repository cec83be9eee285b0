//! Migration worker configuration.
//!
//! All options come from environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MIGRATE_SOURCE_DATABASE_URL` | (required) | Legacy documents database |
//! | `MIGRATE_CONTENT_DATABASE_URL` | (required) | Legacy per-year content database |
//! | `MIGRATE_LOG_DATABASE_URL` | (required) | Migration log database |
//! | `MIGRATE_TARGET_API_BASE_URL` | (required) | Storage engine base URL |
//! | `MIGRATE_YEAR` | (required) | Source year this run is pinned to |
//! | `MIGRATE_TARGET_BUCKET` | (required) | Destination bucket |
//! | `MIGRATE_DOCUMENTS_TABLE` | `Documents` | Legacy metadata table |
//! | `MIGRATE_CONTENT_TABLE` | `DocumentsContent` | Legacy content table |
//! | `MIGRATE_BATCH_SIZE` | 100 | Rows per selection batch |
//! | `MIGRATE_MAX_PARALLELISM` | 4 | Concurrent document transfers |
//! | `MIGRATE_MAX_RETRIES` | 3 | Attempts before permanent failure |
//! | `MIGRATE_WORKER_TOKEN` | (none) | Shard key of this worker |

use silo_core::defaults;
use silo_core::{Error, Result};

/// Runtime options of one migration worker process.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub source_database_url: String,
    pub content_database_url: String,
    pub log_database_url: String,
    pub target_api_base_url: String,
    pub year: i32,
    pub documents_table: String,
    pub content_table: String,
    pub target_bucket: String,
    pub batch_size: i64,
    pub max_parallelism: usize,
    pub max_retries: i32,
    pub worker_token: Option<i32>,
}

impl MigrationConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| Error::Config(format!("{} must be set", name)))
        };

        let year: i32 = required("MIGRATE_YEAR")?
            .parse()
            .map_err(|_| Error::Config("MIGRATE_YEAR must be a year number".into()))?;

        let documents_table =
            lookup("MIGRATE_DOCUMENTS_TABLE").unwrap_or_else(|| "Documents".to_string());
        let content_table =
            lookup("MIGRATE_CONTENT_TABLE").unwrap_or_else(|| "DocumentsContent".to_string());
        validate_table_name(&documents_table)?;
        validate_table_name(&content_table)?;

        let worker_token = match lookup("MIGRATE_WORKER_TOKEN") {
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| Error::Config("MIGRATE_WORKER_TOKEN must be an integer".into()))?,
            ),
            None => None,
        };

        Ok(Self {
            source_database_url: required("MIGRATE_SOURCE_DATABASE_URL")?,
            content_database_url: required("MIGRATE_CONTENT_DATABASE_URL")?,
            log_database_url: required("MIGRATE_LOG_DATABASE_URL")?,
            target_api_base_url: required("MIGRATE_TARGET_API_BASE_URL")?,
            target_bucket: required("MIGRATE_TARGET_BUCKET")?,
            year,
            documents_table,
            content_table,
            batch_size: lookup("MIGRATE_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::MIGRATION_BATCH_SIZE)
                .max(1),
            max_parallelism: lookup("MIGRATE_MAX_PARALLELISM")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::MIGRATION_MAX_PARALLELISM)
                .max(1),
            max_retries: lookup("MIGRATE_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::MIGRATION_MAX_RETRIES)
                .max(0),
            worker_token,
        })
    }
}

/// Table names are interpolated into query strings at construction time and
/// must stay plain identifiers. They come from configuration only, never
/// from request data.
fn validate_table_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "table name '{}' must be a plain identifier",
            name
        )))
    }
}
