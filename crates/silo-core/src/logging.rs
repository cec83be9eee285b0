//! Structured logging schema and field name constants for silo.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → engine → filesystem calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "store", "db", "migrate"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "engine", "blobfs", "pool", "worker", "upload_client"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "upload", "download", "seed", "enrich", "process_document"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Bucket the operation targets.
pub const BUCKET: &str = "bucket";

/// Object key (original filename) the operation targets.
pub const FILENAME: &str = "filename";

/// DocId of the object being operated on.
pub const DOC_ID: &str = "doc_id";

/// Filesystem path of a blob or temp file.
pub const BLOB_PATH: &str = "blob_path";

/// Legacy ContentId of a migration row.
pub const CONTENT_ID: &str = "content_id";

/// Source year a migration run is pinned to.
pub const SOURCE_YEAR: &str = "source_year";

/// Shard key of a migration worker.
pub const WORKER_TOKEN: &str = "worker_token";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Byte size of an object or payload.
pub const SIZE_BYTES: &str = "size_bytes";

/// Number of rows affected or returned.
pub const ROW_COUNT: &str = "row_count";

/// Migration retry counter.
pub const RETRY_COUNT: &str = "retry_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
