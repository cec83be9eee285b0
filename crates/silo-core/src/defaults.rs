//! Centralized default constants for the silo system.
//!
//! **This module is the single source of truth** for all shared default
//! values. The storage engine, the HTTP layer, and the migration worker
//! reference these constants instead of defining their own magic numbers.

// =============================================================================
// UPLOAD PIPELINE
// =============================================================================

/// Maximum accepted upload size in bytes (1 GiB).
pub const MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// Copy buffer size for streaming uploads (64 KiB).
pub const UPLOAD_BUFFER_SIZE: usize = 64 * 1024;

/// Number of leading bytes buffered for MIME identification (64 KiB).
pub const FIRST_CHUNK_SIZE: usize = 64 * 1024;

/// Extension applied when detection yields nothing usable.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Extensions accepted for on-disk blob names. Anything else is downgraded
/// to [`FALLBACK_EXTENSION`].
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "gif", "webp", "bmp", "tif", "zip", "gz", "7z", "rar", "doc", "docx",
    "xls", "xlsx", "ppt", "pptx", "msg", "odt", "ods", "rtf", "txt", "csv", "xml", "json", "html",
    "mp3", "wav", "ogg", "flac", "mp4", "avi", "mkv", "mov", "webm", "bin",
];

/// Served content types that may render inline in the browser. Everything
/// else is forced to `attachment` disposition.
pub const INLINE_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "text/plain",
];

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for object listings.
pub const LIST_PAGE_SIZE: i64 = 100;

/// Hard cap on object-listing page size.
pub const LIST_PAGE_SIZE_MAX: i64 = 1000;

// =============================================================================
// MIGRATION
// =============================================================================

/// Rows fetched per migration batch.
pub const MIGRATION_BATCH_SIZE: i64 = 100;

/// Concurrent document transfers per worker process.
pub const MIGRATION_MAX_PARALLELISM: usize = 4;

/// Attempts before a row is permanently failed.
pub const MIGRATION_MAX_RETRIES: i32 = 3;

/// Upper bound on stored error messages, in characters.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 2000;

/// Per-call timeout of the migration upload client, in seconds.
pub const UPLOAD_CLIENT_TIMEOUT_SECS: u64 = 300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_chunk_fits_in_upload_buffer_scale() {
        assert_eq!(FIRST_CHUNK_SIZE, UPLOAD_BUFFER_SIZE);
    }

    #[test]
    fn test_fallback_extension_is_allowed() {
        assert!(ALLOWED_EXTENSIONS.contains(&FALLBACK_EXTENSION));
    }

    #[test]
    fn test_max_upload_is_one_gib() {
        assert_eq!(MAX_UPLOAD_BYTES, 1_073_741_824);
    }
}
