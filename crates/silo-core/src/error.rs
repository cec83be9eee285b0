//! Error types for silo.

use thiserror::Error;

/// Result type alias using silo's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for silo operations.
///
/// Each variant corresponds to one of the error codes surfaced by the HTTP
/// layer; the mapping to status codes lives in `silo-api`.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bucket does not exist
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Bucket name already taken
    #[error("Bucket already exists: {0}")]
    BucketAlreadyExists(String),

    /// Bucket still holds objects and cannot be deleted
    #[error("Bucket not empty: {0}")]
    BucketNotEmpty(String),

    /// Bucket name violates the naming rules
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Object row missing for the requested identifier
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// An object with the same (bucket, filename) already exists
    #[error("Object already exists: {bucket}/{filename}")]
    ObjectAlreadyExists { bucket: String, filename: String },

    /// Object key violates the naming rules
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// Upload exceeded the configured size cap
    #[error("File too large: exceeds {max_bytes} bytes")]
    FileTooLarge { max_bytes: u64 },

    /// Content type rejected at the boundary
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Blob file missing or unusable although the catalog row exists
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable error code, used in the HTTP error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BucketNotFound(_) => "BucketNotFound",
            Error::BucketAlreadyExists(_) => "BucketAlreadyExists",
            Error::BucketNotEmpty(_) => "BucketNotEmpty",
            Error::InvalidBucketName(_) => "InvalidBucketName",
            Error::ObjectNotFound(_) => "ObjectNotFound",
            Error::ObjectAlreadyExists { .. } => "ObjectAlreadyExists",
            Error::InvalidFilename(_) => "InvalidFilename",
            Error::FileTooLarge { .. } => "FileTooLarge",
            Error::InvalidContentType(_) => "InvalidContentType",
            Error::Storage(_) => "StorageError",
            Error::Database(_) | Error::Request(_) | Error::Config(_) | Error::Internal(_) => {
                "InternalError"
            }
            Error::Io(_) => "InternalError",
        }
    }

    /// Whether a unique-constraint violation underlies this database error.
    ///
    /// PostgreSQL reports unique violations as SQLSTATE 23505.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("serialization: {}", e))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_bucket_not_found() {
        let err = Error::BucketNotFound("invoices".to_string());
        assert_eq!(err.to_string(), "Bucket not found: invoices");
    }

    #[test]
    fn test_error_display_object_already_exists() {
        let err = Error::ObjectAlreadyExists {
            bucket: "invoices".to_string(),
            filename: "dup.txt".to_string(),
        };
        assert_eq!(err.to_string(), "Object already exists: invoices/dup.txt");
    }

    #[test]
    fn test_error_display_file_too_large() {
        let err = Error::FileTooLarge {
            max_bytes: 1_073_741_824,
        };
        assert!(err.to_string().contains("1073741824"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::BucketNotFound("b".into()).code(), "BucketNotFound");
        assert_eq!(
            Error::BucketAlreadyExists("b".into()).code(),
            "BucketAlreadyExists"
        );
        assert_eq!(Error::BucketNotEmpty("b".into()).code(), "BucketNotEmpty");
        assert_eq!(
            Error::InvalidBucketName("b".into()).code(),
            "InvalidBucketName"
        );
        assert_eq!(Error::ObjectNotFound("x".into()).code(), "ObjectNotFound");
        assert_eq!(
            Error::ObjectAlreadyExists {
                bucket: "b".into(),
                filename: "f".into()
            }
            .code(),
            "ObjectAlreadyExists"
        );
        assert_eq!(Error::InvalidFilename("f".into()).code(), "InvalidFilename");
        assert_eq!(Error::FileTooLarge { max_bytes: 1 }.code(), "FileTooLarge");
        assert_eq!(
            Error::InvalidContentType("t".into()).code(),
            "InvalidContentType"
        );
        assert_eq!(Error::Storage("s".into()).code(), "StorageError");
        assert_eq!(Error::Internal("i".into()).code(), "InternalError");
        assert_eq!(Error::Request("r".into()).code(), "InternalError");
    }

    #[test]
    fn test_io_error_code_is_internal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert_eq!(err.code(), "InternalError");
    }

    #[test]
    fn test_is_unique_violation_false_for_non_database() {
        assert!(!Error::Internal("x".into()).is_unique_violation());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_unique_violation());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
