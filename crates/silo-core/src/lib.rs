//! # silo-core
//!
//! Core types and pure logic for the silo blob storage service:
//!
//! - Bucket and object-key validation rules
//! - Incremental SHA-256 hashing
//! - Multi-layer MIME identification
//! - DocId generation and blob path construction
//! - Shared domain models, defaults, and the structured-logging schema

pub mod defaults;
pub mod docid;
pub mod error;
pub mod hash;
pub mod logging;
pub mod mime;
pub mod models;
pub mod validate;

pub use error::{Error, Result};
pub use mime::{identify, DetectionMethod, MimeDetection};
pub use models::{
    Bucket, BucketSummary, CreateBucketRequest, EnrichedMetadata, MigrationLogEntry,
    MigrationOutcome, MigrationStatus, ObjectListPage, ObjectRecord, ObjectResponse,
};
pub use validate::{normalize_object_key, validate_bucket_name, validate_object_key};
