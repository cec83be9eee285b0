//! Domain models shared across the storage engine, HTTP layer, and the
//! migration pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::mime::DetectionMethod;

/// A named top-level container of objects.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Bucket with aggregate object statistics, as returned by list/get.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub object_count: i64,
    pub total_size_bytes: i64,
}

/// Request body for bucket creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBucketRequest {
    pub name: String,
}

/// Full catalog row for a stored object.
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub id: i64,
    pub bucket: String,
    pub filename: String,
    pub doc_id: String,
    pub year: i32,
    pub size_bytes: i64,
    /// Raw 32-byte SHA-256 digest of the blob.
    pub sha256: Vec<u8>,
    pub served_content_type: String,
    pub detected_content_type: String,
    pub claimed_content_type: Option<String>,
    pub detected_extension: Option<String>,
    pub detection_method: DetectionMethod,
    pub is_mismatch: bool,
    pub is_dangerous_mismatch: bool,
    pub created_at: DateTime<Utc>,
}

impl ObjectRecord {
    pub fn sha256_hex(&self) -> String {
        hex::encode(&self.sha256)
    }

    /// Extension used for the on-disk blob name.
    pub fn storage_extension(&self) -> &str {
        self.detected_extension
            .as_deref()
            .unwrap_or(crate::defaults::FALLBACK_EXTENSION)
    }
}

/// Wire representation of an object, returned by upload and metadata reads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResponse {
    pub bucket: String,
    pub filename: String,
    pub doc_id: String,
    pub year: i32,
    pub size_bytes: i64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
    pub served_content_type: String,
    pub detected_content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_extension: Option<String>,
    pub detection_method: DetectionMethod,
    pub is_mismatch: bool,
    pub is_dangerous_mismatch: bool,
    pub created_at: DateTime<Utc>,
    /// Canonical download URL by DocId.
    pub download_url: String,
    /// Canonical download URL by original key.
    pub download_by_name_url: String,
}

impl ObjectResponse {
    pub fn from_record(record: &ObjectRecord) -> Self {
        Self {
            bucket: record.bucket.clone(),
            filename: record.filename.clone(),
            doc_id: record.doc_id.clone(),
            year: record.year,
            size_bytes: record.size_bytes,
            sha256: record.sha256_hex(),
            served_content_type: record.served_content_type.clone(),
            detected_content_type: record.detected_content_type.clone(),
            claimed_content_type: record.claimed_content_type.clone(),
            detected_extension: record.detected_extension.clone(),
            detection_method: record.detection_method,
            is_mismatch: record.is_mismatch,
            is_dangerous_mismatch: record.is_dangerous_mismatch,
            created_at: record.created_at,
            download_url: format!(
                "/api/buckets/{}/objects/{}",
                record.bucket, record.doc_id
            ),
            download_by_name_url: format!(
                "/api/buckets/{}/objects/by-name/{}",
                record.bucket,
                urlencoding::encode(&record.filename)
            ),
        }
    }
}

/// One page of an object listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectListPage {
    pub bucket: String,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub objects: Vec<ObjectResponse>,
}

// =============================================================================
// MIGRATION
// =============================================================================

/// Lifecycle state of a migration log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Seeded,
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Seeded => "seeded",
            MigrationStatus::Pending => "pending",
            MigrationStatus::InProgress => "in_progress",
            MigrationStatus::Completed => "completed",
            MigrationStatus::Failed => "failed",
            MigrationStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "seeded" => Some(MigrationStatus::Seeded),
            "pending" => Some(MigrationStatus::Pending),
            "in_progress" => Some(MigrationStatus::InProgress),
            "completed" => Some(MigrationStatus::Completed),
            "failed" => Some(MigrationStatus::Failed),
            "skipped" => Some(MigrationStatus::Skipped),
            _ => None,
        }
    }

    /// Terminal states carry a `processed_at` timestamp.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationStatus::Completed | MigrationStatus::Failed | MigrationStatus::Skipped
        )
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata pulled from the legacy documents database during enrichment.
#[derive(Debug, Clone, Default)]
pub struct EnrichedMetadata {
    pub original_filename: Option<String>,
    /// Stored without its leading dot.
    pub original_extension: Option<String>,
    pub claimed_content_type: Option<String>,
    pub source_file_size: Option<i64>,
    pub source_record_date: Option<DateTime<Utc>>,
}

/// Target-side facts recorded when a row completes.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub target_doc_id: Option<String>,
    pub target_bucket: String,
    pub target_filename: String,
    pub target_sha256: Option<String>,
    pub detected_content_type: Option<String>,
}

/// One row of the migration log.
#[derive(Debug, Clone)]
pub struct MigrationLogEntry {
    pub id: i64,
    pub source_year: i32,
    /// Legacy ContentId.
    pub source_document_id: String,
    pub original_filename: Option<String>,
    pub original_extension: Option<String>,
    pub claimed_content_type: Option<String>,
    pub source_file_size: Option<i64>,
    pub source_record_date: Option<DateTime<Utc>>,
    pub status: MigrationStatus,
    pub target_doc_id: Option<String>,
    pub target_bucket: Option<String>,
    pub target_filename: Option<String>,
    pub target_sha256: Option<String>,
    pub detected_content_type: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub worker_token: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ObjectRecord {
        ObjectRecord {
            id: 7,
            bucket: "invoices".into(),
            filename: "report final.pdf".into(),
            doc_id: "2024-3f0d2a7e-1111-4111-8111-111111111111".into(),
            year: 2024,
            size_bytes: 1234,
            sha256: vec![0xab; 32],
            served_content_type: "application/pdf".into(),
            detected_content_type: "application/pdf".into(),
            claimed_content_type: None,
            detected_extension: Some("pdf".into()),
            detection_method: DetectionMethod::Magic,
            is_mismatch: false,
            is_dangerous_mismatch: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sha256_hex_is_64_chars() {
        assert_eq!(sample_record().sha256_hex().len(), 64);
    }

    #[test]
    fn test_response_urls() {
        let resp = ObjectResponse::from_record(&sample_record());
        assert_eq!(
            resp.download_url,
            "/api/buckets/invoices/objects/2024-3f0d2a7e-1111-4111-8111-111111111111"
        );
        assert_eq!(
            resp.download_by_name_url,
            "/api/buckets/invoices/objects/by-name/report%20final.pdf"
        );
    }

    #[test]
    fn test_storage_extension_falls_back_to_bin() {
        let mut record = sample_record();
        record.detected_extension = None;
        assert_eq!(record.storage_extension(), "bin");
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let json = serde_json::to_value(ObjectResponse::from_record(&sample_record())).unwrap();
        assert!(json.get("docId").is_some());
        assert!(json.get("sizeBytes").is_some());
        assert!(json.get("servedContentType").is_some());
        assert!(json.get("detectedContentType").is_some());
        assert!(json.get("isDangerousMismatch").is_some());
        assert_eq!(json["detectionMethod"], "magic");
        // Absent optionals are omitted entirely
        assert!(json.get("claimedContentType").is_none());
    }

    #[test]
    fn test_migration_status_round_trip() {
        for status in [
            MigrationStatus::Seeded,
            MigrationStatus::Pending,
            MigrationStatus::InProgress,
            MigrationStatus::Completed,
            MigrationStatus::Failed,
            MigrationStatus::Skipped,
        ] {
            assert_eq!(MigrationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MigrationStatus::parse("nope"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(MigrationStatus::Completed.is_terminal());
        assert!(MigrationStatus::Failed.is_terminal());
        assert!(MigrationStatus::Skipped.is_terminal());
        assert!(!MigrationStatus::Seeded.is_terminal());
        assert!(!MigrationStatus::Pending.is_terminal());
        assert!(!MigrationStatus::InProgress.is_terminal());
    }
}
