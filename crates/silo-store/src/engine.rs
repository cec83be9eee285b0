//! Upload / download / delete / list orchestration.
//!
//! One upload runs sequentially from first byte to catalog commit: bytes
//! stream into a temp file while the SHA-256 state and the size counter
//! advance in the same order, the rename happens strictly after the last
//! byte and `finalize`, and the catalog insert strictly after the rename.

use std::io;
use std::time::Instant;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

use silo_core::defaults::{FALLBACK_EXTENSION, LIST_PAGE_SIZE_MAX};
use silo_core::hash::StreamingSha256;
use silo_core::{
    docid, mime, validate, Error, ObjectListPage, ObjectRecord, ObjectResponse, Result,
};
use silo_db::{Database, NewObject};

use crate::config::StoreConfig;
use crate::fs::BlobFilesystem;

/// How a download should present itself to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// An open blob ready to stream out, with its metadata row.
pub struct DownloadBundle {
    pub record: ObjectRecord,
    pub file: tokio::fs::File,
    /// On-disk length, verified equal to the catalog row's `size_bytes`.
    pub size_bytes: u64,
    pub disposition: Disposition,
}

/// Storage engine binding the catalog, the blob filesystem, and the
/// engine configuration.
#[derive(Clone)]
pub struct StorageEngine {
    db: Database,
    fs: BlobFilesystem,
    config: StoreConfig,
}

impl StorageEngine {
    pub fn new(db: Database, config: StoreConfig) -> Self {
        let fs = BlobFilesystem::new(&config.root_path);
        Self { db, fs, config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn filesystem(&self) -> &BlobFilesystem {
        &self.fs
    }

    /// Store an uploaded stream as a new object.
    ///
    /// The body is consumed exactly once; the first chunk is buffered for
    /// MIME identification and written to disk together with the rest.
    /// Any failure before the rename removes the temp file and prunes the
    /// directory; a lost insert race removes the already-renamed blob.
    pub async fn upload<S>(
        &self,
        bucket: &str,
        filename: &str,
        claimed_content_type: Option<&str>,
        year: Option<i32>,
        mut body: S,
    ) -> Result<ObjectResponse>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin + Send,
    {
        let start = Instant::now();

        validate::validate_bucket_name(bucket).map_err(Error::InvalidBucketName)?;
        validate::validate_object_key(filename).map_err(Error::InvalidFilename)?;

        if self.db.buckets.get(bucket).await?.is_none() {
            return Err(Error::BucketNotFound(bucket.to_string()));
        }
        if self.db.objects.exists(bucket, filename).await? {
            return Err(Error::ObjectAlreadyExists {
                bucket: bucket.to_string(),
                filename: filename.to_string(),
            });
        }

        let doc_id = docid::generate(year);
        let year = docid::extract_year(&doc_id).map_err(Error::Internal)?;

        // Buffer leading bytes for identification. Everything buffered here
        // is written to disk below in the same order.
        let mut buffered: Vec<Bytes> = Vec::new();
        let mut buffered_len = 0usize;
        while buffered_len < self.config.first_chunk_size {
            match body.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(Error::Io)?;
                    buffered_len += chunk.len();
                    buffered.push(chunk);
                }
                None => break,
            }
        }

        let mut detect_buf = Vec::with_capacity(buffered_len.min(self.config.first_chunk_size));
        for chunk in &buffered {
            let remaining = self.config.first_chunk_size - detect_buf.len();
            if remaining == 0 {
                break;
            }
            let take = remaining.min(chunk.len());
            detect_buf.extend_from_slice(&chunk[..take]);
        }

        let detection = mime::identify(&detect_buf, Some(filename), claimed_content_type);
        let (extension, downgraded) =
            storage_extension_for(detection.detected_extension.as_deref(), &self.config);
        if downgraded {
            warn!(
                subsystem = "store",
                component = "engine",
                op = "upload",
                bucket,
                filename,
                doc_id = %doc_id,
                detected_extension = detection.detected_extension.as_deref().unwrap_or(""),
                "detected extension not allow-listed, storing as bin"
            );
        }

        let dir = self.fs.blob_dir(&doc_id)?;
        self.fs.ensure_dir(&dir).await?;
        let (file, mut guard) = self.fs.create_temp(&dir).await?;
        let mut writer = BufWriter::with_capacity(self.config.upload_buffer_size, file);

        let mut hasher = StreamingSha256::new();
        let mut total: u64 = 0;

        for chunk in &buffered {
            total += chunk.len() as u64;
            if total > self.config.max_upload_bytes {
                return Err(Error::FileTooLarge {
                    max_bytes: self.config.max_upload_bytes,
                });
            }
            hasher.update(chunk);
            writer.write_all(chunk).await?;
        }

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(Error::Io)?;
            total += chunk.len() as u64;
            if total > self.config.max_upload_bytes {
                return Err(Error::FileTooLarge {
                    max_bytes: self.config.max_upload_bytes,
                });
            }
            hasher.update(&chunk);
            writer.write_all(&chunk).await?;
        }

        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_all().await?;
        drop(file);

        let digest = hasher.finalize();
        let blob = docid::blob_path(&dir, &extension);
        self.fs.promote(&docid::temp_path(&dir), &blob).await?;
        guard.disarm();

        let new = NewObject {
            bucket: bucket.to_string(),
            filename: filename.to_string(),
            doc_id: doc_id.clone(),
            year,
            size_bytes: total as i64,
            sha256: digest.to_vec(),
            served_content_type: detection.detected_content_type.clone(),
            detected_content_type: detection.detected_content_type.clone(),
            claimed_content_type: claimed_content_type.map(str::to_string),
            detected_extension: Some(extension),
            detection_method: detection.method,
            is_mismatch: detection.is_mismatch,
            is_dangerous_mismatch: detection.is_dangerous_mismatch,
        };

        let record = match self.db.objects.insert(new).await {
            Ok(record) => record,
            Err(e @ Error::ObjectAlreadyExists { .. }) => {
                // Lost the insert race to a concurrent upload of the same
                // key; this writer's blob is already renamed and must go.
                self.fs.remove_path(&blob).await;
                return Err(e);
            }
            Err(e) => {
                error!(
                    subsystem = "store",
                    component = "engine",
                    op = "upload",
                    doc_id = %doc_id,
                    blob_path = %blob.display(),
                    error = %e,
                    "catalog insert failed after rename; blob file orphaned"
                );
                return Err(e);
            }
        };

        info!(
            subsystem = "store",
            component = "engine",
            op = "upload",
            bucket,
            filename,
            doc_id = %record.doc_id,
            size_bytes = total,
            detection_method = %record.detection_method,
            duration_ms = start.elapsed().as_millis() as u64,
            "object stored"
        );

        Ok(ObjectResponse::from_record(&record))
    }

    /// Metadata lookup by DocId within a bucket.
    pub async fn metadata_by_id(&self, bucket: &str, doc_id: &str) -> Result<ObjectRecord> {
        self.db
            .objects
            .get_by_doc_id(bucket, doc_id)
            .await?
            .ok_or_else(|| Error::ObjectNotFound(doc_id.to_string()))
    }

    /// Metadata lookup by original key within a bucket.
    pub async fn metadata_by_name(&self, bucket: &str, filename: &str) -> Result<ObjectRecord> {
        self.db
            .objects
            .get_by_name(bucket, filename)
            .await?
            .ok_or_else(|| Error::ObjectNotFound(format!("{}/{}", bucket, filename)))
    }

    /// Cross-bucket metadata lookup by DocId.
    pub async fn metadata_global(&self, doc_id: &str) -> Result<ObjectRecord> {
        self.db
            .objects
            .get_by_doc_id_global(doc_id)
            .await?
            .ok_or_else(|| Error::ObjectNotFound(doc_id.to_string()))
    }

    /// Open a blob for streaming out.
    ///
    /// The on-disk length must match the catalog row; a shorter or longer
    /// file means the blob was truncated or replaced outside the engine and
    /// is reported as a storage error rather than served with wrong
    /// headers.
    pub async fn open_download(&self, record: ObjectRecord) -> Result<DownloadBundle> {
        let (file, size_bytes) = self.fs.open_blob(&record).await?;
        if size_bytes != record.size_bytes as u64 {
            warn!(
                subsystem = "store",
                component = "engine",
                op = "download",
                doc_id = %record.doc_id,
                size_bytes,
                expected = record.size_bytes,
                "blob size does not match catalog row"
            );
            return Err(Error::Storage(format!(
                "blob for {} is {} bytes on disk, catalog says {}",
                record.doc_id, size_bytes, record.size_bytes
            )));
        }
        Ok(DownloadBundle {
            disposition: self.disposition(&record),
            record,
            file,
            size_bytes,
        })
    }

    /// Disposition decision for a record.
    pub fn disposition(&self, record: &ObjectRecord) -> Disposition {
        choose_disposition(record, &self.config)
    }

    /// Delete by DocId: catalog row first, then best-effort blob removal.
    pub async fn delete_by_id(&self, bucket: &str, doc_id: &str) -> Result<()> {
        let record = self
            .db
            .objects
            .delete_by_doc_id(bucket, doc_id)
            .await?
            .ok_or_else(|| Error::ObjectNotFound(doc_id.to_string()))?;
        self.remove_blob_best_effort(&record).await;
        Ok(())
    }

    /// Delete by original key.
    pub async fn delete_by_name(&self, bucket: &str, filename: &str) -> Result<()> {
        let record = self
            .db
            .objects
            .delete_by_name(bucket, filename)
            .await?
            .ok_or_else(|| Error::ObjectNotFound(format!("{}/{}", bucket, filename)))?;
        self.remove_blob_best_effort(&record).await;
        Ok(())
    }

    /// Cross-bucket delete by DocId.
    pub async fn delete_global(&self, doc_id: &str) -> Result<()> {
        let record = self
            .db
            .objects
            .delete_by_doc_id_global(doc_id)
            .await?
            .ok_or_else(|| Error::ObjectNotFound(doc_id.to_string()))?;
        self.remove_blob_best_effort(&record).await;
        Ok(())
    }

    /// Page through a bucket's objects.
    pub async fn list_objects(
        &self,
        bucket: &str,
        page: i64,
        page_size: i64,
        prefix: Option<&str>,
    ) -> Result<ObjectListPage> {
        if self.db.buckets.get(bucket).await?.is_none() {
            return Err(Error::BucketNotFound(bucket.to_string()));
        }

        let page = page.max(1);
        let page_size = page_size.clamp(1, LIST_PAGE_SIZE_MAX);
        let (records, total) = self.db.objects.list(bucket, page, page_size, prefix).await?;

        Ok(ObjectListPage {
            bucket: bucket.to_string(),
            page,
            page_size,
            total,
            objects: records.iter().map(ObjectResponse::from_record).collect(),
        })
    }

    /// Blob-deletion errors after a successful row removal are logged but
    /// never surfaced.
    async fn remove_blob_best_effort(&self, record: &ObjectRecord) {
        if let Err(e) = self.fs.remove_blob(record).await {
            warn!(
                subsystem = "store",
                component = "engine",
                op = "delete",
                doc_id = %record.doc_id,
                error = %e,
                "blob removal failed after row delete"
            );
        }
    }
}

/// Extension used for the on-disk blob name, with the allow-list downgrade.
///
/// Returns the final extension and whether a downgrade happened.
fn storage_extension_for(detected: Option<&str>, config: &StoreConfig) -> (String, bool) {
    let ext = detected.unwrap_or(FALLBACK_EXTENSION);
    if config.is_extension_allowed(ext) {
        (ext.to_ascii_lowercase(), false)
    } else {
        (FALLBACK_EXTENSION.to_string(), true)
    }
}

fn choose_disposition(record: &ObjectRecord, config: &StoreConfig) -> Disposition {
    if record.is_dangerous_mismatch {
        Disposition::Attachment
    } else if config.is_inline_content_type(&record.served_content_type) {
        Disposition::Inline
    } else {
        Disposition::Attachment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silo_core::DetectionMethod;

    fn record(served: &str, dangerous: bool) -> ObjectRecord {
        ObjectRecord {
            id: 1,
            bucket: "b".into(),
            filename: "f".into(),
            doc_id: "2024-3f0d2a7e-1111-4111-8111-111111111111".into(),
            year: 2024,
            size_bytes: 1,
            sha256: vec![0u8; 32],
            served_content_type: served.into(),
            detected_content_type: served.into(),
            claimed_content_type: None,
            detected_extension: Some("bin".into()),
            detection_method: DetectionMethod::Magic,
            is_mismatch: dangerous,
            is_dangerous_mismatch: dangerous,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_dangerous_mismatch_forces_attachment() {
        let config = StoreConfig::default();
        // application/pdf is inline-listed, but the mismatch wins
        let rec = record("application/pdf", true);
        assert_eq!(choose_disposition(&rec, &config), Disposition::Attachment);
    }

    #[test]
    fn test_inline_listed_type_is_inline() {
        let config = StoreConfig::default();
        let rec = record("application/pdf", false);
        assert_eq!(choose_disposition(&rec, &config), Disposition::Inline);
    }

    #[test]
    fn test_unlisted_type_is_attachment() {
        let config = StoreConfig::default();
        let rec = record("application/zip", false);
        assert_eq!(choose_disposition(&rec, &config), Disposition::Attachment);
    }

    #[test]
    fn test_storage_extension_passthrough() {
        let config = StoreConfig::default();
        assert_eq!(
            storage_extension_for(Some("pdf"), &config),
            ("pdf".to_string(), false)
        );
    }

    #[test]
    fn test_storage_extension_downgrades_unlisted() {
        let config = StoreConfig::default();
        assert_eq!(
            storage_extension_for(Some("exe"), &config),
            ("bin".to_string(), true)
        );
    }

    #[test]
    fn test_storage_extension_none_is_bin_without_downgrade() {
        let config = StoreConfig::default();
        assert_eq!(
            storage_extension_for(None, &config),
            ("bin".to_string(), false)
        );
    }
}
