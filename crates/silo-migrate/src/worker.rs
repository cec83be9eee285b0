//! Migration worker: seed → enrich → migrate → report.
//!
//! Each phase is safe to re-run. Seeding and enrichment operate on set
//! differences, and the migrate phase treats a server-side conflict as
//! success, so an interrupted run resumes exactly where it stopped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use silo_core::{Error, MigrationLogEntry, MigrationOutcome, Result};
use silo_db::{create_pool, PgMigrationLogRepository};

use crate::client::UploadClient;
use crate::config::MigrationConfig;
use crate::source::{ContentDb, DocumentsDb};

/// Per-run counters, bumped with atomic adds from concurrent tasks.
#[derive(Debug, Default)]
pub struct RunCounters {
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub skipped: AtomicU64,
}

/// Terminal outcome of one document attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocOutcome {
    Completed,
    Failed,
    Skipped,
}

/// One migration worker process, pinned to a source year and optionally to
/// a shard token.
pub struct MigrationWorker {
    config: MigrationConfig,
    log: PgMigrationLogRepository,
    documents: DocumentsDb,
    processor: DocumentProcessor,
}

impl MigrationWorker {
    /// Connect to the three databases and build the upload client.
    pub async fn connect(config: MigrationConfig) -> Result<Self> {
        let log_pool = create_pool(&config.log_database_url).await?;
        let source_pool = create_pool(&config.source_database_url).await?;
        let content_pool = create_pool(&config.content_database_url).await?;

        let log = PgMigrationLogRepository::new(log_pool);
        let documents = DocumentsDb::new(source_pool, &config.documents_table);
        let content = ContentDb::new(content_pool, &config.content_table);
        let client = Arc::new(UploadClient::new(&config.target_api_base_url)?);

        let processor = DocumentProcessor {
            log: log.clone(),
            content,
            client,
            target_bucket: config.target_bucket.clone(),
        };

        Ok(Self {
            config,
            log,
            documents,
            processor,
        })
    }

    /// Run all phases once. Catastrophic startup failures (schema
    /// provisioning, bucket ensure) abort the run; per-row failures never
    /// do.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let start = Instant::now();
        info!(
            subsystem = "migrate",
            component = "worker",
            op = "run",
            source_year = self.config.year,
            worker_token = ?self.config.worker_token,
            "migration run starting"
        );

        self.log.ensure_schema().await?;

        if !self
            .processor
            .client
            .ensure_bucket_exists(&self.config.target_bucket)
            .await
        {
            return Err(Error::Config(format!(
                "target bucket '{}' could not be ensured",
                self.config.target_bucket
            )));
        }

        self.seed().await?;
        self.enrich().await?;
        let counters = self.migrate(&cancel).await?;
        self.report(&counters).await?;

        info!(
            subsystem = "migrate",
            component = "worker",
            op = "run",
            source_year = self.config.year,
            duration_ms = start.elapsed().as_millis() as u64,
            "migration run finished"
        );
        Ok(())
    }

    /// Seed: every distinct ContentId not yet in the log becomes a `seeded`
    /// row for this year.
    async fn seed(&self) -> Result<()> {
        let ids = self.processor.content.distinct_content_ids().await?;
        let inserted = self.log.seed(self.config.year, &ids).await?;
        info!(
            subsystem = "migrate",
            component = "worker",
            op = "seed",
            source_year = self.config.year,
            row_count = ids.len(),
            inserted,
            "seed phase done"
        );
        Ok(())
    }

    /// Enrich: look up legacy metadata for every seeded row; rows without a
    /// live metadata record terminate as `skipped`.
    async fn enrich(&self) -> Result<()> {
        let mut enriched = 0u64;
        let mut skipped = 0u64;

        loop {
            let batch = self
                .log
                .seeded_batch(self.config.year, self.config.batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            let ids: Vec<String> = batch
                .iter()
                .map(|entry| entry.source_document_id.clone())
                .collect();
            let metadata = self.documents.fetch_metadata(&ids).await?;

            for entry in batch {
                match metadata.get(&entry.source_document_id) {
                    Some(meta) => {
                        self.log.enrich(entry.id, meta).await?;
                        enriched += 1;
                    }
                    None => {
                        self.log.skip(entry.id, "no metadata found").await?;
                        skipped += 1;
                    }
                }
            }
        }

        info!(
            subsystem = "migrate",
            component = "worker",
            op = "enrich",
            source_year = self.config.year,
            enriched,
            skipped,
            "enrich phase done"
        );
        Ok(())
    }

    /// Migrate: batch-select eligible rows and transfer them with bounded
    /// parallelism until the selection runs dry or cancellation is
    /// requested. In-flight documents finish; no new batch is fetched.
    async fn migrate(&self, cancel: &CancellationToken) -> Result<RunCounters> {
        let counters = RunCounters::default();
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallelism));

        while !cancel.is_cancelled() {
            let batch = self
                .log
                .select_batch(
                    self.config.year,
                    self.config.worker_token,
                    self.config.batch_size,
                    self.config.max_retries,
                )
                .await?;
            if batch.is_empty() {
                break;
            }

            let mut tasks = JoinSet::new();
            for entry in batch {
                if cancel.is_cancelled() {
                    // Unstarted rows stay pending for the next run.
                    break;
                }
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::Internal("semaphore closed".into()))?;
                let processor = self.processor.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    processor.process_document(entry).await
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(DocOutcome::Completed) => {
                        counters.completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(DocOutcome::Failed) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(DocOutcome::Skipped) => {
                        counters.skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!(
                            subsystem = "migrate",
                            component = "worker",
                            error = ?e,
                            "document task panicked"
                        );
                    }
                }
            }
        }

        info!(
            subsystem = "migrate",
            component = "worker",
            op = "migrate",
            source_year = self.config.year,
            completed = counters.completed.load(Ordering::Relaxed),
            failed = counters.failed.load(Ordering::Relaxed),
            skipped = counters.skipped.load(Ordering::Relaxed),
            cancelled = cancel.is_cancelled(),
            "migrate phase done"
        );
        Ok(counters)
    }

    /// Report: log per-status totals for this year/token plus the rows that
    /// burned through every retry.
    async fn report(&self, counters: &RunCounters) -> Result<()> {
        let counts = self
            .log
            .status_counts(self.config.year, self.config.worker_token)
            .await?;
        for (status, count) in &counts {
            info!(
                subsystem = "migrate",
                component = "worker",
                op = "report",
                source_year = self.config.year,
                status = %status,
                count,
                "log status total"
            );
        }

        let exhausted = self
            .log
            .exhausted_count(
                self.config.year,
                self.config.worker_token,
                self.config.max_retries,
            )
            .await?;
        info!(
            subsystem = "migrate",
            component = "worker",
            op = "report",
            source_year = self.config.year,
            completed_this_run = counters.completed.load(Ordering::Relaxed),
            failed_this_run = counters.failed.load(Ordering::Relaxed),
            skipped_this_run = counters.skipped.load(Ordering::Relaxed),
            permanently_failed = exhausted,
            "migration report"
        );
        Ok(())
    }
}

/// Reference bundle cloned into each spawned document task.
#[derive(Clone)]
struct DocumentProcessor {
    log: PgMigrationLogRepository,
    content: ContentDb,
    client: Arc<UploadClient>,
    target_bucket: String,
}

impl DocumentProcessor {
    /// Process one row through `in_progress` to a terminal state.
    ///
    /// Unhandled errors during the attempt fail the row with the error text;
    /// save errors inside that handler are themselves ignored so one broken
    /// row can never take the worker down.
    async fn process_document(&self, entry: MigrationLogEntry) -> DocOutcome {
        let id = entry.id;
        let content_id = entry.source_document_id.clone();
        match self.try_process(entry).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    subsystem = "migrate",
                    component = "worker",
                    op = "process_document",
                    content_id = %content_id,
                    error = %e,
                    "document attempt errored"
                );
                if let Err(save_err) = self.log.fail(id, &e.to_string()).await {
                    warn!(
                        subsystem = "migrate",
                        component = "worker",
                        content_id = %content_id,
                        error = %save_err,
                        "failed to record document failure"
                    );
                }
                DocOutcome::Failed
            }
        }
    }

    async fn try_process(&self, entry: MigrationLogEntry) -> Result<DocOutcome> {
        self.log.mark_in_progress(entry.id).await?;

        let content = self.content.fetch_content(&entry.source_document_id).await?;
        let Some(bytes) = content.filter(|bytes| !bytes.is_empty()) else {
            self.log.skip(entry.id, "No content found").await?;
            return Ok(DocOutcome::Skipped);
        };

        let target_filename = target_filename(&entry);
        let result = self
            .client
            .upload(
                &self.target_bucket,
                &target_filename,
                bytes,
                entry.claimed_content_type.as_deref(),
                entry.source_year,
            )
            .await;

        if result.success {
            let outcome = MigrationOutcome {
                target_doc_id: result.doc_id,
                target_bucket: self.target_bucket.clone(),
                target_filename,
                target_sha256: result.sha256,
                detected_content_type: result.detected_content_type,
            };
            self.log.complete(entry.id, &outcome).await?;
            Ok(DocOutcome::Completed)
        } else {
            let message = result
                .error_message
                .unwrap_or_else(|| "upload failed".to_string());
            self.log.fail(entry.id, &message).await?;
            Ok(DocOutcome::Failed)
        }
    }
}

/// Target key: `{contentId}/{originalFilename ?? contentId}{.ext?}`.
///
/// Prefixing with the ContentId keeps keys unique across records whose
/// original filenames collide.
fn target_filename(entry: &MigrationLogEntry) -> String {
    let base = entry
        .original_filename
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&entry.source_document_id);
    match entry.original_extension.as_deref() {
        Some(ext) if !ext.is_empty() => {
            format!("{}/{}.{}", entry.source_document_id, base, ext)
        }
        _ => format!("{}/{}", entry.source_document_id, base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use silo_core::MigrationStatus;

    fn entry(filename: Option<&str>, extension: Option<&str>) -> MigrationLogEntry {
        MigrationLogEntry {
            id: 1,
            source_year: 2017,
            source_document_id: "abc-123".into(),
            original_filename: filename.map(String::from),
            original_extension: extension.map(String::from),
            claimed_content_type: None,
            source_file_size: None,
            source_record_date: None,
            status: MigrationStatus::Pending,
            target_doc_id: None,
            target_bucket: None,
            target_filename: None,
            target_sha256: None,
            detected_content_type: None,
            error_message: None,
            retry_count: 0,
            worker_token: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    #[test]
    fn test_target_filename_with_name_and_extension() {
        assert_eq!(
            target_filename(&entry(Some("report"), Some("pdf"))),
            "abc-123/report.pdf"
        );
    }

    #[test]
    fn test_target_filename_without_extension() {
        assert_eq!(target_filename(&entry(Some("report"), None)), "abc-123/report");
    }

    #[test]
    fn test_target_filename_falls_back_to_content_id() {
        assert_eq!(target_filename(&entry(None, None)), "abc-123/abc-123");
        assert_eq!(
            target_filename(&entry(None, Some("pdf"))),
            "abc-123/abc-123.pdf"
        );
    }

    #[test]
    fn test_target_filename_empty_extension_ignored() {
        assert_eq!(
            target_filename(&entry(Some("report"), Some(""))),
            "abc-123/report"
        );
    }
}
