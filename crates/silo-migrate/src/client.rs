//! Retrying upload client for the storage engine's HTTP surface.
//!
//! A server-side `409 Conflict` means the record was stored by an earlier
//! (possibly crashed) run and counts as success, which is what makes the
//! migrate phase idempotent per row.

use std::time::Duration;

use reqwest::{header, StatusCode};
use tracing::{debug, warn};

use silo_core::defaults::UPLOAD_CLIENT_TIMEOUT_SECS;
use silo_core::{ObjectResponse, Result};

/// Header through which the migrator forwards the legacy content type.
const CLAIMED_CONTENT_TYPE: &str = "X-Claimed-Content-Type";

/// Outcome of one upload attempt.
#[derive(Debug, Clone, Default)]
pub struct UploadResult {
    pub success: bool,
    pub already_exists: bool,
    pub doc_id: Option<String>,
    pub sha256: Option<String>,
    pub detected_content_type: Option<String>,
    pub error_message: Option<String>,
}

impl UploadResult {
    fn failure(message: String) -> Self {
        Self {
            error_message: Some(message),
            ..Self::default()
        }
    }
}

/// HTTP client for the storage engine, shared across document tasks.
pub struct UploadClient {
    http: reqwest::Client,
    base_url: String,
}

impl UploadClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPLOAD_CLIENT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the upload URL for a bucket/filename/year triple.
    pub fn upload_url(&self, bucket: &str, filename: &str, year: i32) -> String {
        format!(
            "{}/api/buckets/{}/objects/{}?year={}",
            self.base_url,
            bucket,
            urlencoding::encode(filename),
            year
        )
    }

    /// GET the bucket; on 404 POST to create it. Returns whether the bucket
    /// exists afterwards. Failures are logged, not raised — the caller
    /// aborts the run on `false`.
    pub async fn ensure_bucket_exists(&self, name: &str) -> bool {
        let get_url = format!("{}/api/buckets/{}", self.base_url, name);
        let status = match self.http.get(&get_url).send().await {
            Ok(resp) => resp.status(),
            Err(e) => {
                warn!(
                    subsystem = "migrate",
                    component = "upload_client",
                    bucket = name,
                    error = %e,
                    "bucket lookup failed"
                );
                return false;
            }
        };

        if status.is_success() {
            return true;
        }
        if status != StatusCode::NOT_FOUND {
            warn!(
                subsystem = "migrate",
                component = "upload_client",
                bucket = name,
                status = %status,
                "unexpected bucket lookup status"
            );
            return false;
        }

        match self
            .http
            .post(format!("{}/api/buckets", self.base_url))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                debug!(
                    subsystem = "migrate",
                    component = "upload_client",
                    bucket = name,
                    "bucket created"
                );
                true
            }
            Ok(resp) => {
                warn!(
                    subsystem = "migrate",
                    component = "upload_client",
                    bucket = name,
                    status = %resp.status(),
                    "bucket creation rejected"
                );
                false
            }
            Err(e) => {
                warn!(
                    subsystem = "migrate",
                    component = "upload_client",
                    bucket = name,
                    error = %e,
                    "bucket creation failed"
                );
                false
            }
        }
    }

    /// PUT one document's bytes. Never raises: transport and protocol
    /// failures come back as `success = false` with a message.
    pub async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: Vec<u8>,
        claimed_content_type: Option<&str>,
        year: i32,
    ) -> UploadResult {
        let url = self.upload_url(bucket, filename, year);

        let mut request = self
            .http
            .put(&url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        if let Some(claimed) = claimed_content_type {
            request = request.header(CLAIMED_CONTENT_TYPE, claimed);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return UploadResult::failure(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::CONFLICT {
            // Already migrated by a previous pass.
            return UploadResult {
                success: true,
                already_exists: true,
                ..UploadResult::default()
            };
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return UploadResult::failure(format!("HTTP {}: {}", status.as_u16(), body));
        }

        match response.json::<ObjectResponse>().await {
            Ok(body) => UploadResult {
                success: true,
                already_exists: false,
                doc_id: Some(body.doc_id),
                sha256: Some(body.sha256),
                detected_content_type: Some(body.detected_content_type),
                error_message: None,
            },
            Err(e) => UploadResult::failure(format!("response parse error: {}", e)),
        }
    }
}
