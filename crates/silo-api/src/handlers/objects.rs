//! Object HTTP handlers: streaming upload, conditional-disposition
//! download, head, delete, and listing.

use std::io;

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use silo_core::defaults::LIST_PAGE_SIZE;
use silo_core::{normalize_object_key, ObjectListPage, ObjectRecord, ObjectResponse};
use silo_store::Disposition;

use crate::error::{ApiError, RequestCtx};
use crate::state::AppState;

/// Header through which the client asserts a content type at upload time.
pub const CLAIMED_CONTENT_TYPE: &str = "x-claimed-content-type";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub year: Option<i32>,
}

/// List a bucket's objects with paging and an optional key prefix.
#[utoipa::path(get, path = "/api/buckets/{bucket}/objects", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("page" = Option<i64>, Query, description = "1-based page number"),
        ("pageSize" = Option<i64>, Query, description = "Page size, clamped to [1,1000]"),
        ("prefix" = Option<String>, Query, description = "Key prefix filter")),
    responses(
        (status = 200, description = "One page of objects", body = ObjectListPage),
        (status = 404, description = "Bucket not found")))]
pub async fn list_objects(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(bucket): Path<String>,
    Query(query): Query<ListObjectsQuery>,
) -> Result<Json<ObjectListPage>, ApiError> {
    let page = state
        .engine
        .list_objects(
            &bucket,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(LIST_PAGE_SIZE),
            query.prefix.as_deref(),
        )
        .await
        .map_err(ctx.fail())?;
    Ok(Json(page))
}

/// Streaming upload. The body is written to disk as it arrives; only the
/// engine's `MaxUploadBytes` bounds its size.
#[utoipa::path(put, path = "/api/buckets/{bucket}/objects/{key}", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("key" = String, Path, description = "Object key, percent-decoded once before validation"),
        ("year" = Option<i32>, Query, description = "Partition year, defaults to current UTC year")),
    responses(
        (status = 201, description = "Stored", body = ObjectResponse),
        (status = 400, description = "Invalid name or file too large"),
        (status = 404, description = "Bucket not found"),
        (status = 409, description = "Object already exists")))]
pub async fn put_object(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<ObjectResponse>), ApiError> {
    let filename = normalize_object_key(&key);
    let claimed = claimed_content_type(&headers);

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));

    let response = state
        .engine
        .upload(&bucket, &filename, claimed.as_deref(), query.year, stream)
        .await
        .map_err(ctx.fail())?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Multipart upload using the first file part's name and content type.
#[utoipa::path(post, path = "/api/buckets/{bucket}/objects/form", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("year" = Option<i32>, Query, description = "Partition year")),
    responses(
        (status = 201, description = "Stored", body = ObjectResponse),
        (status = 400, description = "No file part or invalid name"),
        (status = 404, description = "Bucket not found"),
        (status = 409, description = "Object already exists")))]
pub async fn post_object_form(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(bucket): Path<String>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ObjectResponse>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ctx.bad_request(format!("multipart error: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let claimed = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ctx.bad_request(format!("multipart read error: {}", e)))?;

        let filename = normalize_object_key(&file_name);
        let stream = futures::stream::iter([Ok::<Bytes, io::Error>(data)]);

        let response = state
            .engine
            .upload(&bucket, &filename, claimed.as_deref(), query.year, stream)
            .await
            .map_err(ctx.fail())?;

        return Ok((StatusCode::CREATED, Json(response)));
    }

    Err(ctx.bad_request("multipart body must contain a file part"))
}

/// Download by DocId.
#[utoipa::path(get, path = "/api/buckets/{bucket}/objects/{docId}", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("docId" = String, Path, description = "DocId")),
    responses(
        (status = 200, description = "Blob bytes with disposition headers"),
        (status = 404, description = "Object or blob file not found")))]
pub async fn get_object(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path((bucket, doc_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let record = state
        .engine
        .metadata_by_id(&bucket, &doc_id)
        .await
        .map_err(ctx.fail())?;
    serve_blob(&state, record, false).await.map_err(ctx.fail())
}

/// Head by DocId: download headers without the body.
#[utoipa::path(head, path = "/api/buckets/{bucket}/objects/{docId}", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("docId" = String, Path, description = "DocId")),
    responses(
        (status = 200, description = "Headers only"),
        (status = 404, description = "Object or blob file not found")))]
pub async fn head_object(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path((bucket, doc_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let record = state
        .engine
        .metadata_by_id(&bucket, &doc_id)
        .await
        .map_err(ctx.fail())?;
    serve_blob(&state, record, true).await.map_err(ctx.fail())
}

/// Delete by DocId.
#[utoipa::path(delete, path = "/api/buckets/{bucket}/objects/{docId}", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("docId" = String, Path, description = "DocId")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Object not found")))]
pub async fn delete_object(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path((bucket, doc_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .delete_by_id(&bucket, &doc_id)
        .await
        .map_err(ctx.fail())?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download by original key.
#[utoipa::path(get, path = "/api/buckets/{bucket}/objects/by-name/{key}", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("key" = String, Path, description = "Object key")),
    responses(
        (status = 200, description = "Blob bytes with disposition headers"),
        (status = 404, description = "Object or blob file not found")))]
pub async fn get_object_by_name(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let filename = normalize_object_key(&key);
    let record = state
        .engine
        .metadata_by_name(&bucket, &filename)
        .await
        .map_err(ctx.fail())?;
    serve_blob(&state, record, false).await.map_err(ctx.fail())
}

/// Head by original key.
#[utoipa::path(head, path = "/api/buckets/{bucket}/objects/by-name/{key}", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("key" = String, Path, description = "Object key")),
    responses(
        (status = 200, description = "Headers only"),
        (status = 404, description = "Object or blob file not found")))]
pub async fn head_object_by_name(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let filename = normalize_object_key(&key);
    let record = state
        .engine
        .metadata_by_name(&bucket, &filename)
        .await
        .map_err(ctx.fail())?;
    serve_blob(&state, record, true).await.map_err(ctx.fail())
}

/// Delete by original key.
#[utoipa::path(delete, path = "/api/buckets/{bucket}/objects/by-name/{key}", tag = "Objects",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("key" = String, Path, description = "Object key")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Object not found")))]
pub async fn delete_object_by_name(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let filename = normalize_object_key(&key);
    state
        .engine
        .delete_by_name(&bucket, &filename)
        .await
        .map_err(ctx.fail())?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cross-bucket download by DocId.
#[utoipa::path(get, path = "/api/objects/{docId}", tag = "Objects",
    params(("docId" = String, Path, description = "DocId")),
    responses(
        (status = 200, description = "Blob bytes with disposition headers"),
        (status = 404, description = "Object or blob file not found")))]
pub async fn get_object_global(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(doc_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state.engine.metadata_global(&doc_id).await.map_err(ctx.fail())?;
    serve_blob(&state, record, false).await.map_err(ctx.fail())
}

/// Cross-bucket delete by DocId.
#[utoipa::path(delete, path = "/api/objects/{docId}", tag = "Objects",
    params(("docId" = String, Path, description = "DocId")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Object not found")))]
pub async fn delete_object_global(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(doc_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_global(&doc_id).await.map_err(ctx.fail())?;
    Ok(StatusCode::NO_CONTENT)
}

fn claimed_content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CLAIMED_CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Stream a blob out (or just its headers for HEAD).
///
/// Opening the file happens for HEAD too, so a row whose blob vanished
/// reports the same storage error on both verbs.
async fn serve_blob(
    state: &AppState,
    record: ObjectRecord,
    head_only: bool,
) -> silo_core::Result<Response> {
    let bundle = state.engine.open_download(record).await?;

    let body = if head_only {
        Body::empty()
    } else {
        Body::from_stream(ReaderStream::new(bundle.file))
    };

    let mut response = Response::new(body);
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&bundle.record.served_content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    // Verified against the catalog row when the blob was opened.
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&bundle.size_bytes.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    if let Ok(etag) = HeaderValue::from_str(&bundle.record.sha256_hex()) {
        headers.insert(header::ETAG, etag);
    }
    let disposition = content_disposition(bundle.disposition, &bundle.record.filename);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

/// Build a `Content-Disposition` value with an ASCII fallback filename and
/// the RFC 5987 `filename*` parameter for Unicode names.
fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let token = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        token,
        fallback,
        rfc5987_encode(filename)
    )
}

/// Percent-encode everything outside the RFC 5987 `attr-char` set.
fn rfc5987_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.as_bytes() {
        if b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
            )
        {
            out.push(*b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc5987_passes_attr_chars() {
        assert_eq!(rfc5987_encode("report-1.2_final~"), "report-1.2_final~");
    }

    #[test]
    fn test_rfc5987_encodes_spaces_and_unicode() {
        assert_eq!(rfc5987_encode("a b"), "a%20b");
        assert_eq!(rfc5987_encode("naïve.txt"), "na%C3%AFve.txt");
        assert_eq!(rfc5987_encode("€.pdf"), "%E2%82%AC.pdf");
    }

    #[test]
    fn test_content_disposition_attachment() {
        let value = content_disposition(Disposition::Attachment, "x.pdf");
        assert!(value.starts_with("attachment"));
        assert!(value.contains("filename=\"x.pdf\""));
        assert!(value.contains("filename*=UTF-8''x.pdf"));
    }

    #[test]
    fn test_content_disposition_inline_with_unicode_fallback() {
        let value = content_disposition(Disposition::Inline, "naïve.txt");
        assert!(value.starts_with("inline"));
        assert!(value.contains("filename=\"na_ve.txt\""));
        assert!(value.contains("filename*=UTF-8''na%C3%AFve.txt"));
    }

    #[test]
    fn test_content_disposition_escapes_quotes_in_fallback() {
        let value = content_disposition(Disposition::Attachment, "a\"b.txt");
        assert!(value.contains("filename=\"a_b.txt\""));
    }
}
