//! Bucket HTTP handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use silo_core::{BucketSummary, CreateBucketRequest};

use crate::error::{ApiError, RequestCtx};
use crate::state::AppState;

/// List all buckets with aggregate counts.
#[utoipa::path(get, path = "/api/buckets", tag = "Buckets",
    responses((status = 200, description = "All buckets", body = [BucketSummary])))]
pub async fn list_buckets(
    State(state): State<AppState>,
    ctx: RequestCtx,
) -> Result<Json<Vec<BucketSummary>>, ApiError> {
    let buckets = state.buckets.list().await.map_err(ctx.fail())?;
    Ok(Json(buckets))
}

/// Create a bucket.
#[utoipa::path(post, path = "/api/buckets", tag = "Buckets",
    request_body = CreateBucketRequest,
    responses(
        (status = 201, description = "Created", body = BucketSummary),
        (status = 400, description = "Invalid bucket name"),
        (status = 409, description = "Bucket already exists")))]
pub async fn create_bucket(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Json(req): Json<CreateBucketRequest>,
) -> Result<(StatusCode, Json<BucketSummary>), ApiError> {
    let bucket = state.buckets.create(&req.name).await.map_err(ctx.fail())?;
    Ok((StatusCode::CREATED, Json(bucket)))
}

/// Idempotently ensure a bucket exists.
#[utoipa::path(put, path = "/api/buckets/{name}", tag = "Buckets",
    params(("name" = String, Path, description = "Bucket name")),
    responses(
        (status = 200, description = "Bucket present", body = BucketSummary),
        (status = 400, description = "Invalid bucket name")))]
pub async fn ensure_bucket(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(name): Path<String>,
) -> Result<Json<BucketSummary>, ApiError> {
    let bucket = state.buckets.ensure(&name).await.map_err(ctx.fail())?;
    Ok(Json(bucket))
}

/// Fetch a bucket with aggregate counts.
#[utoipa::path(get, path = "/api/buckets/{name}", tag = "Buckets",
    params(("name" = String, Path, description = "Bucket name")),
    responses(
        (status = 200, description = "Bucket", body = BucketSummary),
        (status = 404, description = "Bucket not found")))]
pub async fn get_bucket(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(name): Path<String>,
) -> Result<Json<BucketSummary>, ApiError> {
    let bucket = state.buckets.get(&name).await.map_err(ctx.fail())?;
    Ok(Json(bucket))
}

/// Delete an empty bucket.
#[utoipa::path(delete, path = "/api/buckets/{name}", tag = "Buckets",
    params(("name" = String, Path, description = "Bucket name")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Bucket not found"),
        (status = 409, description = "Bucket not empty")))]
pub async fn delete_bucket(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.buckets.delete(&name).await.map_err(ctx.fail())?;
    Ok(StatusCode::NO_CONTENT)
}
