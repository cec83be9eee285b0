//! HTTP handler modules.

pub mod buckets;
pub mod objects;

use axum::Json;

/// Service liveness probe.
#[utoipa::path(get, path = "/healthz", tag = "Health",
    responses((status = 200, description = "Service is up")))]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "silo-api",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}
