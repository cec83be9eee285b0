//! Server assembly: configuration, router, middleware layers, startup.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, on, post, MethodFilter};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use silo_core::Error;
use silo_db::Database;
use silo_store::{BucketManager, StorageEngine, StoreConfig};

use crate::handlers::{self, buckets, objects};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Generates time-ordered UUIDv7 request correlation ids.
///
/// UUIDv7 embeds a Unix timestamp, so ids sort chronologically — useful for
/// log correlation when chasing a failed upload across subsystems.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Process configuration of the API binary.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen address, `SILO_BIND_ADDR` (default `0.0.0.0:8090`).
    pub bind_addr: String,
    /// Catalog database URL, `SILO_DATABASE_URL` (required).
    pub database_url: String,
    /// Storage engine options.
    pub store: StoreConfig,
}

impl ApiConfig {
    pub fn from_env() -> silo_core::Result<Self> {
        let database_url = std::env::var("SILO_DATABASE_URL")
            .map_err(|_| Error::Config("SILO_DATABASE_URL must be set".into()))?;
        let bind_addr =
            std::env::var("SILO_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8090".to_string());
        Ok(Self {
            bind_addr,
            database_url,
            store: StoreConfig::from_env(),
        })
    }
}

/// Build the application router.
///
/// Upload bodies are unbounded at the transport; only the engine's
/// `MaxUploadBytes` cap applies. The GET/HEAD split uses explicit method
/// filters because axum's `get` claims HEAD as well.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/healthz", get(handlers::health))
        .route(
            "/api/buckets",
            get(buckets::list_buckets).post(buckets::create_bucket),
        )
        .route(
            "/api/buckets/:bucket",
            get(buckets::get_bucket)
                .put(buckets::ensure_bucket)
                .delete(buckets::delete_bucket),
        )
        .route("/api/buckets/:bucket/objects", get(objects::list_objects))
        .route(
            "/api/buckets/:bucket/objects/form",
            post(objects::post_object_form),
        )
        .route(
            "/api/buckets/:bucket/objects/by-name/*key",
            on(MethodFilter::GET, objects::get_object_by_name)
                .on(MethodFilter::HEAD, objects::head_object_by_name)
                .on(MethodFilter::DELETE, objects::delete_object_by_name),
        )
        .route(
            "/api/buckets/:bucket/objects/*key",
            on(MethodFilter::PUT, objects::put_object)
                .on(MethodFilter::GET, objects::get_object)
                .on(MethodFilter::HEAD, objects::head_object)
                .on(MethodFilter::DELETE, objects::delete_object),
        )
        .route(
            "/api/objects/:doc_id",
            get(objects::get_object_global).delete(objects::delete_object_global),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

/// Start the API server and block until shutdown.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let engine = StorageEngine::new(db.clone(), config.store.clone());
    engine
        .filesystem()
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("blob filesystem validation failed: {}", e))?;

    let buckets = BucketManager::new(db);
    buckets.seed_defaults(&config.store.default_buckets).await?;

    let state = AppState { engine, buckets };
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    info!(
        subsystem = "api",
        op = "startup",
        bind_addr = %config.bind_addr,
        root_path = %config.store.root_path.display(),
        "silo-api listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(subsystem = "api", op = "shutdown", "silo-api stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(subsystem = "api", "shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_a_uuid() {
        let mut maker = MakeRequestUuidV7;
        let request = axum::http::Request::new(());
        let id = maker.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&value).is_ok());
    }

    #[test]
    fn test_api_config_requires_database_url() {
        std::env::remove_var("SILO_DATABASE_URL");
        assert!(ApiConfig::from_env().is_err());
    }
}
