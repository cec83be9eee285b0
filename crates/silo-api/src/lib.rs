//! # silo-api
//!
//! HTTP surface of the silo storage engine: bucket and object endpoints,
//! the JSON error envelope with request correlation ids, and the OpenAPI
//! document served through Swagger UI.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod server;
pub mod state;

pub use error::{ApiError, RequestCtx};
pub use server::{router, run, ApiConfig};
pub use state::AppState;
