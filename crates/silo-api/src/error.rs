//! HTTP error mapping and the JSON error envelope.
//!
//! Every 4xx/5xx response carries
//! `{"error":{"code":"<CODE>","message":"...","requestId":"..."}}` where
//! the code is stable and the request id is the correlation id assigned by
//! the request-id layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use silo_core::Error;

/// A core error paired with the request's correlation id.
#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    pub request_id: String,
}

impl ApiError {
    pub fn new(error: Error, request_id: impl Into<String>) -> Self {
        Self {
            error,
            request_id: request_id.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match &self.error {
            Error::InvalidBucketName(_)
            | Error::InvalidFilename(_)
            | Error::FileTooLarge { .. }
            | Error::InvalidContentType(_) => StatusCode::BAD_REQUEST,
            Error::BucketNotFound(_) | Error::ObjectNotFound(_) => StatusCode::NOT_FOUND,
            // A catalog row without its blob file: the object is effectively
            // gone, reported as a storage error rather than row-missing.
            Error::Storage(_) => StatusCode::NOT_FOUND,
            Error::BucketAlreadyExists(_)
            | Error::ObjectAlreadyExists { .. }
            | Error::BucketNotEmpty(_) => StatusCode::CONFLICT,
            Error::Database(_)
            | Error::Request(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                subsystem = "api",
                request_id = %self.request_id,
                error = %self.error,
                "request failed"
            );
        }

        let body = Json(serde_json::json!({
            "error": {
                "code": self.error.code(),
                "message": self.error.to_string(),
                "requestId": self.request_id,
            }
        }));

        (status, body).into_response()
    }
}

/// Extractor exposing the correlation id set by the request-id layer.
///
/// Handlers wrap engine errors through [`RequestCtx::fail`] so the envelope
/// always carries the id that also appears in the logs.
#[derive(Debug, Clone)]
pub struct RequestCtx {
    pub request_id: String,
}

impl RequestCtx {
    /// Adapter for `map_err` on engine results.
    pub fn fail(&self) -> impl Fn(Error) -> ApiError + '_ {
        move |error| ApiError::new(error, self.request_id.clone())
    }

    /// Shorthand for a bad-request error in this request's context.
    pub fn bad_request(&self, message: impl Into<String>) -> ApiError {
        ApiError::new(Error::InvalidContentType(message.into()), self.request_id.clone())
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequestCtx
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        Ok(RequestCtx { request_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: Error) -> StatusCode {
        ApiError::new(error, "rid").status()
    }

    #[test]
    fn test_validation_errors_map_to_400() {
        assert_eq!(
            status_of(Error::InvalidBucketName("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::InvalidFilename("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::FileTooLarge { max_bytes: 1 }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_resources_map_to_404() {
        assert_eq!(
            status_of(Error::BucketNotFound("b".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(Error::ObjectNotFound("d".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(Error::Storage("gone".into())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflicts_map_to_409() {
        assert_eq!(
            status_of(Error::BucketAlreadyExists("b".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(Error::ObjectAlreadyExists {
                bucket: "b".into(),
                filename: "f".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(Error::BucketNotEmpty("b".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_internal_errors_map_to_500() {
        assert_eq!(
            status_of(Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(Error::Request("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response =
            ApiError::new(Error::BucketNotFound("invoices".into()), "req-42").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "BucketNotFound");
        assert_eq!(body["error"]["requestId"], "req-42");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("invoices"));
    }
}
