use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::telemetry::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Message returned when an order references an unknown product
pub const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Internal Server Error")
    pub error: String,
    /// Human-readable error description
    pub detail: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    StoreFailure(#[from] DbErr),

    #[error("{0}")]
    Internal(String),

    #[error("Startup failure: {0}")]
    StartupFailure(String),
}

impl ServiceError {
    pub fn product_not_found() -> Self {
        ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string())
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreFailure(_) | Self::Internal(_) | Self::StartupFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Prefixes the detail of server-side failures; not-found keeps its fixed message.
    pub fn in_context(self, context: &'static str) -> ContextualError {
        ContextualError {
            context,
            source: self,
        }
    }

    fn to_response(&self, detail: String) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            detail,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        self.to_response(detail)
    }
}

/// A service error tagged with the operation it interrupted
#[derive(Debug)]
pub struct ContextualError {
    context: &'static str,
    source: ServiceError,
}

impl ContextualError {
    pub fn detail(&self) -> String {
        match &self.source {
            ServiceError::NotFound(msg) => msg.clone(),
            other => format!("{}: {}", self.context, other),
        }
    }
}

impl From<ContextualError> for ServiceError {
    fn from(err: ContextualError) -> Self {
        err.source
    }
}

impl IntoResponse for ContextualError {
    fn into_response(self) -> Response {
        let detail = self.detail();
        self.source.to_response(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn not_found_response_keeps_fixed_message_and_request_id() {
        let response =
            crate::telemetry::scope_request_id(crate::telemetry::RequestId::new("req-123"), async {
                ServiceError::product_not_found()
                    .in_context("ERROR IN ADD ORDER")
                    .into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.detail, PRODUCT_NOT_FOUND);
        assert_eq!(payload.error, "Not Found");
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn store_failure_exposes_underlying_text() {
        let err = ServiceError::StoreFailure(DbErr::Custom("relation \"orders\" is locked".into()));
        let response = err.in_context("ERROR IN ADD ORDER").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(payload.detail.starts_with("ERROR IN ADD ORDER: "));
        assert!(payload.detail.contains("relation \"orders\" is locked"));
        assert!(payload.request_id.is_none());
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::StoreFailure(DbErr::Custom("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
