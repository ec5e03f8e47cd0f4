//! API layer -- axum routes, handlers, and error mapping.

mod routes;
pub mod state;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use self::state::AppState;
use crate::incident::IncidentError;
use crate::monitor::MonitorError;

/// Build the application router with all API routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

/// Handler error, rendered as `{"error": {"kind", "message"}}`.
#[derive(Debug)]
pub enum ApiError {
    Incident(IncidentError),
    Monitor(MonitorError),
}

impl From<IncidentError> for ApiError {
    fn from(e: IncidentError) -> Self {
        Self::Incident(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Incident(IncidentError::validation("body", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Incident(IncidentError::validation("id", rejection.body_text()))
    }
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        Self::Monitor(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::Incident(e) => {
                let status = match e {
                    IncidentError::Validation { .. } => StatusCode::BAD_REQUEST,
                    IncidentError::NotFound(_) => StatusCode::NOT_FOUND,
                    IncidentError::InvalidTransition { .. } => StatusCode::CONFLICT,
                };
                (status, e.kind(), e.to_string())
            }
            Self::Monitor(e) => (StatusCode::INTERNAL_SERVER_ERROR, "monitor", e.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(%kind, %message, "request failed");
        } else {
            tracing::debug!(%kind, %message, "request rejected");
        }

        let body = Json(json!({ "error": { "kind": kind, "message": message } }));
        (status, body).into_response()
    }
}
