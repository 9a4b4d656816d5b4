use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use comptoir_core::errors::{ApplicationError, InterfaceError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Funnels every failure through the layered error mapping: the full cause is
/// logged with a fresh correlation id, the caller gets the user-safe message
/// and the id to quote back.
pub fn error_response(error: impl Into<ApplicationError>) -> ApiError {
    let application: ApplicationError = error.into();
    let correlation_id = Uuid::new_v4().to_string();

    warn!(
        event_name = "api.request.failed",
        correlation_id = %correlation_id,
        error = %application,
        "request failed"
    );

    let interface = application.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = ErrorBody {
        error: interface.user_message().to_string(),
        correlation_id: interface.correlation_id().to_string(),
    };
    (status, Json(body))
}
