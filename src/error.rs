use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::costs::CostError;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Authentication error
    Unauthorized(String),
    /// Invalid request input
    BadRequest(String),
    /// No such route or resource
    NotFound(String),
    /// Cost Explorer is not enabled for the account
    CostMonitoringNotActive(String),
    /// Cost allocation tag activation was rejected
    ActivationFailed(String),
    /// Upstream API error
    UpstreamError { status: StatusCode, message: String },
    /// Internal server error
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::CostMonitoringNotActive(msg) => write!(f, "Cost monitoring not active: {}", msg),
            Self::ActivationFailed(msg) => write!(f, "Activation failed: {}", msg),
            Self::UpstreamError { status, message } => {
                write!(f, "Upstream error ({}): {}", status, message)
            }
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::CostMonitoringNotActive(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg.clone()),
            Self::ActivationFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::UpstreamError { status, message } => (*status, message.clone()),
            Self::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() || status == StatusCode::METHOD_NOT_ALLOWED {
            tracing::error!(status = status.as_u16(), error_type = error_type_name(&self), "{}", error_message);
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::Unauthorized(_) => "unauthorized",
        AppError::BadRequest(_) => "bad_request",
        AppError::NotFound(_) => "not_found",
        AppError::CostMonitoringNotActive(_) => "cost_explorer_not_active",
        AppError::ActivationFailed(_) => "activation_failed",
        AppError::UpstreamError { .. } => "upstream_error",
        AppError::InternalError(_) => "internal_error",
    }
}

impl From<CostError> for AppError {
    fn from(err: CostError) -> Self {
        match err {
            CostError::MissingParameters(_) => Self::BadRequest(err.to_string()),
            CostError::Activation(_) => Self::ActivationFailed(err.to_string()),
            CostError::ServiceNotActive(message) => Self::CostMonitoringNotActive(message),
            CostError::Configuration | CostError::PageLimitExceeded(_) => {
                Self::InternalError(err.to_string())
            }
            CostError::Provider(provider) => {
                let status = provider
                    .status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                Self::UpstreamError {
                    status,
                    message: provider.to_string(),
                }
            }
        }
    }
}
