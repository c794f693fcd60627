//! Standardized API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use ts_rs::TS;

use crate::sheets::{SheetsError, WriteError};

/// Machine-readable error category, sent as the `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub enum ApiErrorCode {
    ConfigurationError,
    ValidationError,
    NotFound,
    MethodNotAllowed,
    Conflict,
    UpstreamError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::ConfigurationError | Self::UpstreamError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict => StatusCode::CONFLICT,
        }
    }
}

/// `{ "error": <code>, "message": <detail> }`
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    #[serde(rename = "error")]
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::MethodNotAllowed, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message)
    }

    /// A required setting is absent; `name` is the variable to set.
    pub fn missing_config(name: &str) -> Self {
        Self::new(
            ApiErrorCode::ConfigurationError,
            format!("{name} is not configured"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Convert an `Option` into a 404 naming what was missing.
pub trait OptionNotFoundExt<T> {
    fn or_not_found(self, what: impl FnOnce() -> String) -> Result<T, ApiError>;
}

impl<T> OptionNotFoundExt<T> for Option<T> {
    fn or_not_found(self, what: impl FnOnce() -> String) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(what()))
    }
}

impl From<&SheetsError> for ApiError {
    fn from(err: &SheetsError) -> Self {
        if err.is_configuration() {
            error!(error = %err, "spreadsheet access is not configured");
            return Self::new(ApiErrorCode::ConfigurationError, err.to_string());
        }
        warn!(error = ?err, "spreadsheet request failed");
        Self::new(ApiErrorCode::UpstreamError, err.to_string())
    }
}

impl From<Arc<SheetsError>> for ApiError {
    fn from(err: Arc<SheetsError>) -> Self {
        Self::from(err.as_ref())
    }
}

impl From<WriteError> for ApiError {
    fn from(err: WriteError) -> Self {
        let code = match &err {
            WriteError::InvalidField { .. } | WriteError::InvalidValue { .. } => {
                ApiErrorCode::ValidationError
            }
            WriteError::Conflict { .. } => ApiErrorCode::Conflict,
            WriteError::WriteFailed { source, .. } if source.is_configuration() => {
                ApiErrorCode::ConfigurationError
            }
            WriteError::WriteFailed { .. } => ApiErrorCode::UpstreamError,
        };
        Self::new(code, err.to_string())
    }
}
