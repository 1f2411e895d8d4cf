use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::users::services::UserError;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// HTTP-facing error: the only place a status code and a client-visible
/// message are chosen.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body.details = Some(details.into());
        self
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request").with_details(details)
    }

    pub fn invalid_user_id() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid user ID")
    }

    /// Maps a service failure; anything unexpected is logged and replaced by
    /// `fallback`.
    pub fn from_user_error(err: UserError, fallback: &str) -> Self {
        match err {
            UserError::UserNotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            UserError::EmailAlreadyExists => Self::new(StatusCode::CONFLICT, err.to_string()),
            UserError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            UserError::Password(_) | UserError::Repository(_) => {
                error!(error = %err, "{}", fallback);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, fallback)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
