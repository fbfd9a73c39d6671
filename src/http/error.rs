use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::error::ErrorKind;
use crate::app::relationships::{error_entry, ApiFailure};

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl AppError {
    fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let entry = error_entry(kind);
        Self {
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: entry.code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::AuthenticationRequired, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Internal, message)
    }
}

impl From<ApiFailure> for AppError {
    fn from(failure: ApiFailure) -> Self {
        Self {
            status: StatusCode::from_u16(failure.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: failure.code,
            message: failure.message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
        });
        (self.status, body).into_response()
    }
}
