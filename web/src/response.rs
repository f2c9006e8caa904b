//! Success envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Successful response body: `{ "message", "error": null, "data" }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Human-readable summary
    pub message: String,
    /// Always `null` on success
    pub error: Option<()>,
    /// Payload
    pub data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    /// A `200 OK` response.
    #[must_use]
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            error: None,
            data,
            status: StatusCode::OK,
        }
    }

    /// A `201 Created` response.
    #[must_use]
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::new(message, data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
