//! Error types for web handlers.
//!
//! [`AppError`] bridges [`BookingError`] and extractor rejections to the JSON
//! envelope every endpoint answers with:
//!
//! ```json
//! { "message": "This time slot is already reserved",
//!   "error": { "conflicting_hours": ["10:00"] } }
//! ```
//!
//! Failures never carry `data`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use courtside_core::{BookingError, FieldError};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState<S, C>>) -> Result<ApiResponse<Court>, AppError> {
///     let court = state.bookings.court(id).await?;
///     Ok(ApiResponse::new("Successfully fetched court", court))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Machine-readable detail placed in the `error` field
    detail: Value,
    /// Internal error (for logging, not exposed to client)
    source: Option<String>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, detail: Value) -> Self {
        Self {
            status,
            message: message.into(),
            detail,
            source: None,
        }
    }

    /// Attach an internal error description for the logs.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, json!("BAD_REQUEST"))
    }

    /// Create a 400 error listing invalid fields.
    #[must_use]
    pub fn validation(errors: &[FieldError]) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            serde_json::to_value(errors).unwrap_or(Value::Null),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            json!("NOT_FOUND"),
        )
    }

    /// Create a 500 Internal Server Error.
    ///
    /// The client sees a generic message; `source` is only logged.
    #[must_use]
    pub fn internal(source: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            json!("INTERNAL_SERVER_ERROR"),
        )
        .with_source(source)
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message,
            json!("SERVICE_UNAVAILABLE"),
        )
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    error: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                message = %self.message,
                error = self.source.as_deref().unwrap_or("none"),
                "Request failed"
            );
        }

        let retryable = self.status == StatusCode::SERVICE_UNAVAILABLE;
        let body = ErrorResponse {
            message: self.message,
            error: self.detail,
        };

        let mut response = (self.status, Json(body)).into_response();
        if retryable {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(errors) => Self::validation(&errors),
            BookingError::OutOfRange { date, start, end } => Self::new(
                StatusCode::BAD_REQUEST,
                "Date is out of range",
                json!({ "date": date, "start": start, "end": end }),
            ),
            BookingError::CourtNotFound(id) => Self::not_found("Court", id),
            BookingError::OrderNotFound(id) => Self::not_found("Order", id),
            BookingError::SlotConflict { conflicting_hours } => {
                let labels: Vec<String> = conflicting_hours.iter().map(|h| h.label()).collect();
                Self::new(
                    StatusCode::CONFLICT,
                    "This time slot is already reserved",
                    json!({ "conflicting_hours": labels }),
                )
            }
            BookingError::Transient(message) => {
                Self::unavailable("Service temporarily unavailable, retry the request")
                    .with_source(message)
            }
            BookingError::Internal(message) => Self::internal(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let detail = err.body_text();
                let (field, message) = data_error_field(&detail);
                Self::validation(&[FieldError::new(field, message)])
            }
            other => Self::bad_request(other.body_text()),
        }
    }
}

/// Split a JSON data error into the offending field and its message.
///
/// Understands serde's "missing field `x`" and the `path: message` form axum
/// produces for wrongly typed values. Anything else is attributed to `body`.
fn data_error_field(detail: &str) -> (String, String) {
    let detail = detail
        .rsplit_once("target type: ")
        .map_or(detail, |(_, tail)| tail);
    let message = detail
        .rsplit_once(" at line ")
        .map_or(detail, |(head, _)| head)
        .to_string();

    if let Some(name) = message
        .split_once("missing field `")
        .and_then(|(_, rest)| rest.split_once('`'))
        .map(|(name, _)| name)
    {
        return (name.to_string(), "is required".to_string());
    }

    match message.split_once(": ") {
        Some((path, rest)) if !path.is_empty() && !path.contains(' ') => {
            (path.to_string(), rest.to_string())
        }
        _ => ("body".to_string(), message),
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_core::{CourtId, Hour};

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[400] Invalid input");
    }

    #[test]
    fn test_not_found() {
        let err = AppError::from(BookingError::CourtNotFound(CourtId::new(7)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Court with id 7 not found");
    }

    #[test]
    fn test_conflict_lists_hour_labels() {
        let err = AppError::from(BookingError::SlotConflict {
            conflicting_hours: Hour::new(10).into_iter().collect(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.detail, json!({ "conflicting_hours": ["10:00"] }));
    }

    #[test]
    fn test_validation_lists_fields() {
        let err = AppError::from(BookingError::invalid("email", "must be a valid email address"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.detail,
            json!([{ "field": "email", "message": "must be a valid email address" }])
        );
    }

    #[test]
    fn test_json_data_errors_name_the_field() {
        let missing = data_error_field(
            "Failed to deserialize the JSON body into the target type: missing field `timetables` at line 1 column 58",
        );
        assert_eq!(missing, ("timetables".to_string(), "is required".to_string()));

        let (field, message) = data_error_field(
            "Failed to deserialize the JSON body into the target type: players: invalid type: string \"four\", expected u32 at line 1 column 20",
        );
        assert_eq!(field, "players");
        assert!(message.starts_with("invalid type"));

        assert_eq!(data_error_field("something odd").0, "body");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BookingError::Transient("pool timed out".into()), StatusCode::SERVICE_UNAVAILABLE),
            (BookingError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_hides_details() {
        let err = AppError::from(BookingError::Internal("relation \"orders\" missing".into()));
        assert_eq!(err.message, "Internal Server Error");
        assert_eq!(err.source.as_deref(), Some("relation \"orders\" missing"));
    }
}
