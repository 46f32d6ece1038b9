//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use valvehub_domain::error::ValveHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`ValveHubError`] to an HTTP response with appropriate status code.
pub struct ApiError(ValveHubError);

impl From<ValveHubError> for ApiError {
    fn from(err: ValveHubError) -> Self {
        Self(err)
    }
}

/// Status code and client-facing message for an error.
///
/// Storage and hardware details are logged here and never sent to clients.
pub(crate) fn describe(err: &ValveHubError) -> (StatusCode, String) {
    match err {
        ValveHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
        ValveHubError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
        ValveHubError::Storage(err) => {
            tracing::error!(error = %err, "storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
        ValveHubError::Hardware(err) => {
            tracing::error!(error = %err, "hardware error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "valve hardware unavailable".to_string(),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = describe(&self.0);
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valvehub_domain::error::{NotFoundError, ValidationError};

    #[test]
    fn should_map_validation_to_bad_request() {
        let (status, message) = describe(&ValidationError::NoValves.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "valve bank must contain at least one valve");
    }

    #[test]
    fn should_map_not_found() {
        let err = NotFoundError {
            entity: "Valve",
            id: "42".to_string(),
        };
        let (status, message) = describe(&err.into());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Valve 42 not found");
    }

    #[test]
    fn should_hide_hardware_details() {
        let err = ValveHubError::Hardware(Box::new(std::io::Error::other("gpio13 busy")));
        let (status, message) = describe(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("gpio13"));
    }
}
