// HTTP error mapping for route handlers
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::error::GatewayError;

/// Route-boundary wrapper turning gateway errors into JSON error bodies.
/// Missing or unrecognized routing parameters map to 400, everything
/// else to 500.
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::UnknownGroup(_) | GatewayError::MissingParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("request failed: {}", self.0);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: GatewayError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn routing_errors_are_bad_requests_and_the_rest_are_internal() {
        assert_eq!(
            status_of(GatewayError::UnknownGroup("WP9".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(GatewayError::MissingParameter("database")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(GatewayError::Upstream("timeout".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(GatewayError::Auth("rejected".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
