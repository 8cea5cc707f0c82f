use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use sweep_types::DispatchError;

/// Wraps [`DispatchError`] so it can be returned directly from a handler;
/// translates each variant to the HTTP status spec §6 names.
pub struct ApiError(pub DispatchError);

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DispatchError::Schema(_) => StatusCode::BAD_REQUEST,
            DispatchError::NotClaimable { .. } => StatusCode::NOT_FOUND,
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::Unauthorized => StatusCode::UNAUTHORIZED,
            DispatchError::StoreWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::TransientNetwork(_) => StatusCode::BAD_GATEWAY,
        };

        if status.is_server_error() {
            warn!(error = %self.0, "request failed with server error");
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
