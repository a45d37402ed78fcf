// --- File: crates/medpush_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{HttpStatusCode, MedpushError};

pub mod client;

/// Renders the error as `{"error": {"message", "code"}}` with its HTTP status,
/// so handlers can return `Result<_, MedpushError>`.
impl IntoResponse for MedpushError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "code": status_code.as_u16(),
            }
        }));

        (status_code, body).into_response()
    }
}
