// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the Redfish server, mapped to HTTP responses at the edge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors a resource handler can fail with. Every variant maps to a specific HTTP status; none
/// of them represent a vSphere-layer failure, which handlers absorb and turn into a cached or
/// synthetic payload instead (the "no observable failure" contract — see §7).
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum RedfishError {
    /// resource not found
    NotFound,
    /// method not allowed on this resource
    MethodNotAllowed,
    /// request body failed schema validation: {0}
    BadRequest(String),
    /// authentication required
    Unauthorized,
}

impl IntoResponse for RedfishError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RedfishError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            RedfishError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            RedfishError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            RedfishError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
        };
        let body = json!({
            "error": {
                "code": "Base.1.0.GeneralError",
                "message": message,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}
