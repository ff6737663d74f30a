// SPDX-License-Identifier: Apache-2.0

//! Small helpers for the OData envelope fields every Redfish payload carries
//! (`@odata.id`, `@odata.type`, `@odata.context`) and for collection bodies.
//!
//! Resources are serialized independently and reference each other only by `@odata.id` link
//! objects — never by shared ownership — so a System, its Manager and its Chassis can all link
//! to one another without an in-memory cycle.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

/// A `{"@odata.id": "..."}` link object, the unit Redfish uses to reference another resource.
pub fn link(odata_id: impl Into<String>) -> Value {
    json!({ "@odata.id": odata_id.into() })
}

/// Builds a collection body: `@odata.id`/`@odata.type`, `Name`, `Members@odata.count`, and
/// `Members[]` of link objects.
pub fn collection(odata_id: &str, odata_type: &str, name: &str, member_ids: &[String]) -> Value {
    json!({
        "@odata.id": odata_id,
        "@odata.type": odata_type,
        "Name": name,
        "Members@odata.count": member_ids.len(),
        "Members": member_ids.iter().map(|id| link(id.clone())).collect::<Vec<_>>(),
    })
}

/// Wraps a JSON body into a `200 OK` response with the headers every Redfish payload carries:
/// `Content-Type: application/json` and `OData-Version: 4.0` (§4.4).
pub fn ok_json(body: Value) -> Response {
    let mut response = (StatusCode::OK, axum::Json(body)).into_response();
    response
        .headers_mut()
        .insert("odata-version", HeaderValue::from_static("4.0"));
    response
}

/// A `204 No Content` response, used by every action/PATCH that the spec says succeeds silently.
pub fn no_content() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert("odata-version", HeaderValue::from_static("4.0"));
    response
}

/// A `204 No Content` response carrying an `ETag` header, for PATCH responses whose resource has
/// a meaningful version tag (§4.5: a PATCH reply echoes the state it just committed).
pub fn no_content_with_etag(etag: &str) -> Response {
    let mut response = no_content();
    if let Ok(value) = HeaderValue::from_str(etag) {
        response.headers_mut().insert("etag", value);
    }
    response
}

/// A `202 Accepted` response with a `Location` header pointing at the created task's monitor
/// URI, per §4.5/§4.6.
pub fn accepted(task_uri: &str) -> Response {
    let mut response = (
        StatusCode::ACCEPTED,
        axum::Json(json!({ "@odata.id": task_uri })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(task_uri) {
        response.headers_mut().insert("location", value);
    }
    response
        .headers_mut()
        .insert("odata-version", HeaderValue::from_static("4.0"));
    response
}

/// A `201 Created` response with a `Location` header, used by session creation.
pub fn created(location: &str, body: Value) -> Response {
    let mut response = (StatusCode::CREATED, axum::Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert("location", value);
    }
    response
        .headers_mut()
        .insert("odata-version", HeaderValue::from_static("4.0"));
    response
}
