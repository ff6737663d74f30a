// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/SessionService` and its `Sessions` collection (§4.4/§4.5) — HTTP login, separate
//! from the Basic-auth path handled directly in [`crate::auth`].

use axum::extract::{Json, Path, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

/// `GET /redfish/v1/SessionService`.
pub async fn get_session_service() -> Response {
    odata::ok_json(json!({
        "@odata.id": "/redfish/v1/SessionService",
        "@odata.type": "#SessionService.v1_1_9.SessionService",
        "Id": "SessionService",
        "Name": "Session Service",
        "ServiceEnabled": true,
        "SessionTimeout": crate::session::SESSION_IDLE_TIMEOUT_SECS,
        "Sessions": odata::link("/redfish/v1/SessionService/Sessions"),
    }))
}

/// `GET /redfish/v1/SessionService/Sessions`.
pub async fn get_collection(State(context): State<VmContext>) -> Response {
    let sessions = context.sessions.list().await;
    let members: Vec<String> = sessions
        .iter()
        .map(|session| format!("/redfish/v1/SessionService/Sessions/{}", session.id))
        .collect();
    odata::ok_json(odata::collection(
        "/redfish/v1/SessionService/Sessions",
        "#SessionCollection.SessionCollection",
        "Session Collection",
        &members,
    ))
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(rename = "UserName")]
    user_name: String,
    #[serde(rename = "Password")]
    password: String,
}

/// `POST /redfish/v1/SessionService/Sessions` — validates credentials against the VM's configured
/// Redfish account and issues a session token, returned as both the `X-Auth-Token` header and
/// `Location` header per the Redfish session-login convention.
pub async fn create_session(
    State(context): State<VmContext>,
    Json(body): Json<LoginBody>,
) -> Result<Response, RedfishError> {
    let vm = context.vm();
    if body.user_name != vm.redfish_user || body.password != vm.redfish_password {
        return Err(RedfishError::Unauthorized);
    }
    let (token, id) = context.sessions.create(&body.user_name).await;
    let location = format!("/redfish/v1/SessionService/Sessions/{id}");
    let mut response = odata::created(
        &location,
        json!({
            "@odata.id": location,
            "@odata.type": "#Session.v1_6_0.Session",
            "Id": id,
            "Name": "User Session",
            "UserName": body.user_name,
        }),
    );
    if let Ok(value) = axum::http::HeaderValue::from_str(&token) {
        response.headers_mut().insert("x-auth-token", value);
    }
    Ok(response)
}

/// `DELETE /redfish/v1/SessionService/Sessions/{id}` — logs out.
pub async fn delete_session(
    State(context): State<VmContext>,
    Path(id): Path<String>,
) -> Result<Response, RedfishError> {
    if context.sessions.remove_by_id(&id).await {
        Ok(odata::no_content())
    } else {
        Err(RedfishError::NotFound)
    }
}
