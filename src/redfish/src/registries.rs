// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Registries` — a single static `Base.1.0.0` message registry member.
//!
//! Orchestrators that resolve a `Task`/`LogEntry` `MessageId` against its registry need this
//! collection to exist even though this bridge only ever emits `Base.1.0.*` message ids; no other
//! registry is advertised.

use axum::extract::Path;
use axum::response::Response;
use serde_json::json;

use crate::error::RedfishError;
use crate::odata;

const MEMBER_ID: &str = "Base.1.0.0";

/// `GET /redfish/v1/Registries`.
pub async fn get_collection() -> Response {
    odata::ok_json(odata::collection(
        "/redfish/v1/Registries",
        "#MessageRegistryFileCollection.MessageRegistryFileCollection",
        "Registry File Collection",
        &[format!("/redfish/v1/Registries/{MEMBER_ID}")],
    ))
}

/// `GET /redfish/v1/Registries/{id}`.
pub async fn get_registry(Path(id): Path<String>) -> Result<Response, RedfishError> {
    if id != MEMBER_ID {
        return Err(RedfishError::NotFound);
    }
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Registries/{MEMBER_ID}"),
        "@odata.type": "#MessageRegistryFile.v1_1_4.MessageRegistryFile",
        "Id": MEMBER_ID,
        "Name": "Base Message Registry File",
        "Languages": ["en"],
        "Registry": MEMBER_ID,
        "Location": [{
            "Language": "en",
            "Uri": "https://redfish.dmtf.org/registries/Base.1.0.0.json",
        }],
    })))
}
