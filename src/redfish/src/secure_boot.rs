// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Systems/{vm}/SecureBoot` (§4.5). Cache mutation only, no vSphere call.

use axum::extract::{Json, Path, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;
use crate::systems::require_matching_vm;

/// `GET /redfish/v1/Systems/{vm}/SecureBoot`.
pub async fn get_secure_boot(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();
    let enabled = vm.state.read().await.secure_boot_enabled;
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_id}/SecureBoot"),
        "@odata.type": "#SecureBoot.v1_1_0.SecureBoot",
        "Id": "SecureBoot",
        "Name": "UEFI Secure Boot",
        "SecureBootEnable": enabled,
        "SecureBootCurrentBoot": if enabled { "Enabled" } else { "Disabled" },
        "SecureBootMode": "UserMode",
        "Actions": {
            "#SecureBoot.ResetKeys": { "target": format!("/redfish/v1/Systems/{vm_id}/SecureBoot/Actions/SecureBoot.ResetKeys") },
        },
    })))
}

#[derive(Debug, Deserialize)]
struct SecureBootPatch {
    #[serde(rename = "SecureBootEnable")]
    enable: bool,
}

/// `PATCH /redfish/v1/Systems/{vm}/SecureBoot`.
pub async fn patch_secure_boot(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
    Json(body): Json<SecureBootPatch>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();
    vm.state.write().await.secure_boot_enabled = body.enable;
    Ok(odata::no_content())
}

/// `POST /redfish/v1/Systems/{vm}/SecureBoot/Actions/SecureBoot.ResetKeys`.
pub async fn reset_keys(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    Ok(odata::no_content())
}
