// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Systems/{vm}/Bios` — free-form BIOS attribute map (§4.5). Purely a cache mutation;
//! no vSphere call.

use axum::extract::{Json, Path, State};
use axum::response::Response;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;
use crate::systems::require_matching_vm;

/// `GET /redfish/v1/Systems/{vm}/Bios`.
pub async fn get_bios(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();
    let cached = vm.state.read().await;
    let attributes: BTreeMap<_, _> = cached.bios_attributes.clone();
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_id}/Bios"),
        "@odata.type": "#Bios.v1_2_1.Bios",
        "Id": "Bios",
        "Name": "BIOS Configuration",
        "AttributeRegistry": "BiosAttributeRegistry.v1_0_0",
        "Attributes": attributes,
        "Actions": {
            "#Bios.ResetBios": { "target": format!("/redfish/v1/Systems/{vm_id}/Bios/Actions/Bios.ResetBios") },
        },
    })))
}

/// `PATCH /redfish/v1/Systems/{vm}/Bios` — merges the submitted `Attributes` map into the cache.
pub async fn patch_bios(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();
    if let Some(attributes) = body.get("Attributes").and_then(Value::as_object) {
        let mut cached = vm.state.write().await;
        for (key, value) in attributes {
            if let Some(text) = value.as_str() {
                cached.bios_attributes.insert(key.clone(), text.to_string());
            } else {
                cached.bios_attributes.insert(key.clone(), value.to_string());
            }
        }
    }
    Ok(odata::no_content())
}

/// `POST /redfish/v1/Systems/{vm}/Bios/Actions/Bios.ResetBios`.
pub async fn reset_bios(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();
    let mut cached = vm.state.write().await;
    cached.bios_attributes = bridge_core::VmCachedState::default().bios_attributes;
    Ok(odata::no_content())
}
