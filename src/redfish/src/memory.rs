// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Systems/{vm}/Memory` — read-only, populated from `get_inventory` (§4.5).

use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;
use crate::systems::require_matching_vm;

const MEMORY_ID: &str = "DIMM1";

/// `GET /redfish/v1/Systems/{vm}/Memory`.
pub async fn get_collection(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    Ok(odata::ok_json(odata::collection(
        &format!("/redfish/v1/Systems/{vm_id}/Memory"),
        "#MemoryCollection.MemoryCollection",
        "Memory Collection",
        &[format!("/redfish/v1/Systems/{vm_id}/Memory/{MEMORY_ID}")],
    )))
}

/// `GET /redfish/v1/Systems/{vm}/Memory/{id}`.
pub async fn get_memory(
    State(context): State<VmContext>,
    Path((vm_id, memory_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    if memory_id != MEMORY_ID {
        return Err(RedfishError::NotFound);
    }
    let vm = context.vm();
    let inventory = match context.state.vsphere.get_inventory(&vm.name).await {
        Ok(inventory) => inventory,
        Err(_) => vsphere::Inventory::minimal_valid(),
    };
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_id}/Memory/{memory_id}"),
        "@odata.type": "#Memory.v1_14_0.Memory",
        "Id": memory_id,
        "Name": "System Memory",
        "MemoryDeviceType": "DRAM",
        "CapacityMiB": inventory.memory_mb,
        "Status": { "Health": "OK", "State": "Enabled" },
    })))
}
