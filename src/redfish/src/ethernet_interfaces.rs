// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Systems/{vm}/EthernetInterfaces` — read-only, one member per NIC reported by
//! `get_inventory` (§4.5). `Managers/{vm}-BMC/EthernetInterfaces` reuses the same collection
//! shape for the BMC's own (synthetic, single) management NIC.

use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;
use crate::systems::require_matching_vm;

async fn inventory_or_minimal(context: &VmContext) -> vsphere::Inventory {
    let vm = context.vm();
    match context.state.vsphere.get_inventory(&vm.name).await {
        Ok(inventory) => inventory,
        Err(_) => vsphere::Inventory::minimal_valid(),
    }
}

/// `GET /redfish/v1/Systems/{vm}/EthernetInterfaces`.
pub async fn get_collection(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let inventory = inventory_or_minimal(&context).await;
    let members: Vec<String> = (0..inventory.nics.len().max(1))
        .map(|index| format!("/redfish/v1/Systems/{vm_id}/EthernetInterfaces/NIC{index}"))
        .collect();
    Ok(odata::ok_json(odata::collection(
        &format!("/redfish/v1/Systems/{vm_id}/EthernetInterfaces"),
        "#EthernetInterfaceCollection.EthernetInterfaceCollection",
        "Ethernet Interface Collection",
        &members,
    )))
}

/// `GET /redfish/v1/Systems/{vm}/EthernetInterfaces/{id}`.
pub async fn get_interface(
    State(context): State<VmContext>,
    Path((vm_id, nic_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let inventory = inventory_or_minimal(&context).await;
    let index: usize = nic_id
        .strip_prefix("NIC")
        .and_then(|rest| rest.parse().ok())
        .ok_or(RedfishError::NotFound)?;

    let (mac, connected, name) = match inventory.nics.get(index) {
        Some(nic) => (nic.mac.clone(), nic.connected, nic.name.clone()),
        None if index == 0 => ("00:00:00:00:00:00".to_string(), false, "Network adapter 1".to_string()),
        None => return Err(RedfishError::NotFound),
    };

    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_id}/EthernetInterfaces/{nic_id}"),
        "@odata.type": "#EthernetInterface.v1_9_1.EthernetInterface",
        "Id": nic_id,
        "Name": name,
        "PermanentMACAddress": mac,
        "LinkStatus": if connected { "LinkUp" } else { "LinkDown" },
        "Status": { "Health": "OK", "State": if connected { "Enabled" } else { "Disabled" } },
    })))
}

const MANAGER_NIC_ID: &str = "eth0";

/// `GET /redfish/v1/Managers/{manager}/EthernetInterfaces` — the BMC's own synthetic management
/// NIC; unlike the VM's NICs this one has no vSphere backing, there is exactly one member.
pub async fn get_manager_collection(
    State(context): State<VmContext>,
    Path(manager_id): Path<String>,
) -> Response {
    odata::ok_json(odata::collection(
        &format!("/redfish/v1/Managers/{manager_id}/EthernetInterfaces"),
        "#EthernetInterfaceCollection.EthernetInterfaceCollection",
        "Manager Ethernet Interface Collection",
        &[format!(
            "/redfish/v1/Managers/{manager_id}/EthernetInterfaces/{MANAGER_NIC_ID}"
        )],
    ))
}

/// `GET /redfish/v1/Managers/{manager}/EthernetInterfaces/{id}`.
pub async fn get_manager_interface(
    State(context): State<VmContext>,
    Path((manager_id, nic_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    if manager_id != format!("{}-BMC", context.vm_name) {
        return Err(RedfishError::NotFound);
    }
    if nic_id != MANAGER_NIC_ID {
        return Err(RedfishError::NotFound);
    }
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Managers/{manager_id}/EthernetInterfaces/{nic_id}"),
        "@odata.type": "#EthernetInterface.v1_9_1.EthernetInterface",
        "Id": nic_id,
        "Name": "Management Network Interface",
        "PermanentMACAddress": "00:50:56:bc:00:01",
        "LinkStatus": "LinkUp",
        "Status": { "Health": "OK", "State": "Enabled" },
    })))
}
