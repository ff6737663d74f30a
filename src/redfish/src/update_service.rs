// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/UpdateService` and `FirmwareInventory` (§4.5). Firmware update is simulated
//! (§1 non-goal "real firmware update"): actions create a Task that reaches `Completed`/`OK`
//! over a simulated progress curve without touching any real firmware.

use axum::extract::{Json, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

/// The fixed firmware inventory members this bridge advertises (§4.5). Versions are stable,
/// plausible constants — not protocol-critical (§9).
const FIRMWARE_MEMBERS: &[(&str, &str)] = &[
    ("BIOS", "2.14.0"),
    ("BMC", super::managers::FIRMWARE_VERSION),
    ("NIC.Slot.1", "21.80.4"),
    ("Storage", "5.15.0"),
    ("CPU", "0x0000001"),
    ("PSU", "1.2.0"),
    ("PCIe", "3.4.1"),
];

/// `GET /redfish/v1/UpdateService`.
pub async fn get_update_service(State(_context): State<VmContext>) -> Response {
    odata::ok_json(json!({
        "@odata.id": "/redfish/v1/UpdateService",
        "@odata.type": "#UpdateService.v1_11_1.UpdateService",
        "Id": "UpdateService",
        "Name": "Update Service",
        "ServiceEnabled": true,
        "HttpPushUriTargetsBusy": false,
        "FirmwareInventory": odata::link("/redfish/v1/UpdateService/FirmwareInventory"),
        "SoftwareInventory": odata::link("/redfish/v1/UpdateService/SoftwareInventory"),
        "Actions": {
            "#UpdateService.SimpleUpdate": {
                "target": "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate",
            },
            "#UpdateService.StartUpdate": {
                "target": "/redfish/v1/UpdateService/Actions/UpdateService.StartUpdate",
            },
        },
    }))
}

fn inventory_collection(odata_id: &str, name: &str) -> Response {
    let members: Vec<String> = FIRMWARE_MEMBERS
        .iter()
        .map(|(id, _)| format!("{odata_id}/{id}"))
        .collect();
    odata::ok_json(odata::collection(
        odata_id,
        "#SoftwareInventoryCollection.SoftwareInventoryCollection",
        name,
        &members,
    ))
}

/// `GET /redfish/v1/UpdateService/FirmwareInventory`.
pub async fn get_firmware_inventory_collection() -> Response {
    inventory_collection(
        "/redfish/v1/UpdateService/FirmwareInventory",
        "Firmware Inventory Collection",
    )
}

/// `GET /redfish/v1/UpdateService/SoftwareInventory` — this bridge reports the same fixed
/// members for both collections; it has no separate "software" concept.
pub async fn get_software_inventory_collection() -> Response {
    inventory_collection(
        "/redfish/v1/UpdateService/SoftwareInventory",
        "Software Inventory Collection",
    )
}

/// `GET /redfish/v1/UpdateService/FirmwareInventory/{id}`.
pub async fn get_firmware_item(
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Result<Response, RedfishError> {
    let Some((name, version)) = FIRMWARE_MEMBERS.iter().find(|(member, _)| *member == id) else {
        return Err(RedfishError::NotFound);
    };
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/UpdateService/FirmwareInventory/{name}"),
        "@odata.type": "#SoftwareInventory.v1_10_0.SoftwareInventory",
        "Id": name,
        "Name": name,
        "Version": version,
        "Updateable": true,
        "Status": { "Health": "OK", "State": "Enabled" },
    })))
}

#[derive(Debug, Deserialize)]
struct SimpleUpdateBody {
    #[serde(rename = "ImageURI")]
    #[allow(dead_code)]
    image_uri: String,
}

async fn start_simulated_update(context: &VmContext, action_name: &str) -> Response {
    let vm_name = context.vm_name.to_string();
    let task_id = context
        .state
        .tasks
        .spawn(
            format!("{action_name} worker-firmware"),
            format!("/redfish/v1/Systems/{vm_name}"),
            || Box::pin(async { bridge_core::TaskOutcome::Success("Firmware updated".to_string()) }),
        )
        .await;
    odata::accepted(&format!("/redfish/v1/TaskService/Tasks/{task_id}"))
}

/// `POST /redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate`.
pub async fn simple_update(
    State(context): State<VmContext>,
    Json(_body): Json<SimpleUpdateBody>,
) -> Response {
    start_simulated_update(&context, "SimpleUpdate").await
}

/// `POST /redfish/v1/UpdateService/Actions/UpdateService.StartUpdate`.
pub async fn start_update(State(context): State<VmContext>) -> Response {
    start_simulated_update(&context, "StartUpdate").await
}
