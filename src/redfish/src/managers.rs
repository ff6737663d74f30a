// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Managers/{vm}-BMC` — the simulated BMC identity.

use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

/// A stable, plausible firmware version string for the simulated BMC. Not protocol-critical
/// (§9's open question on synthetic constants); chosen once and documented here.
pub const FIRMWARE_VERSION: &str = "2.88.0";

fn manager_id(vm_name: &str) -> String {
    format!("{vm_name}-BMC")
}

/// `GET /redfish/v1/Managers`.
pub async fn get_collection(State(context): State<VmContext>) -> Response {
    odata::ok_json(odata::collection(
        "/redfish/v1/Managers",
        "#ManagerCollection.ManagerCollection",
        "Manager Collection",
        &[format!("/redfish/v1/Managers/{}", manager_id(&context.vm_name))],
    ))
}

/// `GET /redfish/v1/Managers/{vm}-BMC`.
pub async fn get_manager(
    State(context): State<VmContext>,
    Path(manager_path): Path<String>,
) -> Result<Response, RedfishError> {
    let expected = manager_id(&context.vm_name);
    if manager_path != expected {
        return Err(RedfishError::NotFound);
    }
    let vm_name = context.vm_name.as_ref();
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Managers/{expected}"),
        "@odata.type": "#Manager.v1_14_0.Manager",
        "Id": expected,
        "Name": "Manager",
        "ManagerType": "BMC",
        "FirmwareVersion": FIRMWARE_VERSION,
        "Status": { "Health": "OK", "State": "Enabled" },
        "Links": {
            "ManagerForServers": [odata::link(format!("/redfish/v1/Systems/{vm_name}"))],
        },
        "VirtualMedia": odata::link(format!("/redfish/v1/Managers/{expected}/VirtualMedia")),
        "LogServices": odata::link(format!("/redfish/v1/Managers/{expected}/LogServices")),
        "EthernetInterfaces": odata::link(format!("/redfish/v1/Managers/{expected}/EthernetInterfaces")),
    })))
}
