// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/` — the entry point every client resolves first (§4.4/§4.5), public without
//! authentication.

use axum::extract::State;
use axum::response::Response;
use serde_json::json;

use crate::context::VmContext;
use crate::odata;

/// `GET /redfish/v1/`.
pub async fn get_service_root(State(context): State<VmContext>) -> Response {
    let vm_name = context.vm_name.as_ref();
    odata::ok_json(json!({
        "@odata.id": "/redfish/v1/",
        "@odata.type": "#ServiceRoot.v1_17_0.ServiceRoot",
        "Id": "RootService",
        "Name": "Bridge Redfish Service",
        "RedfishVersion": "1.17.0",
        "UUID": format!("{:0>32}", hex_name(vm_name)),
        "Systems": odata::link("/redfish/v1/Systems"),
        "Managers": odata::link("/redfish/v1/Managers"),
        "Chassis": odata::link("/redfish/v1/Chassis"),
        "SessionService": odata::link("/redfish/v1/SessionService"),
        "UpdateService": odata::link("/redfish/v1/UpdateService"),
        "TaskService": odata::link("/redfish/v1/TaskService"),
        "EventService": odata::link("/redfish/v1/EventService"),
        "Registries": odata::link("/redfish/v1/Registries"),
        "Links": {
            "Sessions": odata::link("/redfish/v1/SessionService/Sessions"),
        },
    }))
}

/// Derives a stable, deterministic hex string from the VM name for the synthetic service UUID —
/// not a real hardware identifier (§9's open question on synthetic constants).
fn hex_name(vm_name: &str) -> String {
    vm_name
        .bytes()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>()
}
