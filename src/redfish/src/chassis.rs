// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Chassis/{vm}-Chassis` and its synthetic Power/Thermal sub-resources (§4.5).
//!
//! Sensor values are synthetic and not protocol-critical (§9's open question on synthetic
//! constants); stable plausible numbers are returned rather than real telemetry, per the
//! "real sensor telemetry" non-goal in §1.

use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

fn chassis_id(vm_name: &str) -> String {
    format!("{vm_name}-Chassis")
}

/// `GET /redfish/v1/Chassis`.
pub async fn get_collection(State(context): State<VmContext>) -> Response {
    odata::ok_json(odata::collection(
        "/redfish/v1/Chassis",
        "#ChassisCollection.ChassisCollection",
        "Chassis Collection",
        &[format!("/redfish/v1/Chassis/{}", chassis_id(&context.vm_name))],
    ))
}

/// `GET /redfish/v1/Chassis/{vm}-Chassis`.
pub async fn get_chassis(
    State(context): State<VmContext>,
    Path(chassis_path): Path<String>,
) -> Result<Response, RedfishError> {
    let expected = chassis_id(&context.vm_name);
    if chassis_path != expected {
        return Err(RedfishError::NotFound);
    }
    let vm_name = context.vm_name.as_ref();
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Chassis/{expected}"),
        "@odata.type": "#Chassis.v1_22_0.Chassis",
        "Id": expected,
        "Name": "Chassis",
        "ChassisType": "Virtual",
        "Status": { "Health": "OK", "State": "Enabled" },
        "Power": odata::link(format!("/redfish/v1/Chassis/{expected}/Power")),
        "Thermal": odata::link(format!("/redfish/v1/Chassis/{expected}/Thermal")),
        "NetworkAdapters": odata::link(format!("/redfish/v1/Chassis/{expected}/NetworkAdapters")),
        "Links": {
            "ComputerSystems": [odata::link(format!("/redfish/v1/Systems/{vm_name}"))],
            "ManagedBy": [odata::link(format!("/redfish/v1/Managers/{vm_name}-BMC"))],
        },
    })))
}

/// `GET /redfish/v1/Chassis/{vm}-Chassis/Power`.
pub async fn get_power(
    State(context): State<VmContext>,
    Path(chassis_path): Path<String>,
) -> Result<Response, RedfishError> {
    let expected = chassis_id(&context.vm_name);
    if chassis_path != expected {
        return Err(RedfishError::NotFound);
    }
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Chassis/{expected}/Power"),
        "@odata.type": "#Power.v1_7_1.Power",
        "Id": "Power",
        "Name": "Power",
        "PowerControl": [{
            "MemberId": "0",
            "PowerConsumedWatts": 120,
            "Status": { "Health": "OK" },
        }],
        "Voltages": [
            { "Name": "CPU Vcore", "ReadingVolts": 1.05, "Status": { "Health": "OK" } },
            { "Name": "12V Rail", "ReadingVolts": 12.02, "Status": { "Health": "OK" } },
        ],
        "PowerSupplies": [{
            "MemberId": "0",
            "PowerCapacityWatts": 750,
            "Status": { "Health": "OK", "State": "Enabled" },
        }],
    })))
}

/// `GET /redfish/v1/Chassis/{vm}-Chassis/NetworkAdapters` — reflects the VM's NIC inventory
/// (§4.5).
pub async fn get_network_adapters(
    State(context): State<VmContext>,
    Path(chassis_path): Path<String>,
) -> Result<Response, RedfishError> {
    let expected = chassis_id(&context.vm_name);
    if chassis_path != expected {
        return Err(RedfishError::NotFound);
    }
    let vm = context.vm();
    let inventory = match context.state.vsphere.get_inventory(&vm.name).await {
        Ok(inventory) => inventory,
        Err(_) => vsphere::Inventory::minimal_valid(),
    };
    let members: Vec<String> = (0..inventory.nics.len().max(1))
        .map(|index| format!("/redfish/v1/Chassis/{expected}/NetworkAdapters/NIC{index}"))
        .collect();
    Ok(odata::ok_json(odata::collection(
        &format!("/redfish/v1/Chassis/{expected}/NetworkAdapters"),
        "#NetworkAdapterCollection.NetworkAdapterCollection",
        "Network Adapters Collection",
        &members,
    )))
}

/// `GET /redfish/v1/Chassis/{vm}-Chassis/Thermal`.
pub async fn get_thermal(
    State(context): State<VmContext>,
    Path(chassis_path): Path<String>,
) -> Result<Response, RedfishError> {
    let expected = chassis_id(&context.vm_name);
    if chassis_path != expected {
        return Err(RedfishError::NotFound);
    }
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Chassis/{expected}/Thermal"),
        "@odata.type": "#Thermal.v1_7_0.Thermal",
        "Id": "Thermal",
        "Name": "Thermal",
        "Temperatures": [
            { "Name": "CPU Temp", "ReadingCelsius": 42, "Status": { "Health": "OK" } },
            { "Name": "System Temp", "ReadingCelsius": 31, "Status": { "Health": "OK" } },
        ],
        "Fans": [
            { "Name": "Fan 1", "Reading": 3200, "ReadingUnits": "RPM", "Status": { "Health": "OK" } },
        ],
    })))
}
