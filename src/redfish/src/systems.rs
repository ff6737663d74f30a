// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Systems` — the single managed VM, its power control, boot override and inventory
//! links (§4.5).

use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use bridge_core::{BootEnabled, BootTarget, PowerState};
use serde::Deserialize;
use serde_json::json;
use vsphere::AdapterError;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

/// `GET /redfish/v1/Systems` — this bridge always serves exactly one member: the VM the
/// listener was configured for.
pub async fn get_collection(State(context): State<VmContext>) -> Response {
    odata::ok_json(odata::collection(
        "/redfish/v1/Systems",
        "#ComputerSystemCollection.ComputerSystemCollection",
        "Computer System Collection",
        &[format!("/redfish/v1/Systems/{}", context.vm_name)],
    ))
}

/// `GET /redfish/v1/Systems/{vm}`.
pub async fn get_system(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();

    // Best-effort refresh: vSphere failures never surface here, the cached state answers.
    if let Ok(observed) = context.state.vsphere.get_power_state(&vm.name).await {
        let mut cached = vm.state.write().await;
        cached.power_state = match observed {
            vsphere::ObservedPowerState::On => PowerState::On,
            vsphere::ObservedPowerState::Off => PowerState::Off,
        };
    }

    let cached = vm.state.read().await;
    let power_state = match cached.power_state {
        PowerState::On => "On",
        PowerState::Off => "Off",
        PowerState::Unknown => "Off",
    };
    let boot_target = boot_target_name(cached.boot_override.target);
    let boot_enabled = boot_enabled_name(cached.boot_override.enabled);
    drop(cached);

    let vm_name = context.vm_name.as_ref();
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_name}"),
        "@odata.type": "#ComputerSystem.v1_20_1.ComputerSystem",
        "Id": vm_name,
        "Name": vm_name,
        "SystemType": "Virtual",
        "PowerState": power_state,
        "Boot": {
            "BootSourceOverrideTarget": boot_target,
            "BootSourceOverrideEnabled": boot_enabled,
            "BootSourceOverrideMode": "UEFI",
        },
        "ProcessorSummary": { "Count": 1, "Status": { "Health": "OK" } },
        "MemorySummary": { "TotalSystemMemoryGiB": 1, "Status": { "Health": "OK" } },
        "Status": { "Health": "OK", "State": "Enabled" },
        "Links": {
            "Chassis": [odata::link(format!("/redfish/v1/Chassis/{vm_name}-Chassis"))],
            "ManagedBy": [odata::link(format!("/redfish/v1/Managers/{vm_name}-BMC"))],
        },
        "Storage": odata::link(format!("/redfish/v1/Systems/{vm_name}/Storage")),
        "Bios": odata::link(format!("/redfish/v1/Systems/{vm_name}/Bios")),
        "SecureBoot": odata::link(format!("/redfish/v1/Systems/{vm_name}/SecureBoot")),
        "EthernetInterfaces": odata::link(format!("/redfish/v1/Systems/{vm_name}/EthernetInterfaces")),
        "Processors": odata::link(format!("/redfish/v1/Systems/{vm_name}/Processors")),
        "Memory": odata::link(format!("/redfish/v1/Systems/{vm_name}/Memory")),
        "LogServices": odata::link(format!("/redfish/v1/Managers/{vm_name}-BMC/LogServices")),
        "Actions": {
            "#ComputerSystem.Reset": {
                "target": format!("/redfish/v1/Systems/{vm_name}/Actions/ComputerSystem.Reset"),
                "ResetType@Redfish.AllowableValues": [
                    "On", "ForceOff", "GracefulShutdown", "GracefulRestart", "ForceRestart",
                    "PushPowerButton", "PowerCycle",
                ],
            }
        },
    })))
}

#[derive(Debug, Deserialize)]
struct ResetBody {
    #[serde(rename = "ResetType")]
    reset_type: String,
}

/// `POST /redfish/v1/Systems/{vm}/Actions/ComputerSystem.Reset`.
pub async fn reset(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
    Json(body): Json<ResetBody>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();
    let adapter = &context.state.vsphere;

    let result = match body.reset_type.as_str() {
        "On" | "PushPowerButton" => adapter.power_on(&vm.name).await,
        "ForceOff" => adapter.power_off(&vm.name, true).await,
        "GracefulShutdown" => adapter.shutdown_guest(&vm.name).await,
        "ForceRestart" => adapter.reset(&vm.name).await,
        "GracefulRestart" => adapter.reboot_guest(&vm.name).await,
        "PowerCycle" => {
            let _ = adapter.power_off(&vm.name, false).await;
            adapter.power_on(&vm.name).await
        }
        other => {
            return Err(RedfishError::BadRequest(format!("unknown ResetType {other}")));
        }
    };

    // §4.6/§7: a reset that hits the vSphere layer still completes via a soft-success task.
    let outcome = match result {
        Ok(()) => bridge_core::TaskOutcome::Success("Reset applied".to_string()),
        Err(err) if matches!(err, AdapterError::UpstreamUnavailable(_)) => {
            bridge_core::TaskOutcome::Degraded(
                "Upstream unavailable; operation deferred.".to_string(),
            )
        }
        Err(_) => bridge_core::TaskOutcome::Degraded("Operation deferred.".to_string()),
    };
    context
        .state
        .tasks
        .spawn(
            "ComputerSystem.Reset",
            format!("/redfish/v1/Systems/{}", vm.name),
            move || Box::pin(async move { outcome }),
        )
        .await;

    consume_boot_once_if_power_on(&vm, &body.reset_type).await;

    Ok(odata::no_content())
}

async fn consume_boot_once_if_power_on(vm: &bridge_core::ManagedVm, reset_type: &str) {
    if matches!(reset_type, "On" | "ForceRestart" | "GracefulRestart" | "PowerCycle") {
        vm.state.write().await.consume_boot_once();
    }
}

#[derive(Debug, Deserialize, Default)]
struct BootPatch {
    #[serde(rename = "BootSourceOverrideTarget")]
    target: Option<String>,
    #[serde(rename = "BootSourceOverrideEnabled")]
    enabled: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SystemPatch {
    #[serde(rename = "Boot")]
    boot: Option<BootPatch>,
}

/// `PATCH /redfish/v1/Systems/{vm}` — boot override only (§4.5).
pub async fn patch_system(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
    Json(patch): Json<SystemPatch>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let vm = context.vm();
    let Some(boot) = patch.boot else {
        return Ok(odata::no_content_with_etag(&cached_state_etag(&vm).await));
    };

    let target = boot
        .target
        .as_deref()
        .map(parse_boot_target)
        .transpose()?;
    let enabled = boot
        .enabled
        .as_deref()
        .map(parse_boot_enabled)
        .transpose()?;

    {
        let mut cached = vm.state.write().await;
        if let Some(target) = target {
            cached.boot_override.target = target;
        }
        if let Some(enabled) = enabled {
            cached.boot_override.enabled = enabled;
        }
    }

    if target == Some(BootTarget::Cd) {
        if let Some(iso) = &vm.default_iso {
            let _ = context
                .state
                .vsphere
                .mount_iso(&vm.name, &iso.datastore, &iso.path)
                .await;
        }
    } else if matches!(target, Some(BootTarget::Hdd) | Some(BootTarget::None)) {
        let _ = context.state.vsphere.unmount_iso(&vm.name).await;
    }

    Ok(odata::no_content_with_etag(&cached_state_etag(&vm).await))
}

/// A weak version tag over the bits a PATCH can change, so a client can see its write reflected
/// in the response without a follow-up GET.
async fn cached_state_etag(vm: &bridge_core::ManagedVm) -> String {
    let cached = vm.state.read().await;
    let power = match cached.power_state {
        PowerState::On => "On",
        PowerState::Off => "Off",
        PowerState::Unknown => "Unknown",
    };
    format!(
        "W/\"{}-{}-{power}\"",
        boot_target_name(cached.boot_override.target),
        boot_enabled_name(cached.boot_override.enabled),
    )
}

fn parse_boot_target(value: &str) -> Result<BootTarget, RedfishError> {
    Ok(match value {
        "None" => BootTarget::None,
        "Pxe" => BootTarget::Pxe,
        "Cd" => BootTarget::Cd,
        "Hdd" => BootTarget::Hdd,
        "Usb" => BootTarget::Usb,
        "Floppy" => BootTarget::Floppy,
        "BiosSetup" => BootTarget::BiosSetup,
        "UefiShell" => BootTarget::UefiShell,
        "UefiHttp" => BootTarget::UefiHttp,
        "UefiTarget" => BootTarget::UefiTarget,
        "Diags" => BootTarget::Diags,
        "Utilities" => BootTarget::Utilities,
        other => return Err(RedfishError::BadRequest(format!("unknown boot target {other}"))),
    })
}

fn parse_boot_enabled(value: &str) -> Result<BootEnabled, RedfishError> {
    Ok(match value {
        "Disabled" => BootEnabled::Disabled,
        "Once" => BootEnabled::Once,
        "Continuous" => BootEnabled::Continuous,
        other => return Err(RedfishError::BadRequest(format!("unknown boot enabled {other}"))),
    })
}

fn boot_target_name(target: BootTarget) -> &'static str {
    match target {
        BootTarget::None => "None",
        BootTarget::Pxe => "Pxe",
        BootTarget::Cd => "Cd",
        BootTarget::Hdd => "Hdd",
        BootTarget::Usb => "Usb",
        BootTarget::Floppy => "Floppy",
        BootTarget::BiosSetup => "BiosSetup",
        BootTarget::UefiShell => "UefiShell",
        BootTarget::UefiHttp => "UefiHttp",
        BootTarget::UefiTarget => "UefiTarget",
        BootTarget::Diags => "Diags",
        BootTarget::Utilities => "Utilities",
    }
}

fn boot_enabled_name(enabled: BootEnabled) -> &'static str {
    match enabled {
        BootEnabled::Disabled => "Disabled",
        BootEnabled::Once => "Once",
        BootEnabled::Continuous => "Continuous",
    }
}

pub(crate) fn require_matching_vm(context: &VmContext, vm_id: &str) -> Result<(), RedfishError> {
    if context.vm_name.as_ref() == vm_id {
        Ok(())
    } else {
        Err(RedfishError::NotFound)
    }
}
