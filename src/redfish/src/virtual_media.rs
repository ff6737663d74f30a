// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Managers/{vm}-BMC/VirtualMedia/{CD|Floppy}` — ISO mount/unmount (§4.5).

use axum::extract::{Json, Path, State};
use axum::response::Response;
use bridge_core::VirtualMediaDevice;
use serde::Deserialize;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

fn parse_device(segment: &str) -> Result<VirtualMediaDevice, RedfishError> {
    match segment {
        "CD" => Ok(VirtualMediaDevice::Cd),
        "Floppy" => Ok(VirtualMediaDevice::Floppy),
        _ => Err(RedfishError::NotFound),
    }
}

fn check_manager(context: &VmContext, manager_id: &str) -> Result<(), RedfishError> {
    if manager_id != format!("{}-BMC", context.vm_name) {
        return Err(RedfishError::NotFound);
    }
    Ok(())
}

/// `GET /redfish/v1/Managers/{vm}-BMC/VirtualMedia`.
pub async fn get_collection(State(context): State<VmContext>) -> Response {
    let base = format!("/redfish/v1/Managers/{}-BMC/VirtualMedia", context.vm_name);
    odata::ok_json(odata::collection(
        &base,
        "#VirtualMediaCollection.VirtualMediaCollection",
        "Virtual Media Collection",
        &[format!("{base}/CD"), format!("{base}/Floppy")],
    ))
}

/// `GET /redfish/v1/Managers/{vm}-BMC/VirtualMedia/{device}`.
pub async fn get_device(
    State(context): State<VmContext>,
    Path((manager_id, device_segment)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    check_manager(&context, &manager_id)?;
    let device = parse_device(&device_segment)?;
    let vm = context.vm();
    let cached = vm.state.read().await;
    let media = cached.virtual_media(device);
    let base = format!("/redfish/v1/Managers/{}-BMC/VirtualMedia/{device_segment}", context.vm_name);
    Ok(odata::ok_json(json!({
        "@odata.id": base,
        "@odata.type": "#VirtualMedia.v1_5_0.VirtualMedia",
        "Id": device_segment,
        "Name": format!("Virtual {device_segment}"),
        "MediaTypes": ["CD", "DVD"],
        "Image": media.image_uri,
        "Inserted": media.inserted,
        "WriteProtected": media.write_protected,
        "Actions": {
            "#VirtualMedia.InsertMedia": { "target": format!("{base}/Actions/VirtualMedia.InsertMedia") },
            "#VirtualMedia.EjectMedia": { "target": format!("{base}/Actions/VirtualMedia.EjectMedia") },
        },
    })))
}

#[derive(Debug, Deserialize)]
struct InsertMediaBody {
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Inserted", default = "default_true")]
    #[allow(dead_code)]
    inserted: bool,
    #[serde(rename = "WriteProtected", default)]
    write_protected: bool,
}

fn default_true() -> bool {
    true
}

/// Parses a posted `Image` URI into the `(datastore, path)` pair `mount_iso` expects. Accepts
/// vSphere's own `[datastore] path` datastore-path syntax as well as a plain `datastore:path`
/// form; anything else is left for the caller to fall back on.
fn parse_image_uri(image: &str) -> Option<(String, String)> {
    let trimmed = image.trim();
    if let Some(rest) = trimmed.strip_prefix('[') {
        let (datastore, path) = rest.split_once(']')?;
        return Some((datastore.trim().to_string(), path.trim().to_string()));
    }
    let (datastore, path) = trimmed.split_once(':')?;
    Some((datastore.trim().to_string(), path.trim_start_matches('/').to_string()))
}

/// `POST .../Actions/VirtualMedia.InsertMedia`. Idempotent: inserting the same image twice
/// leaves state equal to a single insert (§8).
pub async fn insert_media(
    State(context): State<VmContext>,
    Path((manager_id, device_segment)): Path<(String, String)>,
    Json(body): Json<InsertMediaBody>,
) -> Result<Response, RedfishError> {
    check_manager(&context, &manager_id)?;
    let device = parse_device(&device_segment)?;
    let vm = context.vm();
    {
        let mut cached = vm.state.write().await;
        cached
            .virtual_media_mut(device)
            .insert(body.image.clone(), body.write_protected);
    }

    if device == VirtualMediaDevice::Cd {
        // Mount whatever the client actually asked for; the preconfigured `default_iso` is only
        // a fallback for images posted in a form this bridge can't decompose into a datastore
        // path.
        if let Some((datastore, path)) = parse_image_uri(&body.image) {
            let _ = context.state.vsphere.mount_iso(&vm.name, &datastore, &path).await;
        } else if let Some(iso) = &vm.default_iso {
            let _ = context
                .state
                .vsphere
                .mount_iso(&vm.name, &iso.datastore, &iso.path)
                .await;
        }
    }

    Ok(odata::no_content())
}

/// `POST .../Actions/VirtualMedia.EjectMedia`. Idempotent: ejecting twice leaves the state
/// ejected (§8).
pub async fn eject_media(
    State(context): State<VmContext>,
    Path((manager_id, device_segment)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    check_manager(&context, &manager_id)?;
    let device = parse_device(&device_segment)?;
    let vm = context.vm();
    vm.state.write().await.virtual_media_mut(device).eject();

    if device == VirtualMediaDevice::Cd {
        let _ = context.state.vsphere.unmount_iso(&vm.name).await;
    }

    Ok(odata::no_content())
}
