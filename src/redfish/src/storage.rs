// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Systems/{vm}/Storage` and its `Volumes` collection (§4.5).
//!
//! Volume creation/deletion are long-running, task-backed operations (8-12s simulated, per the
//! spec's example scenario for firmware updates scaled to storage work) rather than an immediate
//! mutation; the volume only appears in the collection once its task completes.

use std::collections::HashMap;

use axum::extract::{Json, Path, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;
use crate::systems::require_matching_vm;

/// A simulated RAID volume, visible once its creating task has completed.
#[derive(Debug, Clone)]
pub struct VolumeRecord {
    /// Volume id, used as the final path segment.
    pub id: String,
    /// RAID level as submitted, e.g. `"RAID1"`.
    pub raid_type: String,
    /// Capacity in bytes, as submitted.
    pub capacity_bytes: u64,
}

/// Per-VM in-memory volume set, keyed by storage controller id (there is exactly one,
/// `"1"`, in this bridge's synthesized tree).
#[derive(Debug, Default)]
pub struct VolumeStore {
    volumes: RwLock<HashMap<String, Vec<VolumeRecord>>>,
}

impl VolumeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn list(&self, storage_id: &str) -> Vec<VolumeRecord> {
        self.volumes
            .read()
            .await
            .get(storage_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn insert(&self, storage_id: &str, volume: VolumeRecord) {
        self.volumes
            .write()
            .await
            .entry(storage_id.to_string())
            .or_default()
            .push(volume);
    }

    async fn remove(&self, storage_id: &str, volume_id: &str) -> bool {
        let mut volumes = self.volumes.write().await;
        let Some(list) = volumes.get_mut(storage_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|volume| volume.id != volume_id);
        list.len() != before
    }
}

const STORAGE_ID: &str = "1";

/// `GET /redfish/v1/Systems/{vm}/Storage`.
pub async fn get_collection(
    State(context): State<VmContext>,
    Path(vm_id): Path<String>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    Ok(odata::ok_json(odata::collection(
        &format!("/redfish/v1/Systems/{vm_id}/Storage"),
        "#StorageCollection.StorageCollection",
        "Storage Collection",
        &[format!("/redfish/v1/Systems/{vm_id}/Storage/{STORAGE_ID}")],
    )))
}

/// `GET /redfish/v1/Systems/{vm}/Storage/{sid}`.
pub async fn get_storage(
    State(context): State<VmContext>,
    Path((vm_id, storage_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    if storage_id != STORAGE_ID {
        return Err(RedfishError::NotFound);
    }
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_id}/Storage/{storage_id}"),
        "@odata.type": "#Storage.v1_14_1.Storage",
        "Id": storage_id,
        "Name": "Storage Controller",
        "Status": { "Health": "OK" },
        "Volumes": odata::link(format!("/redfish/v1/Systems/{vm_id}/Storage/{storage_id}/Volumes")),
    })))
}

/// `GET /redfish/v1/Systems/{vm}/Storage/{sid}/Volumes`.
pub async fn get_volumes(
    State(context): State<VmContext>,
    Path((vm_id, storage_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    if storage_id != STORAGE_ID {
        return Err(RedfishError::NotFound);
    }
    let volumes = context.volumes.list(&storage_id).await;
    let members: Vec<String> = volumes
        .iter()
        .map(|volume| format!("/redfish/v1/Systems/{vm_id}/Storage/{storage_id}/Volumes/{}", volume.id))
        .collect();
    Ok(odata::ok_json(odata::collection(
        &format!("/redfish/v1/Systems/{vm_id}/Storage/{storage_id}/Volumes"),
        "#VolumeCollection.VolumeCollection",
        "Volume Collection",
        &members,
    )))
}

/// `GET /redfish/v1/Systems/{vm}/Storage/{sid}/Volumes/{volume_id}`.
pub async fn get_volume(
    State(context): State<VmContext>,
    Path((vm_id, storage_id, volume_id)): Path<(String, String, String)>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let volumes = context.volumes.list(&storage_id).await;
    let Some(volume) = volumes.into_iter().find(|v| v.id == volume_id) else {
        return Err(RedfishError::NotFound);
    };
    Ok(odata::ok_json(json!({
        "@odata.id": format!("/redfish/v1/Systems/{vm_id}/Storage/{storage_id}/Volumes/{volume_id}"),
        "@odata.type": "#Volume.v1_7_0.Volume",
        "Id": volume_id,
        "Name": "Volume",
        "RAIDType": volume.raid_type,
        "CapacityBytes": volume.capacity_bytes,
        "Status": { "Health": "OK" },
    })))
}

#[derive(Debug, Deserialize)]
struct CreateVolumeBody {
    #[serde(rename = "RAIDType", default = "default_raid_type")]
    raid_type: String,
    #[serde(rename = "CapacityBytes", default)]
    capacity_bytes: u64,
}

fn default_raid_type() -> String {
    "RAID1".to_string()
}

/// `POST /redfish/v1/Systems/{vm}/Storage/{sid}/Volumes` — creates a Task that, on completion,
/// makes the volume visible in the collection.
pub async fn create_volume(
    State(context): State<VmContext>,
    Path((vm_id, storage_id)): Path<(String, String)>,
    Json(body): Json<CreateVolumeBody>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    if storage_id != STORAGE_ID {
        return Err(RedfishError::NotFound);
    }

    let volume_id = utils::ids::random_hex_id(4);
    let volumes = context.volumes.clone();
    let storage_id_for_task = storage_id.clone();
    let volume = VolumeRecord {
        id: volume_id.clone(),
        raid_type: body.raid_type,
        capacity_bytes: body.capacity_bytes,
    };

    let task_id = context
        .state
        .tasks
        .spawn(
            "Create Volume",
            format!("/redfish/v1/Systems/{vm_id}/Storage/{storage_id}/Volumes"),
            move || {
                Box::pin(async move {
                    volumes.insert(&storage_id_for_task, volume).await;
                    bridge_core::TaskOutcome::Success("Volume created".to_string())
                })
            },
        )
        .await;

    Ok(odata::accepted(&format!("/redfish/v1/TaskService/Tasks/{task_id}")))
}

/// `DELETE /redfish/v1/Systems/{vm}/Storage/{sid}/Volumes/{volume_id}` — mirrors creation: a Task
/// drives the removal.
pub async fn delete_volume(
    State(context): State<VmContext>,
    Path((vm_id, storage_id, volume_id)): Path<(String, String, String)>,
) -> Result<Response, RedfishError> {
    require_matching_vm(&context, &vm_id)?;
    let volumes = context.volumes.clone();
    let task_id = context
        .state
        .tasks
        .spawn(
            "Delete Volume",
            format!("/redfish/v1/Systems/{vm_id}/Storage/{storage_id}/Volumes/{volume_id}"),
            move || {
                Box::pin(async move {
                    volumes.remove(&storage_id, &volume_id).await;
                    bridge_core::TaskOutcome::Success("Volume deleted".to_string())
                })
            },
        )
        .await;

    Ok(odata::accepted(&format!("/redfish/v1/TaskService/Tasks/{task_id}")))
}
