// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/Managers/{vm}-BMC/LogServices/SEL` and its `Entries` collection (§4.5) —
//! the HTTP view over [`bridge_core::EventStore`], shared with the IPMI SEL commands. The
//! service id is `SEL`; `EventLog` is accepted as an alias since spec.md names the service
//! `{EventLog|SEL}`.

use axum::extract::{Path, State};
use axum::response::Response;
use bridge_core::EventSeverity;
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

fn severity_name(severity: EventSeverity) -> &'static str {
    match severity {
        EventSeverity::Ok => "OK",
        EventSeverity::Warning => "Warning",
        EventSeverity::Critical => "Critical",
    }
}

fn base(vm_name: &str) -> String {
    format!("/redfish/v1/Managers/{vm_name}-BMC/LogServices")
}

/// `GET /redfish/v1/Managers/{vm}-BMC/LogServices`.
pub async fn get_collection(State(context): State<VmContext>) -> Response {
    let root = base(&context.vm_name);
    odata::ok_json(odata::collection(
        &root,
        "#LogServiceCollection.LogServiceCollection",
        "Log Service Collection",
        &[format!("{root}/SEL")],
    ))
}

fn check_path(context: &VmContext, manager_id: &str, service_id: &str) -> Result<(), RedfishError> {
    if manager_id != format!("{}-BMC", context.vm_name) || !matches!(service_id, "SEL" | "EventLog") {
        return Err(RedfishError::NotFound);
    }
    Ok(())
}

/// `GET /redfish/v1/Managers/{vm}-BMC/LogServices/SEL`.
pub async fn get_log_service(
    State(context): State<VmContext>,
    Path((manager_id, service_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    check_path(&context, &manager_id, &service_id)?;
    let root = base(&context.vm_name);
    Ok(odata::ok_json(json!({
        "@odata.id": format!("{root}/SEL"),
        "@odata.type": "#LogService.v1_6_0.LogService",
        "Id": "SEL",
        "Name": "System Event Log",
        "LogEntryType": "SEL",
        "OverWritePolicy": "WrapsWhenFull",
        "Entries": odata::link(format!("{root}/SEL/Entries")),
        "Actions": {
            "#LogService.ClearLog": { "target": format!("{root}/SEL/Actions/LogService.ClearLog") },
        },
    })))
}

/// `GET /redfish/v1/Managers/{vm}-BMC/LogServices/SEL/Entries`.
pub async fn get_entries(
    State(context): State<VmContext>,
    Path((manager_id, service_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    check_path(&context, &manager_id, &service_id)?;
    let root = base(&context.vm_name);
    let Some(store) = context.state.events.get(context.vm_name.as_ref()) else {
        return Err(RedfishError::NotFound);
    };
    let store = store.lock().await;
    let members: Vec<_> = store
        .entries()
        .map(|entry| {
            json!({
                "@odata.id": format!("{root}/SEL/Entries/{}", entry.id),
                "@odata.type": "#LogEntry.v1_15_0.LogEntry",
                "Id": entry.id.to_string(),
                "Name": "SEL Entry",
                "EntryType": "SEL",
                "Severity": severity_name(entry.severity),
                "Message": entry.message,
            })
        })
        .collect();
    Ok(odata::ok_json(json!({
        "@odata.id": format!("{root}/SEL/Entries"),
        "@odata.type": "#LogEntryCollection.LogEntryCollection",
        "Name": "Log Entry Collection",
        "Members@odata.count": members.len(),
        "Members": members,
    })))
}

/// `POST /redfish/v1/Managers/{vm}-BMC/LogServices/SEL/Actions/LogService.ClearLog`.
pub async fn clear_log(
    State(context): State<VmContext>,
    Path((manager_id, service_id)): Path<(String, String)>,
) -> Result<Response, RedfishError> {
    check_path(&context, &manager_id, &service_id)?;
    let Some(store) = context.state.events.get(context.vm_name.as_ref()) else {
        return Err(RedfishError::NotFound);
    };
    store.lock().await.clear();
    Ok(odata::no_content())
}
