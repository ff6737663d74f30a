// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/TaskService` and its `Tasks` collection (§4.6) — the HTTP surface over
//! [`bridge_core::TaskRegistry`].

use axum::extract::{Path, State};
use axum::response::Response;
use bridge_core::{Task, TaskState, TaskStatus};
use serde_json::json;

use crate::context::VmContext;
use crate::error::RedfishError;
use crate::odata;

/// `GET /redfish/v1/TaskService`.
pub async fn get_task_service() -> Response {
    odata::ok_json(json!({
        "@odata.id": "/redfish/v1/TaskService",
        "@odata.type": "#TaskService.v1_2_0.TaskService",
        "Id": "TaskService",
        "Name": "Task Service",
        "ServiceEnabled": true,
        "Status": { "Health": "OK", "State": "Enabled" },
        "CompletedTaskOverWritePolicy": "Oldest",
        "LifeCycleEventOnTaskStateChange": true,
        "Tasks": odata::link("/redfish/v1/TaskService/Tasks"),
    }))
}

/// `GET /redfish/v1/TaskService/Tasks`.
pub async fn get_collection(State(context): State<VmContext>) -> Response {
    let tasks = context.state.tasks.list().await;
    let members: Vec<String> = tasks
        .iter()
        .map(|task| format!("/redfish/v1/TaskService/Tasks/{}", task.id))
        .collect();
    odata::ok_json(odata::collection(
        "/redfish/v1/TaskService/Tasks",
        "#TaskCollection.TaskCollection",
        "Tasks Collection",
        &members,
    ))
}

fn task_state_name(state: TaskState) -> &'static str {
    match state {
        TaskState::New => "New",
        TaskState::Starting => "Starting",
        TaskState::Running => "Running",
        TaskState::Completed => "Completed",
        TaskState::Exception => "Exception",
        TaskState::Cancelled => "Cancelled",
    }
}

fn task_status_name(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Ok => "OK",
        TaskStatus::Warning => "Warning",
        TaskStatus::Critical => "Critical",
    }
}

fn task_to_json(task: &Task) -> serde_json::Value {
    let messages: Vec<_> = task
        .messages
        .iter()
        .map(|message| {
            json!({
                "MessageId": message.message_id,
                "Message": message.message,
            })
        })
        .collect();
    json!({
        "@odata.id": format!("/redfish/v1/TaskService/Tasks/{}", task.id),
        "@odata.type": "#Task.v1_7_1.Task",
        "Id": task.id.to_string(),
        "Name": task.name,
        "TaskState": task_state_name(task.state),
        "TaskStatus": task_status_name(task.status),
        "PercentComplete": task.percent_complete,
        "StartTime": task.start_time.to_rfc3339(),
        "EndTime": task.end_time.map(|t| t.to_rfc3339()),
        "Messages": messages,
        "Payload": {
            "TargetUri": task.target_uri,
        },
    })
}

/// `GET /redfish/v1/TaskService/Tasks/{id}`.
pub async fn get_task(
    State(context): State<VmContext>,
    Path(id): Path<String>,
) -> Result<Response, RedfishError> {
    let task = context
        .state
        .tasks
        .list()
        .await
        .into_iter()
        .find(|task| task.id.to_string() == id)
        .ok_or(RedfishError::NotFound)?;
    Ok(odata::ok_json(task_to_json(&task)))
}
