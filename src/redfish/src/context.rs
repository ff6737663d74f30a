// SPDX-License-Identifier: Apache-2.0

//! The axum `State` shared by every handler on one VM's Redfish router.

use std::sync::Arc;

use bridge_core::{GlobalState, ManagedVm};

use crate::event_service::SubscriptionStore;
use crate::session::SessionTable;
use crate::storage::VolumeStore;

/// Per-VM Redfish server state: a handle into the shared [`GlobalState`], the name of the VM
/// this listener serves, and this listener's own HTTP session-token table.
///
/// One `VmContext` is built per configured VM and cloned into every accepted connection; clones
/// share the same `Arc`s, so handlers across connections observe a consistent view.
#[derive(Clone)]
pub struct VmContext {
    /// The whole bridge's shared state (vSphere adapter, managed VMs, task registry, events).
    pub state: Arc<GlobalState>,
    /// The name of the VM this Redfish server instance serves.
    pub vm_name: Arc<str>,
    /// HTTP session tokens issued by this VM's `SessionService`.
    pub sessions: Arc<SessionTable>,
    /// Simulated RAID volumes exposed under `Storage/{sid}/Volumes`.
    pub volumes: Arc<VolumeStore>,
    /// Registered `EventService` subscriptions.
    pub subscriptions: Arc<SubscriptionStore>,
}

impl VmContext {
    /// Builds a new per-VM context.
    pub fn new(state: Arc<GlobalState>, vm_name: impl Into<Arc<str>>) -> Self {
        Self {
            state,
            vm_name: vm_name.into(),
            sessions: Arc::new(SessionTable::new()),
            volumes: Arc::new(VolumeStore::new()),
            subscriptions: Arc::new(SubscriptionStore::new()),
        }
    }

    /// Looks up this context's `ManagedVm`. Panics only if the router was built for a VM name
    /// absent from `GlobalState`, which would be a wiring bug at startup, not a request-time
    /// condition.
    pub fn vm(&self) -> Arc<ManagedVm> {
        self.state
            .vm(&self.vm_name)
            .expect("VmContext constructed with a name absent from GlobalState")
    }
}
