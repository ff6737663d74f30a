// SPDX-License-Identifier: Apache-2.0

//! The bridge's global, shared state: one [`GlobalState`] is built at startup and handed to
//! every IPMI and Redfish listener task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use vsphere::VsphereAdapter;

use crate::config::Config;
use crate::error::BridgeError;
use crate::event::EventStore;
use crate::task::TaskRegistry;
use crate::vm::ManagedVm;

/// Shared, read-mostly state for the whole bridge process.
///
/// Deliberately does *not* hold IPMI session state (RAKP/sequence-number tables) or Redfish HTTP
/// session/token state: those are protocol-specific, live only as long as a single connection or
/// login, and are owned by the `ipmi` and `redfish` crates respectively so that neither protocol
/// crate needs to depend on the other's session model.
pub struct GlobalState {
    /// The single vSphere adapter instance, shared across every VM.
    pub vsphere: Arc<dyn VsphereAdapter>,
    /// Managed VMs, keyed by name.
    pub managed_vms: HashMap<String, Arc<ManagedVm>>,
    /// The task engine backing Redfish's `TaskService`.
    pub tasks: TaskRegistry,
    /// Per-VM event logs, keyed by VM name.
    pub events: HashMap<String, Mutex<EventStore>>,
}

impl GlobalState {
    /// Builds a `GlobalState` from a loaded [`Config`] and a constructed vSphere adapter.
    pub fn new(config: Config, vsphere: Arc<dyn VsphereAdapter>) -> Self {
        let mut managed_vms = HashMap::with_capacity(config.vms.len());
        let mut events = HashMap::with_capacity(config.vms.len());
        for vm_config in config.vms {
            let name = vm_config.name.clone();
            managed_vms.insert(name.clone(), Arc::new(ManagedVm::from_config(vm_config)));
            events.insert(name, Mutex::new(EventStore::new()));
        }
        Self {
            vsphere,
            managed_vms,
            tasks: TaskRegistry::new(),
            events,
        }
    }

    /// Looks up a managed VM by name.
    pub fn vm(&self, name: &str) -> Result<Arc<ManagedVm>, BridgeError> {
        self.managed_vms
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownVm(name.to_string()))
    }

    /// Returns every managed VM name, for collection-listing endpoints.
    pub fn vm_names(&self) -> Vec<&str> {
        self.managed_vms.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use vsphere::MockVsphereAdapter;

    use super::*;
    use crate::config::{SslConfig, VmwareConfig};

    fn config_with_one_vm() -> Config {
        Config {
            vmware: VmwareConfig {
                host: "vcenter.example.com".to_string(),
                user: "svc".to_string(),
                password: "svc-pass".to_string(),
                port: 443,
                disable_ssl: true,
            },
            ssl: SslConfig::default(),
            vms: vec![crate::config::VmConfig {
                name: "worker-1".to_string(),
                ipmi_port: 6230,
                redfish_port: 8443,
                ipmi_user: "admin".to_string(),
                ipmi_password: "password".to_string(),
                redfish_user: "admin".to_string(),
                redfish_password: "password".to_string(),
                disable_ssl: None,
                default_iso: None,
            }],
        }
    }

    #[test]
    fn vm_lookup_succeeds_for_configured_name() {
        let state = GlobalState::new(config_with_one_vm(), Arc::new(MockVsphereAdapter::new()));
        assert!(state.vm("worker-1").is_ok());
    }

    #[test]
    fn vm_lookup_fails_for_unknown_name() {
        let state = GlobalState::new(config_with_one_vm(), Arc::new(MockVsphereAdapter::new()));
        assert!(matches!(
            state.vm("does-not-exist"),
            Err(BridgeError::UnknownVm(_))
        ));
    }

    #[test]
    fn events_store_is_seeded_per_vm() {
        let state = GlobalState::new(config_with_one_vm(), Arc::new(MockVsphereAdapter::new()));
        assert!(state.events.contains_key("worker-1"));
    }
}
