// SPDX-License-Identifier: Apache-2.0

//! The narrow, async interface IPMI and Redfish handlers use against vCenter.
//!
//! Every method is idempotent with respect to observable state: powering on an already-on VM
//! returns success, unmounting nothing-mounted returns success. Implementations are responsible
//! for per-VM mutation serialization and retry/backoff; callers never see a transient failure —
//! only the final `UpstreamUnavailable` once the retry budget is exhausted.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::types::{BootDevice, Inventory, ObservedPowerState};

/// Narrow vSphere operation surface. See module docs.
#[cfg_attr(feature = "test-util", mockall::automock)]
#[async_trait]
pub trait VsphereAdapter: Send + Sync {
    /// Powers the named VM on. No-op (success) if already on.
    async fn power_on(&self, name: &str) -> Result<(), AdapterError>;

    /// Powers the named VM off. `force` selects a hard power-off over a graceful one.
    async fn power_off(&self, name: &str, force: bool) -> Result<(), AdapterError>;

    /// Hard-resets the named VM (power cycle at the hypervisor level).
    async fn reset(&self, name: &str) -> Result<(), AdapterError>;

    /// Requests a graceful guest OS shutdown (requires guest tools).
    async fn shutdown_guest(&self, name: &str) -> Result<(), AdapterError>;

    /// Requests a graceful guest OS reboot (requires guest tools).
    async fn reboot_guest(&self, name: &str) -> Result<(), AdapterError>;

    /// Returns the VM's current power state as vCenter reports it.
    async fn get_power_state(&self, name: &str) -> Result<ObservedPowerState, AdapterError>;

    /// Replaces the VM's boot device order.
    async fn set_boot_order(&self, name: &str, devices: &[BootDevice]) -> Result<(), AdapterError>;

    /// Locates or creates an IDE CD-ROM device and attaches `iso_path` from `datastore`.
    async fn mount_iso(
        &self,
        name: &str,
        datastore: &str,
        iso_path: &str,
    ) -> Result<(), AdapterError>;

    /// Detaches whatever ISO is currently mounted. Success if nothing was mounted.
    async fn unmount_iso(&self, name: &str) -> Result<(), AdapterError>;

    /// Returns a read-only inventory snapshot (CPU, memory, NICs, disks, guest OS).
    async fn get_inventory(&self, name: &str) -> Result<Inventory, AdapterError>;
}
