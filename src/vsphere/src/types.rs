// SPDX-License-Identifier: Apache-2.0

//! Plain data types returned by [`crate::adapter::VsphereAdapter`] operations.

/// Power state as vSphere itself reports it — unlike the bridge's cached `PowerState`, vCenter
/// never reports "Unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedPowerState {
    /// The VM is powered on.
    On,
    /// The VM is powered off.
    Off,
}

/// A boot device as accepted by `set_boot_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    /// Boot from the first hard disk.
    Disk,
    /// Boot from the mounted CD-ROM/ISO.
    Cd,
    /// Boot from the network (PXE).
    Network,
}

/// A network interface as reported by `get_inventory`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NicInfo {
    /// Device label, e.g. "Network adapter 1".
    pub name: String,
    /// MAC address, colon-separated.
    pub mac: String,
    /// Whether the virtual NIC is connected.
    pub connected: bool,
}

/// A disk as reported by `get_inventory`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DiskInfo {
    /// Device label, e.g. "Hard disk 1".
    pub label: String,
    /// Capacity in MB.
    pub capacity_mb: u64,
}

/// A read-only inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Inventory {
    /// Number of virtual CPUs.
    pub cpu_count: u32,
    /// Memory size in MB.
    pub memory_mb: u64,
    /// Network interfaces.
    pub nics: Vec<NicInfo>,
    /// Disks.
    pub disks: Vec<DiskInfo>,
    /// Guest OS identifier string, e.g. "otherGuest64".
    pub guest_os: String,
}

impl Inventory {
    /// A minimal, schema-valid inventory used when vCenter is unreachable and no cached
    /// inventory exists yet.
    pub fn minimal_valid() -> Self {
        Self {
            cpu_count: 1,
            memory_mb: 1024,
            nics: Vec::new(),
            disks: Vec::new(),
            guest_os: "otherGuest64".to_string(),
        }
    }
}
