// SPDX-License-Identifier: Apache-2.0

//! `ManagedVM`: the central entity and its cached, mutable state.

use tokio::sync::RwLock;

use crate::config::{DefaultIso, VmConfig};

/// Cached power state. Unlike [`vsphere::ObservedPowerState`](vsphere::ObservedPowerState),
/// this includes `Unknown` for the period before any vSphere read has ever succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PowerState {
    /// The VM is powered on, per the last successful vSphere read.
    On,
    /// The VM is powered off, per the last successful vSphere read.
    Off,
    /// No vSphere read has ever succeeded for this VM.
    Unknown,
}

/// Boot-source override target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BootTarget {
    /// No override; boot the configured default.
    None,
    /// Network boot (PXE).
    Pxe,
    /// Boot from CD/DVD (virtual media).
    Cd,
    /// Boot from hard disk.
    Hdd,
    /// Boot from USB.
    Usb,
    /// Boot from floppy.
    Floppy,
    /// Enter BIOS/UEFI setup.
    BiosSetup,
    /// Boot into a UEFI shell.
    UefiShell,
    /// UEFI HTTP boot.
    UefiHttp,
    /// A UEFI-specified target device.
    UefiTarget,
    /// Enter diagnostics.
    Diags,
    /// Enter utilities partition.
    Utilities,
}

/// Whether a boot override persists across reboots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BootEnabled {
    /// No override is active.
    Disabled,
    /// Override applies to the next boot only, then resets to `Disabled`.
    Once,
    /// Override applies to every boot until explicitly disabled.
    Continuous,
}

/// The current boot-source override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BootOverride {
    /// The override target device.
    pub target: BootTarget,
    /// Whether it's a one-shot or persistent override.
    pub enabled: BootEnabled,
}

impl Default for BootOverride {
    fn default() -> Self {
        Self {
            target: BootTarget::None,
            enabled: BootEnabled::Disabled,
        }
    }
}

/// Which virtual media slot is being addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum VirtualMediaDevice {
    /// The virtual CD/DVD drive.
    Cd,
    /// The virtual floppy drive.
    Floppy,
}

/// State of a single virtual media slot.
///
/// Invariant: `inserted == true` implies `image_uri.is_some()`; enforced by
/// [`VirtualMediaState::insert`] rather than by construction, since the empty/ejected state is
/// the natural default.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct VirtualMediaState {
    /// The image URI or datastore path currently backing this device, if any.
    pub image_uri: Option<String>,
    /// Whether media is currently inserted.
    pub inserted: bool,
    /// Whether the media is mounted read-only.
    pub write_protected: bool,
}

impl VirtualMediaState {
    /// Inserts `image_uri`, idempotent: inserting the same image twice is a no-op.
    pub fn insert(&mut self, image_uri: String, write_protected: bool) {
        self.image_uri = Some(image_uri);
        self.inserted = true;
        self.write_protected = write_protected;
    }

    /// Ejects whatever is mounted. Idempotent: ejecting twice leaves the same state.
    pub fn eject(&mut self) {
        self.inserted = false;
    }
}

/// Mutable, cached state for one VM — the single source of truth for Redfish/IPMI reads until a
/// vSphere op invalidates it.
#[derive(Debug)]
pub struct VmCachedState {
    /// Last known power state.
    pub power_state: PowerState,
    /// Current boot-source override.
    pub boot_override: BootOverride,
    /// Virtual media state, per device.
    pub cd: VirtualMediaState,
    /// Virtual media state, per device.
    pub floppy: VirtualMediaState,
    /// Free-form BIOS attribute map.
    pub bios_attributes: std::collections::BTreeMap<String, String>,
    /// Whether UEFI secure boot is enabled.
    pub secure_boot_enabled: bool,
}

impl Default for VmCachedState {
    fn default() -> Self {
        let mut bios_attributes = std::collections::BTreeMap::new();
        bios_attributes.insert("BootMode".to_string(), "Uefi".to_string());
        bios_attributes.insert("Hyperthreading".to_string(), "Enabled".to_string());
        Self {
            power_state: PowerState::Unknown,
            boot_override: BootOverride::default(),
            cd: VirtualMediaState::default(),
            floppy: VirtualMediaState::default(),
            bios_attributes,
            secure_boot_enabled: false,
        }
    }
}

impl VmCachedState {
    /// Applies the "Once override is consumed by the next power-on transition" invariant
    ///.
    pub fn consume_boot_once(&mut self) {
        if self.boot_override.enabled == BootEnabled::Once {
            self.boot_override.enabled = BootEnabled::Disabled;
        }
    }

    /// Returns the virtual media slot for `device`.
    pub fn virtual_media(&self, device: VirtualMediaDevice) -> &VirtualMediaState {
        match device {
            VirtualMediaDevice::Cd => &self.cd,
            VirtualMediaDevice::Floppy => &self.floppy,
        }
    }

    /// Returns a mutable reference to the virtual media slot for `device`.
    pub fn virtual_media_mut(&mut self, device: VirtualMediaDevice) -> &mut VirtualMediaState {
        match device {
            VirtualMediaDevice::Cd => &mut self.cd,
            VirtualMediaDevice::Floppy => &mut self.floppy,
        }
    }
}

/// A configured, managed VM: identity, network handles, credentials and cached state
///.
#[derive(Debug)]
pub struct ManagedVm {
    /// vSphere inventory name; also the external id.
    pub name: String,
    /// Unique UDP port for the IPMI BMC.
    pub ipmi_port: u16,
    /// Unique TCP port for the Redfish server.
    pub redfish_port: u16,
    /// RAKP username.
    pub ipmi_user: String,
    /// RAKP password (<=20 bytes, enforced at config load).
    pub ipmi_password: String,
    /// HTTP Basic / session username.
    pub redfish_user: String,
    /// HTTP Basic / session password.
    pub redfish_password: String,
    /// Default ISO to mount on `BootTarget::Cd` override, if configured.
    pub default_iso: Option<DefaultIso>,
    /// Mutable cached state, guarded so reads from one protocol never block on a write from
    /// the other for longer than the update itself takes.
    pub state: RwLock<VmCachedState>,
}

impl ManagedVm {
    /// Builds a `ManagedVm` from its config entry, with state initialized to the defaults from
    /// (`power_state = Unknown`, no boot override, no virtual media).
    pub fn from_config(config: VmConfig) -> Self {
        Self {
            name: config.name,
            ipmi_port: config.ipmi_port,
            redfish_port: config.redfish_port,
            ipmi_user: config.ipmi_user,
            ipmi_password: config.ipmi_password,
            redfish_user: config.redfish_user,
            redfish_password: config.redfish_password,
            default_iso: config.default_iso,
            state: RwLock::new(VmCachedState::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_media_insert_is_idempotent() {
        let mut vm = VirtualMediaState::default();
        vm.insert("http://repo/install.iso".to_string(), false);
        let after_first = vm.clone();
        vm.insert("http://repo/install.iso".to_string(), false);
        assert_eq!(vm, after_first);
    }

    #[test]
    fn virtual_media_eject_is_idempotent() {
        let mut vm = VirtualMediaState::default();
        vm.eject();
        assert!(!vm.inserted);
        vm.eject();
        assert!(!vm.inserted);
    }

    #[test]
    fn once_override_is_consumed_exactly_once() {
        let mut state = VmCachedState::default();
        state.boot_override = BootOverride {
            target: BootTarget::Pxe,
            enabled: BootEnabled::Once,
        };
        state.consume_boot_once();
        assert_eq!(state.boot_override.enabled, BootEnabled::Disabled);
        assert_eq!(state.boot_override.target, BootTarget::Pxe);
        // idempotent: consuming again does not change anything further.
        state.consume_boot_once();
        assert_eq!(state.boot_override.enabled, BootEnabled::Disabled);
    }

    #[test]
    fn continuous_override_survives_consumption() {
        let mut state = VmCachedState::default();
        state.boot_override = BootOverride {
            target: BootTarget::Pxe,
            enabled: BootEnabled::Continuous,
        };
        state.consume_boot_once();
        assert_eq!(state.boot_override.enabled, BootEnabled::Continuous);
    }
}
