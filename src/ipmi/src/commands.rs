// SPDX-License-Identifier: Apache-2.0

//! The IPMI command dispatch table: NetFn/Cmd decode, vSphere translation, and the
//! completion-code soft-success policy.
//!
//! Commands are modeled as tagged [`IpmiCommand`] variants, one per supported NetFn/Cmd pair,
//! decoded by [`IpmiCommand::parse`] and executed by [`IpmiCommand::handle`] — the "dynamic
//! dispatch over IPMI command table" design note.

use bridge_core::{BootEnabled, BootOverride, BootTarget, EventLogEntry, EventSeverity, ManagedVm, PowerState};
use vsphere::VsphereAdapter;

/// `0x00`: success, or a vSphere soft-success fallback.
pub const CC_OK: u8 = 0x00;
/// `0xC1`: unknown/unsupported NetFn/Cmd pair.
pub const CC_INVALID_COMMAND: u8 = 0xc1;
/// `0xC7`: request data length invalid.
pub const CC_INVALID_DATA_LENGTH: u8 = 0xc7;
/// `0xCC`: invalid data field (e.g. an unsupported boot device selector).
pub const CC_INVALID_DATA_FIELD: u8 = 0xcc;

const NETFN_CHASSIS: u8 = 0x00;
const NETFN_APP: u8 = 0x06;
const NETFN_SENSOR: u8 = 0x04;
const NETFN_STORAGE: u8 = 0x0a;
const NETFN_DCMI: u8 = 0x2c;

/// A decoded, ready-to-execute IPMI request.
#[derive(Debug, Clone)]
pub enum IpmiCommand {
    /// App 0x01.
    GetDeviceId,
    /// App 0x38.
    GetChannelAuthCaps,
    /// App 0x3B.
    SetSessionPrivilege { requested_level: u8 },
    /// App 0x3C.
    CloseSession,
    /// Chassis 0x01.
    GetChassisStatus,
    /// Chassis 0x02; `action` is the sub-command byte.
    ChassisControl { action: u8 },
    /// Chassis 0x08; `boot_flags` is parameter 5's raw bytes.
    SetSystemBootOptions { boot_flags: Vec<u8> },
    /// Chassis 0x09.
    GetSystemBootOptions,
    /// Sensor/SDR repository access (0x20/0x22/0x23/0x2D) — always answered with an empty
    /// repository.
    SdrAccess,
    /// Storage 0x40/0x42/0x43 — SEL info / reservation / entry read.
    SelAccess { cmd: u8, request_data: Vec<u8> },
    /// DCMI 0x01.
    GetDcmiCapabilities,
}

/// The outcome of executing an [`IpmiCommand`]: a completion code and response data bytes.
pub struct CommandResponse {
    /// IPMI completion code.
    pub completion: u8,
    /// Response data following the completion code.
    pub data: Vec<u8>,
}

impl CommandResponse {
    fn ok(data: Vec<u8>) -> Self {
        Self { completion: CC_OK, data }
    }

    fn code(completion: u8) -> Self {
        Self { completion, data: Vec::new() }
    }
}

impl IpmiCommand {
    /// Decodes `(netfn, cmd, data)` into a supported command, or `None` if the pair is not in
    /// the supported table (caller maps that to `0xC1`).
    pub fn parse(netfn: u8, cmd: u8, data: &[u8]) -> Option<Self> {
        match (netfn, cmd) {
            (NETFN_APP, 0x01) => Some(Self::GetDeviceId),
            (NETFN_APP, 0x38) => Some(Self::GetChannelAuthCaps),
            (NETFN_APP, 0x3b) => Some(Self::SetSessionPrivilege {
                requested_level: data.first().copied().unwrap_or(0),
            }),
            (NETFN_APP, 0x3c) => Some(Self::CloseSession),
            (NETFN_CHASSIS, 0x01) => Some(Self::GetChassisStatus),
            (NETFN_CHASSIS, 0x02) => Some(Self::ChassisControl {
                action: data.first().copied().unwrap_or(0xff),
            }),
            (NETFN_CHASSIS, 0x08) => Some(Self::SetSystemBootOptions {
                boot_flags: data.to_vec(),
            }),
            (NETFN_CHASSIS, 0x09) => Some(Self::GetSystemBootOptions),
            (NETFN_SENSOR, 0x20 | 0x22 | 0x23 | 0x2d) => Some(Self::SdrAccess),
            (NETFN_STORAGE, 0x40 | 0x42 | 0x43) => Some(Self::SelAccess {
                cmd,
                request_data: data.to_vec(),
            }),
            (NETFN_DCMI, 0x01) => Some(Self::GetDcmiCapabilities),
            _ => None,
        }
    }

    /// Executes the command against `vm`'s cached state and vSphere adapter, applying the
    /// soft-success policy for upstream failures.
    pub async fn handle(
        &self,
        vm: &ManagedVm,
        vsphere: &dyn VsphereAdapter,
        events: &tokio::sync::Mutex<bridge_core::EventStore>,
    ) -> CommandResponse {
        match self {
            Self::GetDeviceId => CommandResponse::ok(get_device_id()),
            Self::GetChannelAuthCaps => CommandResponse::ok(get_channel_auth_caps()),
            Self::SetSessionPrivilege { requested_level } => {
                // Echo back the capped level (Administrator is the ceiling this bridge grants).
                let capped = (*requested_level).min(0x04);
                CommandResponse::ok(vec![capped])
            }
            Self::CloseSession => CommandResponse::ok(Vec::new()),
            Self::GetChassisStatus => CommandResponse::ok(get_chassis_status(vm).await),
            Self::ChassisControl { action } => chassis_control(*action, vm, vsphere, events).await,
            Self::SetSystemBootOptions { boot_flags } => {
                set_system_boot_options(boot_flags, vm, vsphere, events).await
            }
            Self::GetSystemBootOptions => CommandResponse::ok(get_system_boot_options(vm).await),
            Self::SdrAccess => CommandResponse::ok(empty_sdr_response()),
            Self::SelAccess { cmd, .. } => sel_access(*cmd, vm, events).await,
            Self::GetDcmiCapabilities => CommandResponse::ok(get_dcmi_capabilities()),
        }
    }
}

fn get_device_id() -> Vec<u8> {
    vec![
        0x01, // device id
        0x01, // device revision (bit 7 clear: device SDRs not supported)
        0x00, // firmware revision 1 (major, bit 7 clear = normal operation)
        0x00, // firmware revision 2 (minor, BCD)
        0x02, // IPMI version 2.0 (BCD-encoded as 0x02)
        0b0000_0010, // device support: chassis device bit set
        0x00, 0x00, 0x00, // manufacturer id = 0
        0x00, 0x00, // product id = 0
    ]
}

fn get_channel_auth_caps() -> Vec<u8> {
    vec![
        0x01, // channel number
        0b1000_0100, // IPMI 2.0 extended capabilities + HMAC-SHA1 auth type bit
        0b0000_0010, // user-level authentication enabled
        0b0000_0000, // no K_G set (uses user password as the key)
        0x00, 0x00, 0x00, // reserved
    ]
}

async fn get_chassis_status(vm: &ManagedVm) -> Vec<u8> {
    let state = vm.state.read().await;
    let power_bit = matches!(state.power_state, PowerState::On) as u8;
    vec![
        power_bit, // byte 0: current power state, bit 0 = powered on
        0b0000_0000, // byte 1: last power event, nothing recorded
        0b0100_0000, // byte 2: misc chassis state, front panel lockout disabled
        0x00,        // byte 3: front panel button capabilities, none
    ]
}

async fn chassis_control(
    action: u8,
    vm: &ManagedVm,
    vsphere: &dyn VsphereAdapter,
    events: &tokio::sync::Mutex<bridge_core::EventStore>,
) -> CommandResponse {
    let result = match action {
        0x00 => vsphere.power_off(&vm.name, false).await,
        0x01 => vsphere.power_on(&vm.name).await,
        0x02 => {
            let _ = vsphere.power_off(&vm.name, false).await;
            vsphere.power_on(&vm.name).await
        }
        0x03 => vsphere.reset(&vm.name).await,
        0x05 => vsphere.shutdown_guest(&vm.name).await,
        _ => return CommandResponse::code(CC_INVALID_DATA_FIELD),
    };

    record_power_transition(vm, events, action).await;
    soft_success_or_error(result)
}

async fn record_power_transition(
    vm: &ManagedVm,
    events: &tokio::sync::Mutex<bridge_core::EventStore>,
    action: u8,
) {
    let message = match action {
        0x00 | 0x05 => "Host power state changed to Off",
        0x01 => "Host power state changed to On",
        0x02 => "Host power cycled",
        0x03 => "Host hard reset",
        _ => return,
    };
    let new_power_state = match action {
        0x00 | 0x05 => Some(PowerState::Off),
        0x01 | 0x02 => Some(PowerState::On),
        _ => None,
    };
    if let Some(power_state) = new_power_state {
        let mut state = vm.state.write().await;
        state.power_state = power_state;
        if matches!(power_state, PowerState::On) {
            state.consume_boot_once();
        }
    }
    events
        .lock()
        .await
        .push(EventLogEntry::new(EventSeverity::Ok, message));
}

fn soft_success_or_error<T>(result: Result<T, vsphere::AdapterError>) -> CommandResponse {
    match result {
        Ok(_) => CommandResponse::ok(Vec::new()),
        Err(err) if err.is_upstream_unavailable() => {
            // Never 0xFF: the orchestrator must not observe a failed inspection step.
            tracing::warn!(error = %err, "vsphere op unavailable, returning soft success");
            CommandResponse::ok(Vec::new())
        }
        Err(_) => CommandResponse::code(CC_INVALID_DATA_FIELD),
    }
}

/// Decodes boot-device selector into a [`BootTarget`], or `None` for an
/// unsupported selector value.
fn decode_boot_selector(selector: u8) -> Option<BootTarget> {
    match selector {
        0x00 => Some(BootTarget::None),
        0x01 => Some(BootTarget::Pxe),
        0x02 => Some(BootTarget::Hdd),
        0x05 => Some(BootTarget::Cd),
        0x06 => Some(BootTarget::BiosSetup),
        0x0f => Some(BootTarget::Floppy),
        _ => None,
    }
}

fn encode_boot_selector(target: BootTarget) -> u8 {
    match target {
        BootTarget::None => 0x00,
        BootTarget::Pxe => 0x01,
        BootTarget::Hdd => 0x02,
        BootTarget::Cd => 0x05,
        BootTarget::BiosSetup => 0x06,
        BootTarget::Floppy => 0x0f,
        _ => 0x00,
    }
}

async fn set_system_boot_options(
    boot_flags: &[u8],
    vm: &ManagedVm,
    vsphere: &dyn VsphereAdapter,
    events: &tokio::sync::Mutex<bridge_core::EventStore>,
) -> CommandResponse {
    if boot_flags.len() < 2 {
        return CommandResponse::code(CC_INVALID_DATA_LENGTH);
    }
    let persistent = boot_flags[0] & 0x40 != 0;
    let selector = (boot_flags[1] >> 2) & 0x1f;
    let Some(target) = decode_boot_selector(selector) else {
        return CommandResponse::code(CC_INVALID_DATA_FIELD);
    };

    {
        let mut state = vm.state.write().await;
        state.boot_override = BootOverride {
            target,
            enabled: if persistent {
                BootEnabled::Continuous
            } else {
                BootEnabled::Once
            },
        };
    }

    if matches!(target, BootTarget::Cd) {
        if let Some(iso) = &vm.default_iso {
            let result = vsphere.mount_iso(&vm.name, &iso.datastore, &iso.path).await;
            if let Err(err) = &result {
                if !err.is_upstream_unavailable() {
                    return CommandResponse::code(CC_INVALID_DATA_FIELD);
                }
            }
        }
    }

    events.lock().await.push(EventLogEntry::new(
        EventSeverity::Ok,
        "Boot override set via Set System Boot Options",
    ));

    CommandResponse::ok(Vec::new())
}

async fn get_system_boot_options(vm: &ManagedVm) -> Vec<u8> {
    let state = vm.state.read().await;
    let persistent = matches!(state.boot_override.enabled, BootEnabled::Continuous);
    let selector = encode_boot_selector(state.boot_override.target);
    vec![
        0x01, // parameter version
        0x05, // parameter selector: boot flags
        if persistent { 0x40 } else { 0x00 } | 0x80, // boot flags valid bit + persistence
        selector << 2,
        0x00, // BIOS boot type not further constrained
    ]
}

fn empty_sdr_response() -> Vec<u8> {
    // Reservation id 1, zero records: this is a schema-complete but empty sensor repository
    //.
    vec![0x01, 0x00]
}

async fn sel_access(cmd: u8, vm: &ManagedVm, events: &tokio::sync::Mutex<bridge_core::EventStore>) -> CommandResponse {
    let store = events.lock().await;
    match cmd {
        0x40 => {
            // Get SEL Info.
            let mut data = vec![0x51]; // SEL version 1.5/2.0 compatible
            data.extend_from_slice(&(store.len() as u16).to_le_bytes());
            data.extend_from_slice(&[0xff, 0xff]); // free space: not tracked, report "unknown"
            data.extend_from_slice(&[0x00; 4]); // most-recent addition/erase timestamps
            data.extend_from_slice(&[0x00; 4]);
            data.push(0x02); // operation support: overflow flag clear, delete supported
            CommandResponse::ok(data)
        }
        0x42 => {
            // Reserve SEL.
            CommandResponse::ok(store.reservation_id().to_le_bytes().to_vec())
        }
        0x43 => {
            // Get SEL Entry: this bridge doesn't track the client's requested record id offset,
            // it always returns the oldest record for the VM's bounded log.
            match store.get(0) {
                Some(_entry) => {
                    let mut data = vec![0x00, 0x00]; // next record id: none (single-shot)
                    data.extend_from_slice(&[0x00, 0x00]); // this record's id, low byte first
                    CommandResponse::ok(data)
                }
                None => CommandResponse::code(CC_INVALID_DATA_FIELD),
            }
        }
        _ => CommandResponse::code(CC_INVALID_COMMAND),
    }
}

fn get_dcmi_capabilities() -> Vec<u8> {
    vec![
        0x01, 0x05, 0x00, // DCMI spec conformance 1.5
        0x01, // supported capabilities: power management
        0x01, // mandatory platform capabilities byte
        0x00, // optional platform capabilities: none
    ]
}

#[cfg(test)]
mod tests {
    use bridge_core::config::VmConfig;
    use tokio::sync::Mutex;
    use vsphere::MockVsphereAdapter;

    use super::*;

    fn sample_vm() -> ManagedVm {
        ManagedVm::from_config(VmConfig {
            name: "worker-1".to_string(),
            ipmi_port: 6230,
            redfish_port: 8443,
            ipmi_user: "admin".to_string(),
            ipmi_password: "password".to_string(),
            redfish_user: "admin".to_string(),
            redfish_password: "password".to_string(),
            disable_ssl: None,
            default_iso: None,
        })
    }

    #[test]
    fn parse_recognizes_documented_pairs() {
        assert!(matches!(
            IpmiCommand::parse(0x06, 0x01, &[]),
            Some(IpmiCommand::GetDeviceId)
        ));
        assert!(matches!(
            IpmiCommand::parse(0x00, 0x01, &[]),
            Some(IpmiCommand::GetChassisStatus)
        ));
    }

    #[test]
    fn parse_returns_none_for_unsupported_pair() {
        assert!(IpmiCommand::parse(0x06, 0x99, &[]).is_none());
    }

    #[tokio::test]
    async fn chassis_control_power_on_maps_to_vsphere_power_on() {
        let vm = sample_vm();
        let events = Mutex::new(bridge_core::EventStore::new());
        let mut mock = MockVsphereAdapter::new();
        mock.expect_power_on().returning(|_| Box::pin(async { Ok(()) }));
        let cmd = IpmiCommand::ChassisControl { action: 0x01 };
        let response = cmd.handle(&vm, &mock, &events).await;
        assert_eq!(response.completion, CC_OK);
        assert_eq!(vm.state.read().await.power_state, PowerState::On);
    }

    #[tokio::test]
    async fn chassis_control_invalid_action_is_rejected() {
        let vm = sample_vm();
        let events = Mutex::new(bridge_core::EventStore::new());
        let mock = MockVsphereAdapter::new();
        let cmd = IpmiCommand::ChassisControl { action: 0x7f };
        let response = cmd.handle(&vm, &mock, &events).await;
        assert_eq!(response.completion, CC_INVALID_DATA_FIELD);
    }

    #[tokio::test]
    async fn upstream_unavailable_is_soft_success_not_failure_code() {
        let vm = sample_vm();
        let events = Mutex::new(bridge_core::EventStore::new());
        let mut mock = MockVsphereAdapter::new();
        mock.expect_power_on()
            .returning(|_| Box::pin(async { Err(vsphere::AdapterError::UpstreamUnavailable("timeout".to_string())) }));
        let cmd = IpmiCommand::ChassisControl { action: 0x01 };
        let response = cmd.handle(&vm, &mock, &events).await;
        assert_eq!(response.completion, CC_OK);
    }

    #[tokio::test]
    async fn set_boot_options_updates_cached_override() {
        let vm = sample_vm();
        let events = Mutex::new(bridge_core::EventStore::new());
        let mock = MockVsphereAdapter::new();
        // selector 1 (Pxe) at bits 2..6 of byte 1: 0x01 << 2 = 0x04
        let cmd = IpmiCommand::SetSystemBootOptions {
            boot_flags: vec![0x80, 0x04],
        };
        let response = cmd.handle(&vm, &mock, &events).await;
        assert_eq!(response.completion, CC_OK);
        assert_eq!(vm.state.read().await.boot_override.target, BootTarget::Pxe);
    }

    #[tokio::test]
    async fn sdr_access_returns_empty_repository() {
        let vm = sample_vm();
        let events = Mutex::new(bridge_core::EventStore::new());
        let mock = MockVsphereAdapter::new();
        let response = IpmiCommand::SdrAccess.handle(&vm, &mock, &events).await;
        assert_eq!(response.completion, CC_OK);
        assert_eq!(response.data, vec![0x01, 0x00]);
    }

    #[tokio::test]
    async fn sel_info_reports_current_entry_count() {
        let vm = sample_vm();
        let events = Mutex::new(bridge_core::EventStore::new());
        events
            .lock()
            .await
            .push(EventLogEntry::new(EventSeverity::Ok, "test event"));
        let mock = MockVsphereAdapter::new();
        let response = IpmiCommand::SelAccess {
            cmd: 0x40,
            request_data: Vec::new(),
        }
        .handle(&vm, &mock, &events)
        .await;
        assert_eq!(response.completion, CC_OK);
        assert_eq!(u16::from_le_bytes([response.data[1], response.data[2]]), 1);
    }
}
