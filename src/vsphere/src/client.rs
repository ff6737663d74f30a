// SPDX-License-Identifier: Apache-2.0

//! [`VimClient`]: the production [`VsphereAdapter`] backed by vCenter's REST API.
//!
//! Connection lifecycle: a single session token is negotiated lazily and shared across every VM.
//! Any call that observes an expired/absent session
//! re-authenticates before retrying. Per-VM mutations (power, boot order, virtual media) are
//! serialized through a lock table keyed on VM name so two concurrent requests against the same
//! VM never race, while reads and requests against different VMs proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use utils::backoff::Backoff;

use crate::adapter::VsphereAdapter;
use crate::error::AdapterError;
use crate::types::{BootDevice, DiskInfo, Inventory, NicInfo, ObservedPowerState};

/// Connection parameters for a single vCenter endpoint.
#[derive(Debug, Clone)]
pub struct VsphereConfig {
    /// vCenter hostname or IP.
    pub host: String,
    /// vCenter HTTPS port, default 443.
    pub port: u16,
    /// Service account username.
    pub user: String,
    /// Service account password.
    pub password: String,
    /// Skip TLS certificate validation against vCenter (lab/self-signed deployments).
    pub disable_ssl: bool,
}

/// A `VsphereAdapter` backed by a real vCenter over its REST API.
#[derive(Debug)]
pub struct VimClient {
    config: VsphereConfig,
    http: reqwest::Client,
    session: Mutex<Option<String>>,
    vm_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    backoff: Backoff,
}

impl VimClient {
    /// Builds a new client. Does not connect; the session is established lazily on first use.
    pub fn new(config: VsphereConfig) -> Self {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.disable_ssl)
            .build()
            .expect("reqwest client builder never fails with these options");
        Self {
            config,
            http,
            session: Mutex::new(None),
            vm_locks: Mutex::new(HashMap::new()),
            backoff: Backoff::default_adapter_policy(),
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}:{}/rest", self.config.host, self.config.port)
    }

    #[instrument(level = "debug", skip(self))]
    async fn ensure_session(&self) -> Result<String, AdapterError> {
        {
            let guard = self.session.lock().await;
            if let Some(token) = guard.as_ref() {
                return Ok(token.clone());
            }
        }
        let url = format!("{}/com/vmware/cis/session", self.base_url());
        let resp = self
            .http
            .post(url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .send()
            .await
            .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
        if !resp.status().is_success() {
            return Err(AdapterError::UpstreamUnavailable(format!(
                "vCenter login failed: {}",
                resp.status()
            )));
        }
        #[derive(Deserialize)]
        struct SessionResponse {
            value: String,
        }
        let body: SessionResponse = resp
            .json()
            .await
            .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
        *self.session.lock().await = Some(body.value.clone());
        debug!("established new vCenter session");
        Ok(body.value)
    }

    /// Drops the cached session so the next call re-authenticates. Called when a request comes
    /// back unauthorized, per the "reconnect on authentication-expired" contract.
    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    async fn vm_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.vm_locks.lock().await;
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Resolves a VM's inventory name to its vCenter moref id.
    async fn resolve_vm_id(&self, name: &str) -> Result<String, AdapterError> {
        let token = self.ensure_session().await?;
        let url = format!("{}/vcenter/vm", self.base_url());
        let resp = self
            .http
            .get(url)
            .header("vmware-api-session-id", &token)
            .query(&[("filter.names", name)])
            .send()
            .await
            .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_session().await;
            return Err(AdapterError::UpstreamUnavailable(
                "vCenter session expired".to_string(),
            ));
        }
        if !resp.status().is_success() {
            return Err(AdapterError::UpstreamUnavailable(format!(
                "vCenter VM lookup failed: {}",
                resp.status()
            )));
        }
        #[derive(Deserialize)]
        struct VmSummary {
            vm: String,
        }
        #[derive(Deserialize)]
        struct ListResponse {
            value: Vec<VmSummary>,
        }
        let body: ListResponse = resp
            .json()
            .await
            .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
        body.value
            .into_iter()
            .next()
            .map(|v| v.vm)
            .ok_or_else(|| AdapterError::VmNotFound(name.to_string()))
    }

    async fn power_action(&self, name: &str, action: &str) -> Result<(), AdapterError> {
        let lock = self.vm_lock(name).await;
        let _guard = lock.lock().await;
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}/power/{action}", self.base_url());
                let resp = self
                    .http
                    .post(url)
                    .header("vmware-api-session-id", &token)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                // Idempotent: "already in that state" is reported as a 400 by vCenter's
                // REST API and is treated as success here, not as a request error.
                if resp.status().is_success()
                    || resp.status() == reqwest::StatusCode::BAD_REQUEST
                {
                    Ok(())
                } else {
                    Err(AdapterError::UpstreamUnavailable(format!(
                        "power/{action} failed: {}",
                        resp.status()
                    )))
                }
            })
            .await
    }
}

#[async_trait]
impl VsphereAdapter for VimClient {
    #[instrument(level = "debug", skip(self))]
    async fn power_on(&self, name: &str) -> Result<(), AdapterError> {
        self.power_action(name, "start").await
    }

    #[instrument(level = "debug", skip(self))]
    async fn power_off(&self, name: &str, force: bool) -> Result<(), AdapterError> {
        if force {
            self.power_action(name, "stop").await
        } else {
            self.shutdown_guest(name).await
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn reset(&self, name: &str) -> Result<(), AdapterError> {
        self.power_action(name, "reset").await
    }

    #[instrument(level = "debug", skip(self))]
    async fn shutdown_guest(&self, name: &str) -> Result<(), AdapterError> {
        let lock = self.vm_lock(name).await;
        let _guard = lock.lock().await;
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}/guest/power/shutdown", self.base_url());
                let resp = self
                    .http
                    .post(url)
                    .header("vmware-api-session-id", &token)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                if resp.status().is_success() {
                    Ok(())
                } else {
                    Err(AdapterError::UpstreamUnavailable(format!(
                        "guest shutdown failed: {}",
                        resp.status()
                    )))
                }
            })
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn reboot_guest(&self, name: &str) -> Result<(), AdapterError> {
        let lock = self.vm_lock(name).await;
        let _guard = lock.lock().await;
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}/guest/power/reboot", self.base_url());
                let resp = self
                    .http
                    .post(url)
                    .header("vmware-api-session-id", &token)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                if resp.status().is_success() {
                    Ok(())
                } else {
                    Err(AdapterError::UpstreamUnavailable(format!(
                        "guest reboot failed: {}",
                        resp.status()
                    )))
                }
            })
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_power_state(&self, name: &str) -> Result<ObservedPowerState, AdapterError> {
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}/power", self.base_url());
                let resp = self
                    .http
                    .get(url)
                    .header("vmware-api-session-id", &token)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                if !resp.status().is_success() {
                    return Err(AdapterError::UpstreamUnavailable(format!(
                        "power state read failed: {}",
                        resp.status()
                    )));
                }
                #[derive(Deserialize)]
                struct PowerInfo {
                    state: String,
                }
                #[derive(Deserialize)]
                struct Wrapper {
                    value: PowerInfo,
                }
                let body: Wrapper = resp
                    .json()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                Ok(match body.value.state.as_str() {
                    "POWERED_ON" => ObservedPowerState::On,
                    _ => ObservedPowerState::Off,
                })
            })
            .await
    }

    #[instrument(level = "debug", skip(self, devices))]
    async fn set_boot_order(&self, name: &str, devices: &[BootDevice]) -> Result<(), AdapterError> {
        let lock = self.vm_lock(name).await;
        let _guard = lock.lock().await;
        let payload = serde_json::json!({
            "value": {
                "devices": devices.iter().map(boot_device_json).collect::<Vec<_>>(),
            }
        });
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}/boot/devices", self.base_url());
                let resp = self
                    .http
                    .put(url)
                    .header("vmware-api-session-id", &token)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                if resp.status().is_success() {
                    Ok(())
                } else {
                    Err(AdapterError::UpstreamUnavailable(format!(
                        "set boot order failed: {}",
                        resp.status()
                    )))
                }
            })
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn mount_iso(
        &self,
        name: &str,
        datastore: &str,
        iso_path: &str,
    ) -> Result<(), AdapterError> {
        let lock = self.vm_lock(name).await;
        let _guard = lock.lock().await;
        let payload = serde_json::json!({
            "spec": {
                "type": "SATA",
                "backing": {
                    "type": "ISO_FILE",
                    "iso_file": format!("[{datastore}] {iso_path}"),
                },
                "start_connected": true,
            }
        });
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}/hardware/cdrom", self.base_url());
                let resp = self
                    .http
                    .post(url)
                    .header("vmware-api-session-id", &token)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                if resp.status().is_success() || resp.status() == reqwest::StatusCode::BAD_REQUEST
                {
                    Ok(())
                } else {
                    Err(AdapterError::UpstreamUnavailable(format!(
                        "mount_iso failed: {}",
                        resp.status()
                    )))
                }
            })
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn unmount_iso(&self, name: &str) -> Result<(), AdapterError> {
        let lock = self.vm_lock(name).await;
        let _guard = lock.lock().await;
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}/hardware/cdrom/8000", self.base_url());
                let resp = self
                    .http
                    .delete(url)
                    .header("vmware-api-session-id", &token)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                // Deleting a device that isn't there is a 404, which is treated as the idempotent
                // success case ("unmounting when nothing is mounted returns success").
                if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
                    Ok(())
                } else {
                    Err(AdapterError::UpstreamUnavailable(format!(
                        "unmount_iso failed: {}",
                        resp.status()
                    )))
                }
            })
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_inventory(&self, name: &str) -> Result<Inventory, AdapterError> {
        self.backoff
            .retry(|| async {
                let vm_id = self.resolve_vm_id(name).await?;
                let token = self.ensure_session().await?;
                let url = format!("{}/vcenter/vm/{vm_id}", self.base_url());
                let resp = self
                    .http
                    .get(url)
                    .header("vmware-api-session-id", &token)
                    .send()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                if !resp.status().is_success() {
                    return Err(AdapterError::UpstreamUnavailable(format!(
                        "inventory read failed: {}",
                        resp.status()
                    )));
                }
                #[derive(Deserialize)]
                struct CpuInfo {
                    count: u32,
                }
                #[derive(Deserialize)]
                struct MemoryInfo {
                    size_mib: u64,
                }
                #[derive(Deserialize)]
                struct NicEntry {
                    label: Option<String>,
                    mac_address: Option<String>,
                    state: Option<String>,
                }
                #[derive(Deserialize)]
                struct DiskEntry {
                    label: Option<String>,
                    capacity: Option<u64>,
                }
                #[derive(Deserialize, Default)]
                struct VmInfo {
                    cpu: Option<CpuInfo>,
                    memory: Option<MemoryInfo>,
                    #[serde(default)]
                    nics: HashMap<String, NicEntry>,
                    #[serde(default)]
                    disks: HashMap<String, DiskEntry>,
                    guest_os: Option<String>,
                }
                #[derive(Deserialize)]
                struct Wrapper {
                    value: VmInfo,
                }
                let body: Wrapper = resp
                    .json()
                    .await
                    .map_err(|err| AdapterError::UpstreamUnavailable(err.to_string()))?;
                let info = body.value;
                Ok(Inventory {
                    cpu_count: info.cpu.map(|c| c.count).unwrap_or(1),
                    memory_mb: info.memory.map(|m| m.size_mib).unwrap_or(1024),
                    nics: info
                        .nics
                        .into_values()
                        .map(|n| NicInfo {
                            name: n.label.unwrap_or_else(|| "Network adapter".to_string()),
                            mac: n.mac_address.unwrap_or_default(),
                            connected: n.state.as_deref() == Some("CONNECTED"),
                        })
                        .collect(),
                    disks: info
                        .disks
                        .into_values()
                        .map(|d| DiskInfo {
                            label: d.label.unwrap_or_else(|| "Hard disk".to_string()),
                            capacity_mb: d.capacity.unwrap_or(0) / (1024 * 1024),
                        })
                        .collect(),
                    guest_os: info.guest_os.unwrap_or_else(|| "otherGuest64".to_string()),
                })
            })
            .await
            .inspect_err(|err| {
                warn!(error = %err, vm = name, "inventory read exhausted retries");
            })
    }
}

fn boot_device_json(device: &BootDevice) -> serde_json::Value {
    let kind = match device {
        BootDevice::Disk => "DISK",
        BootDevice::Cd => "CDROM",
        BootDevice::Network => "ETHERNET",
    };
    serde_json::json!({ "type": kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_device_json_matches_vcenter_enum() {
        assert_eq!(boot_device_json(&BootDevice::Disk)["type"], "DISK");
        assert_eq!(boot_device_json(&BootDevice::Cd)["type"], "CDROM");
        assert_eq!(boot_device_json(&BootDevice::Network)["type"], "ETHERNET");
    }
}
