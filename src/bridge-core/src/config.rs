// SPDX-License-Identifier: Apache-2.0

//! Configuration file parsing and validation.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

/// Top-level configuration, read once at startup from a single JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The single vCenter endpoint this bridge talks to.
    pub vmware: VmwareConfig,
    /// Optional TLS material for the Redfish listeners.
    #[serde(default)]
    pub ssl: SslConfig,
    /// Managed VMs, each exposed as its own IPMI/Redfish endpoint pair.
    pub vms: Vec<VmConfig>,
}

/// vCenter connection parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct VmwareConfig {
    /// vCenter hostname or IP.
    pub host: String,
    /// Service account username.
    pub user: String,
    /// Service account password.
    pub password: String,
    /// vCenter HTTPS port.
    #[serde(default = "default_vmware_port")]
    pub port: u16,
    /// Skip TLS certificate validation when talking to vCenter.
    #[serde(default = "default_true")]
    pub disable_ssl: bool,
}

fn default_vmware_port() -> u16 {
    443
}

fn default_true() -> bool {
    true
}

/// TLS material for Redfish listeners; when absent a self-signed certificate is generated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SslConfig {
    /// Path to a PEM certificate.
    pub cert_path: Option<String>,
    /// Path to a PEM private key.
    pub key_path: Option<String>,
}

/// A single managed VM entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VmConfig {
    /// vSphere inventory name; also used as the external/Redfish `Id`.
    pub name: String,
    /// Unique UDP port the IPMI BMC listens on.
    pub ipmi_port: u16,
    /// Unique TCP port the Redfish server listens on.
    pub redfish_port: u16,
    /// RAKP username.
    pub ipmi_user: String,
    /// RAKP password, must be <= 20 bytes per the IPMI 2.0 spec.
    pub ipmi_password: String,
    /// HTTP Basic / session username.
    pub redfish_user: String,
    /// HTTP Basic / session password.
    pub redfish_password: String,
    /// Per-VM override of the global `disable_ssl` setting.
    pub disable_ssl: Option<bool>,
    /// Default ISO to mount when boot is overridden to `Cd`.
    pub default_iso: Option<DefaultIso>,
}

/// A datastore-relative ISO path used as the default CD-ROM boot image.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultIso {
    /// Datastore name, e.g. "datastore1".
    pub datastore: String,
    /// Path within the datastore, e.g. "isos/install.iso".
    pub path: String,
}

/// Errors in the configuration file (fatal at startup).
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum ConfigError {
    /// failed to read config file "{path}": {source}
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// failed to parse config file as JSON: {0}
    Parse(#[source] serde_json::Error),
    /// VM name "{0}" is used more than once
    DuplicateName(String),
    /// ipmi_port {0} is used by more than one VM
    DuplicateIpmiPort(u16),
    /// redfish_port {0} is used by more than one VM
    DuplicateRedfishPort(u16),
    /// VM "{name}" has no credentials configured for {field}
    EmptyCredential {
        /// Offending VM name.
        name: String,
        /// Which credential field is empty.
        field: &'static str,
    },
    /// VM "{name}"'s ipmi_password is {len} bytes, which exceeds the IPMI 2.0 limit of 20
    IpmiPasswordTooLong {
        /// Offending VM name.
        name: String,
        /// Actual password length.
        len: usize,
    },
    /// VM "{name}" has {field} out of the valid 1..65535 range
    InvalidPort {
        /// Offending VM name.
        name: String,
        /// Which port field is invalid.
        field: &'static str,
    },
    /// the `vms` list must not be empty
    NoVms,
}

impl Config {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the uniqueness and shape invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vms.is_empty() {
            return Err(ConfigError::NoVms);
        }
        let mut names = HashSet::new();
        let mut ipmi_ports = HashSet::new();
        let mut redfish_ports = HashSet::new();
        for vm in &self.vms {
            if !names.insert(vm.name.clone()) {
                return Err(ConfigError::DuplicateName(vm.name.clone()));
            }
            if !ipmi_ports.insert(vm.ipmi_port) {
                return Err(ConfigError::DuplicateIpmiPort(vm.ipmi_port));
            }
            if !redfish_ports.insert(vm.redfish_port) {
                return Err(ConfigError::DuplicateRedfishPort(vm.redfish_port));
            }
            if vm.ipmi_port == 0 {
                return Err(ConfigError::InvalidPort {
                    name: vm.name.clone(),
                    field: "ipmi_port",
                });
            }
            if vm.redfish_port == 0 {
                return Err(ConfigError::InvalidPort {
                    name: vm.name.clone(),
                    field: "redfish_port",
                });
            }
            for (value, field) in [
                (vm.ipmi_user.as_str(), "ipmi_user"),
                (vm.ipmi_password.as_str(), "ipmi_password"),
                (vm.redfish_user.as_str(), "redfish_user"),
                (vm.redfish_password.as_str(), "redfish_password"),
            ] {
                if value.is_empty() {
                    return Err(ConfigError::EmptyCredential {
                        name: vm.name.clone(),
                        field,
                    });
                }
            }
            if vm.ipmi_password.as_bytes().len() > 20 {
                return Err(ConfigError::IpmiPasswordTooLong {
                    name: vm.name.clone(),
                    len: vm.ipmi_password.as_bytes().len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vm(name: &str, ipmi_port: u16, redfish_port: u16) -> VmConfig {
        VmConfig {
            name: name.to_string(),
            ipmi_port,
            redfish_port,
            ipmi_user: "admin".to_string(),
            ipmi_password: "password".to_string(),
            redfish_user: "admin".to_string(),
            redfish_password: "password".to_string(),
            disable_ssl: None,
            default_iso: None,
        }
    }

    fn sample_config(vms: Vec<VmConfig>) -> Config {
        Config {
            vmware: VmwareConfig {
                host: "vcenter.example.com".to_string(),
                user: "svc".to_string(),
                password: "svc-pass".to_string(),
                port: 443,
                disable_ssl: true,
            },
            ssl: SslConfig::default(),
            vms,
        }
    }

    #[test]
    fn accepts_well_formed_config() {
        let config = sample_config(vec![sample_vm("worker-1", 6230, 8443)]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_name() {
        let config = sample_config(vec![
            sample_vm("worker-1", 6230, 8443),
            sample_vm("worker-1", 6231, 8444),
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateName(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ipmi_port() {
        let config = sample_config(vec![
            sample_vm("worker-1", 6230, 8443),
            sample_vm("worker-2", 6230, 8444),
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateIpmiPort(6230))
        ));
    }

    #[test]
    fn rejects_password_over_20_bytes() {
        let mut vm = sample_vm("worker-1", 6230, 8443);
        vm.ipmi_password = "a".repeat(21);
        let config = sample_config(vec![vm]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IpmiPasswordTooLong { .. })
        ));
    }

    #[test]
    fn rejects_empty_vms() {
        let config = sample_config(vec![]);
        assert!(matches!(config.validate(), Err(ConfigError::NoVms)));
    }
}
