// SPDX-License-Identifier: Apache-2.0

//! Binary entry point for the VMware-to-BMC bridge.
//!
//! Loads the configuration file, builds one shared [`bridge_core::GlobalState`], then spawns an
//! IPMI UDP listener and a Redfish TLS listener for every configured VM. `Ctrl-C` triggers a
//! [`tokio_util::sync::CancellationToken`] that stops new accepts/receives; in-flight Redfish
//! connections are given up to 5s to drain (§5 of the design) before the process exits.

use std::process::ExitCode;
use std::sync::Arc;

use bridge_core::GlobalState;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vsphere::{VimClient, VsphereConfig};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "bmc-bridge", about = "VMware-to-BMC hardware-management bridge")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, env = "BMC_BRIDGE_CONFIG")]
    config: String,
    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "BMC_BRIDGE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = logger::init(&args.log_level) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ StartupError::Bind(_)) => {
            error!(error = %err, "bmc-bridge could not bind a required port");
            ExitCode::from(2)
        }
        Err(err) => {
            error!(error = %err, "bmc-bridge exited with an error");
            ExitCode::FAILURE
        }
    }
}

/// Errors that abort startup before the bridge can begin serving.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
enum StartupError {
    /// failed to load config: {0}
    Config(#[from] bridge_core::ConfigError),
    /// cannot bind a required port: {0}
    Bind(String),
}

async fn run(args: Args) -> Result<(), StartupError> {
    let config = bridge_core::Config::load(&args.config)?;
    info!(vms = config.vms.len(), "configuration loaded");

    let vsphere_config = VsphereConfig {
        host: config.vmware.host.clone(),
        port: config.vmware.port,
        user: config.vmware.user.clone(),
        password: config.vmware.password.clone(),
        disable_ssl: config.vmware.disable_ssl,
    };
    let ssl = config.ssl.clone();
    let vsphere_adapter = Arc::new(VimClient::new(vsphere_config));
    let state = Arc::new(GlobalState::new(config, vsphere_adapter));

    let shutdown = CancellationToken::new();
    let mut listeners = Vec::new();

    for vm_name in state.vm_names().into_iter().map(str::to_string).collect::<Vec<_>>() {
        let vm = state
            .vm(&vm_name)
            .expect("vm_names() only returns names present in managed_vms");

        // Bound synchronously, before spawning the long-running listener task, so a port
        // already in use aborts startup here rather than being swallowed inside the spawned
        // task.
        let ipmi_socket = ipmi::server::bind(vm.ipmi_port).await.map_err(|err| {
            StartupError::Bind(format!("IPMI port {} ({vm_name}): {err}", vm.ipmi_port))
        })?;
        let redfish_listener = redfish::server::bind(vm.redfish_port).await.map_err(|err| {
            StartupError::Bind(format!("Redfish port {} ({vm_name}): {err}", vm.redfish_port))
        })?;

        let ipmi_state = state.clone();
        let ipmi_shutdown = shutdown.clone();
        let ipmi_vm_name = vm_name.clone();
        listeners.push(tokio::spawn(async move {
            if let Err(err) = ipmi::run(ipmi_vm_name.clone(), ipmi_socket, ipmi_state, ipmi_shutdown).await {
                error!(vm = %ipmi_vm_name, error = %err, "IPMI listener exited with an error");
            }
        }));

        let redfish_context = redfish::VmContext::new(state.clone(), vm_name.clone());
        let redfish_shutdown = shutdown.clone();
        let cert_path = ssl.cert_path.clone();
        let key_path = ssl.key_path.clone();
        let redfish_vm_name = vm_name.clone();
        listeners.push(tokio::spawn(async move {
            if let Err(err) =
                redfish::run(redfish_listener, redfish_context, cert_path, key_path, redfish_shutdown).await
            {
                error!(vm = %redfish_vm_name, error = %err, "Redfish listener exited with an error");
            }
        }));
    }

    info!("bmc-bridge listeners running, waiting for shutdown signal");
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install Ctrl-C handler, shutting down anyway");
    }
    info!("shutdown signal received, draining listeners");
    shutdown.cancel();

    for listener in listeners {
        let _ = listener.await;
    }
    info!("bmc-bridge shut down cleanly");
    Ok(())
}
