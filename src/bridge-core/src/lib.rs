// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! Shared data model and configuration for the VMware-to-BMC bridge: [`config::Config`] loading,
//! the [`vm::ManagedVm`] entity, the [`task::TaskRegistry`] driving Redfish's `TaskService`, the
//! per-VM [`event::EventStore`] backing both IPMI SEL and Redfish `LogServices`, and the
//! [`state::GlobalState`] that ties them together behind a single vSphere adapter.

pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod state;
pub mod task;
pub mod vm;

pub use config::{Config, ConfigError};
pub use error::BridgeError;
pub use event::{EventLogEntry, EventSeverity, EventStore};
pub use ids::{EventId, TaskId};
pub use state::GlobalState;
pub use task::{Task, TaskOutcome, TaskRegistry, TaskState, TaskStatus};
pub use vm::{
    BootEnabled, BootOverride, BootTarget, ManagedVm, PowerState, VirtualMediaDevice,
    VirtualMediaState, VmCachedState,
};
