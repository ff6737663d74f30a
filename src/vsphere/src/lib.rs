// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! The vSphere adapter: a narrow, async operation surface exposing power, boot-device,
//! virtual-media and inventory operations against a vCenter endpoint, with a single shared,
//! lazily reconnected session.

pub mod adapter;
pub mod client;
pub mod error;
pub mod types;

pub use adapter::VsphereAdapter;
pub use error::AdapterError;
pub use types::{BootDevice, DiskInfo, Inventory, NicInfo, ObservedPowerState};

#[cfg(feature = "test-util")]
pub use adapter::MockVsphereAdapter;

pub use client::{VimClient, VsphereConfig};
