// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! The Redfish HTTPS server: one TLS listener per `ManagedVM`, serving the resource tree from
//! §4.4/§4.5 — service root, Systems, Managers, Chassis, UpdateService, TaskService,
//! EventService, Storage, Bios, SecureBoot, VirtualMedia, LogServices, SessionService,
//! Registries.
//!
//! Every path an orchestrator polls must return a schema-valid payload even when the vSphere
//! adapter is unreachable; see [`context::VmContext`] and the individual resource modules for
//! how cached/synthetic fallbacks are applied.

pub mod auth;
pub mod bios;
pub mod chassis;
pub mod context;
pub mod error;
pub mod ethernet_interfaces;
pub mod event_service;
pub mod log_services;
pub mod managers;
pub mod memory;
pub mod odata;
pub mod processors;
pub mod registries;
pub mod router;
pub mod secure_boot;
pub mod server;
pub mod service_root;
pub mod session;
pub mod session_service;
pub mod storage;
pub mod systems;
pub mod task_service;
pub mod tls;
pub mod update_service;
pub mod virtual_media;

pub use context::VmContext;
pub use error::RedfishError;
pub use server::run;
