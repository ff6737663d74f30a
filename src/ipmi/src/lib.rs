// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! The IPMI v2.0 / RMCP+ engine: wire framing ([`wire`]), RAKP-HMAC-SHA1 key derivation and
//! integrity/confidentiality primitives ([`crypto`]), per-session state ([`session`]), the
//! command dispatch table ([`commands`]), and the per-VM UDP listener ([`server`]).

pub mod commands;
pub mod crypto;
pub mod error;
pub mod server;
pub mod session;
pub mod wire;

pub use error::IpmiError;
pub use server::run;
