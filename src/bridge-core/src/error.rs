// SPDX-License-Identifier: Apache-2.0

//! Top-level error type for bridge-wide operations that aren't specific to one protocol crate.

/// Errors surfaced by [`crate::state::GlobalState`] lookups.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum BridgeError {
    /// no managed VM named "{0}"
    UnknownVm(String),
}
