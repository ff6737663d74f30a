// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the vSphere adapter.

/// Errors an adapter operation can fail with.
///
/// `UpstreamUnavailable` is the only variant callers are expected to translate into a
/// protocol-level soft success; the others indicate a genuinely invalid request.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum AdapterError {
    /// vCenter did not respond within the retry budget; last error: {0}
    UpstreamUnavailable(String),
    /// no VM named "{0}" in inventory
    VmNotFound(String),
    /// request rejected by vCenter: {0}
    Rejected(String),
}

impl AdapterError {
    /// True if this error should be treated as a transient upstream failure rather than a
    /// request error. Callers use this to decide whether to map the error to a soft success.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, AdapterError::UpstreamUnavailable(_))
    }
}
