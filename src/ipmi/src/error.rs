// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the IPMI engine.

/// Errors that drop a packet or reject a session rather than propagate to the caller — the UDP
/// listener never returns a transport-level error to anything, it only decides whether to answer.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum IpmiError {
    /// malformed RMCP/IPMI framing: {0}
    ProtocolMalformed(String),
    /// unknown session id {0:#010x}
    UnknownSession(u32),
    /// authentication code did not verify
    AuthRejected,
    /// inbound sequence number {seq} outside replay window for session {session_id:#010x}
    ReplayRejected { session_id: u32, seq: u32 },
    /// unknown username "{0}"
    InvalidUser(String),
}
