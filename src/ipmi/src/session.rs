// SPDX-License-Identifier: Apache-2.0

//! Per-session state: the RAKP handshake state machine, negotiated keys, and the
//! replay window enforced on every authenticated payload.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::error::IpmiError;

/// Idle timeout after which a session is reaped.
pub const SESSION_IDLE_TIMEOUT_SECS: u64 = 60;
/// Interval on which the reaper sweeps for idle sessions.
pub const REAPER_INTERVAL_SECS: u64 = 10;
/// Width of the inbound sequence-number replay window.
pub const REPLAY_WINDOW: u32 = 8;

/// RAKP handshake / session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Open Session Request received, Open Session Response sent.
    OpenAck,
    /// RAKP1 received, RAKP2 sent.
    Rakp2Sent,
    /// RAKP3 received and verified, RAKP4 sent.
    Rakp4Sent,
    /// First authenticated command received; the session accepts ordinary IPMI traffic.
    Established,
}

/// Negotiated privilege level, capped at Administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrivilegeLevel {
    /// Callback-only privilege.
    Callback,
    /// User privilege.
    User,
    /// Operator privilege.
    Operator,
    /// Administrator privilege, the maximum this bridge grants.
    Administrator,
}

impl PrivilegeLevel {
    /// Decodes a requested privilege-level nibble, capping anything above Administrator.
    pub fn from_requested(level: u8) -> Self {
        match level {
            0x01 => Self::Callback,
            0x02 => Self::User,
            0x03 => Self::Operator,
            _ => Self::Administrator,
        }
    }
}

/// One established-or-establishing IPMI session.
pub struct IpmiSession {
    /// The managed (server-assigned) session id — the key other than `remote_addr` this
    /// session is indexed by.
    pub managed_session_id: u32,
    /// The console's (client-assigned) session id, echoed in every authenticated packet.
    pub console_session_id: u32,
    /// Source address the session was opened from.
    pub remote_addr: SocketAddr,
    /// Name of the `ManagedVm` this session's listener belongs to.
    pub vm_name: String,
    /// Current handshake/lifecycle state.
    pub state: SessionState,
    /// Negotiated privilege level.
    pub privilege: PrivilegeLevel,
    /// Session Integrity Key, `None` until RAKP3 is verified.
    pub sik: Option<[u8; 20]>,
    /// Integrity key, derived from `sik` once available.
    pub k1: Option<[u8; 20]>,
    /// Confidentiality key material, derived from `sik` once available.
    pub k2: Option<[u8; 20]>,
    /// Random value generated by the console during RAKP1, retained for key derivation.
    pub random_console: [u8; 16],
    /// Random value generated by this server during the Open Session Response, retained for key
    /// derivation and RAKP3 verification.
    pub random_managed: [u8; 16],
    /// Next outbound sequence number this server will use.
    pub outbound_seq: u32,
    /// Highest inbound sequence number accepted so far.
    pub highest_inbound_seq: u32,
    /// Timestamp of the last accepted packet, for idle reaping.
    pub last_activity: Instant,
}

impl IpmiSession {
    /// Accepts `seq` if it falls within the replay window ahead of the highest seen so far,
    /// updating the window on success.
    pub fn accept_sequence(&mut self, seq: u32) -> Result<(), IpmiError> {
        if seq == 0 {
            // A zero sequence is used by pre-established packets and is never replay-checked.
            return Ok(());
        }
        let diff = seq.wrapping_sub(self.highest_inbound_seq);
        let in_window = diff != 0 && diff <= REPLAY_WINDOW;
        let is_old_but_in_window =
            self.highest_inbound_seq.wrapping_sub(seq) <= REPLAY_WINDOW && seq <= self.highest_inbound_seq;

        if in_window {
            self.highest_inbound_seq = seq;
            self.last_activity = Instant::now();
            Ok(())
        } else if is_old_but_in_window {
            // Within the trailing edge of the window: accepted, but does not advance the high
            // watermark (it's an out-of-order-but-valid retransmission).
            self.last_activity = Instant::now();
            Ok(())
        } else {
            Err(IpmiError::ReplayRejected {
                session_id: self.managed_session_id,
                seq,
            })
        }
    }

    /// Returns the next outbound sequence number and advances the counter.
    pub fn next_outbound_seq(&mut self) -> u32 {
        self.outbound_seq += 1;
        self.outbound_seq
    }

    /// True if this session has been idle longer than [`SESSION_IDLE_TIMEOUT_SECS`].
    pub fn is_idle(&self) -> bool {
        self.last_activity.elapsed().as_secs() >= SESSION_IDLE_TIMEOUT_SECS
    }
}

/// The session table for one VM's IPMI listener, keyed by managed session id and indexed by
/// console session id for RAKP3 lookups.
#[derive(Default)]
pub struct SessionTable {
    by_managed_id: RwLock<HashMap<u32, IpmiSession>>,
    console_to_managed: RwLock<HashMap<u32, u32>>,
}

impl SessionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a newly created session, keyed by its managed session id and indexed by its
    /// console session id.
    pub async fn insert(&self, session: IpmiSession) {
        let console_session_id = session.console_session_id;
        let managed_session_id = session.managed_session_id;
        self.by_managed_id
            .write()
            .await
            .insert(managed_session_id, session);
        self.console_to_managed
            .write()
            .await
            .insert(console_session_id, managed_session_id);
    }

    /// Runs `f` with mutable access to the session with the given managed session id.
    pub async fn with_session<R>(
        &self,
        managed_session_id: u32,
        f: impl FnOnce(&mut IpmiSession) -> R,
    ) -> Option<R> {
        let mut table = self.by_managed_id.write().await;
        table.get_mut(&managed_session_id).map(f)
    }

    /// Runs `f` with mutable access to the session identified by its console session id.
    pub async fn with_session_by_console_id<R>(
        &self,
        console_session_id: u32,
        f: impl FnOnce(&mut IpmiSession) -> R,
    ) -> Option<R> {
        let managed_session_id = *self.console_to_managed.read().await.get(&console_session_id)?;
        self.with_session(managed_session_id, f).await
    }

    /// Removes a session.
    pub async fn remove(&self, managed_session_id: u32) {
        if let Some(session) = self.by_managed_id.write().await.remove(&managed_session_id) {
            self.console_to_managed.write().await.remove(&session.console_session_id);
        }
    }

    /// Removes every session idle past the timeout. Intended to be called on the reaper's
    /// periodic tick.
    pub async fn reap_idle(&self) -> usize {
        let mut table = self.by_managed_id.write().await;
        let stale_console_ids: Vec<u32> = table
            .values()
            .filter(|session| session.is_idle())
            .map(|session| session.console_session_id)
            .collect();
        table.retain(|_, session| !session.is_idle());
        if !stale_console_ids.is_empty() {
            let mut console_table = self.console_to_managed.write().await;
            for console_id in &stale_console_ids {
                console_table.remove(console_id);
            }
        }
        stale_console_ids.len()
    }

    /// Returns the number of currently tracked sessions.
    pub async fn len(&self) -> usize {
        self.by_managed_id.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session(managed_session_id: u32) -> IpmiSession {
        IpmiSession {
            managed_session_id,
            console_session_id: 0xaaaa_bbbb,
            remote_addr: "127.0.0.1:12345".parse().unwrap(),
            vm_name: "worker-1".to_string(),
            state: SessionState::Established,
            privilege: PrivilegeLevel::Administrator,
            sik: None,
            k1: None,
            k2: None,
            random_console: [0; 16],
            random_managed: [0; 16],
            outbound_seq: 0,
            highest_inbound_seq: 0,
            last_activity: Instant::now(),
        }
    }

    #[test]
    fn sequence_within_window_advances_watermark() {
        let mut session = sample_session(1);
        assert!(session.accept_sequence(1).is_ok());
        assert_eq!(session.highest_inbound_seq, 1);
        assert!(session.accept_sequence(5).is_ok());
        assert_eq!(session.highest_inbound_seq, 5);
    }

    #[test]
    fn sequence_far_outside_window_is_rejected() {
        let mut session = sample_session(1);
        session.highest_inbound_seq = 100;
        assert!(matches!(
            session.accept_sequence(50),
            Err(IpmiError::ReplayRejected { .. })
        ));
    }

    #[test]
    fn trailing_edge_retransmission_is_accepted_without_advancing() {
        let mut session = sample_session(1);
        session.highest_inbound_seq = 100;
        assert!(session.accept_sequence(95).is_ok());
        assert_eq!(session.highest_inbound_seq, 100);
    }

    #[tokio::test]
    async fn table_insert_and_remove_round_trip() {
        let table = SessionTable::new();
        table.insert(sample_session(42)).await;
        assert_eq!(table.len().await, 1);
        table.remove(42).await;
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn reap_idle_evicts_only_stale_sessions() {
        let table = SessionTable::new();
        let mut stale = sample_session(1);
        stale.last_activity = Instant::now() - std::time::Duration::from_secs(120);
        table.insert(stale).await;
        table.insert(sample_session(2)).await;

        let evicted = table.reap_idle().await;
        assert_eq!(evicted, 1);
        assert_eq!(table.len().await, 1);
    }

    #[test]
    fn privilege_level_requests_above_administrator_are_capped() {
        assert_eq!(PrivilegeLevel::from_requested(0xff), PrivilegeLevel::Administrator);
    }
}
