// SPDX-License-Identifier: Apache-2.0

//! The per-VM IPMI UDP listener: one receive loop per configured VM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bridge_core::GlobalState;
use rand::RngCore;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::commands::IpmiCommand;
use crate::crypto;
use crate::session::{IpmiSession, PrivilegeLevel, SessionState, SessionTable, REAPER_INTERVAL_SECS};
use crate::wire::{self, PayloadType};

/// Binds the IPMI UDP listening socket for one VM. Split from [`run`] so the caller can observe
/// a bind failure (e.g. port already in use) before committing to the long-running receive loop.
pub async fn bind(bind_port: u16) -> std::io::Result<UdpSocket> {
    UdpSocket::bind(("0.0.0.0", bind_port)).await
}

/// Runs the IPMI UDP listener for one VM, on an already-bound `socket`, until `shutdown` is
/// triggered.
///
/// Processes datagrams in an independent receive loop. Malformed frames are dropped without a
/// response; handler panics are not expected to occur since every fallible step returns
/// `Result`, but a failed `send_to` is logged and otherwise ignored — the remote console will
/// simply retry.
pub async fn run(
    vm_name: String,
    socket: UdpSocket,
    state: Arc<GlobalState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let sessions = Arc::new(SessionTable::new());

    tokio::spawn(reap_loop(sessions.clone(), shutdown.clone()));

    let mut buf = [0u8; 2048];
    loop {
        let (len, remote_addr) = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            result = socket.recv_from(&mut buf) => result?,
        };

        let Some(response) = handle_datagram(&buf[..len], remote_addr, &vm_name, &state, &sessions).await else {
            continue;
        };
        if let Err(err) = socket.send_to(&response, remote_addr).await {
            tracing::warn!(vm = %vm_name, error = %err, "failed to send IPMI response");
        }
    }
}

async fn reap_loop(sessions: Arc<SessionTable>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(REAPER_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = interval.tick() => {
                let evicted = sessions.reap_idle().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "reaped idle IPMI sessions");
                }
            }
        }
    }
}

async fn handle_datagram(
    datagram: &[u8],
    remote_addr: SocketAddr,
    vm_name: &str,
    state: &Arc<GlobalState>,
    sessions: &Arc<SessionTable>,
) -> Option<Vec<u8>> {
    let packet = match wire::decode(datagram) {
        Ok(Some(packet)) => packet,
        Ok(None) => return None, // non-IPMI RMCP class, silently dropped
        Err(err) => {
            tracing::debug!(vm = vm_name, error = %err, "dropping malformed IPMI datagram");
            return None;
        }
    };

    match packet.payload_type {
        PayloadType::OpenSessionRequest => {
            handle_open_session_request(&packet.payload, remote_addr, vm_name, sessions).await
        }
        PayloadType::Rakp1 => handle_rakp1(&packet.payload, vm_name, state, sessions).await,
        PayloadType::Rakp3 => handle_rakp3(&packet.payload, vm_name, state, sessions).await,
        PayloadType::IpmiMessage => {
            handle_ipmi_message(&packet, vm_name, state, sessions).await
        }
        _ => None,
    }
}

async fn handle_open_session_request(
    payload: &[u8],
    remote_addr: SocketAddr,
    vm_name: &str,
    sessions: &Arc<SessionTable>,
) -> Option<Vec<u8>> {
    if payload.len() < 8 {
        return None;
    }
    let requested_privilege = PrivilegeLevel::from_requested(payload[1]);
    let console_session_id = u32::from_le_bytes(payload[4..8].try_into().ok()?);

    let mut managed_session_id_bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut managed_session_id_bytes);
    let managed_session_id = u32::from_le_bytes(managed_session_id_bytes).max(1);

    let mut random_managed = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random_managed);

    let session = IpmiSession {
        managed_session_id,
        console_session_id,
        remote_addr,
        vm_name: vm_name.to_string(),
        state: SessionState::OpenAck,
        privilege: requested_privilege,
        sik: None,
        k1: None,
        k2: None,
        random_console: [0; 16],
        random_managed,
        outbound_seq: 0,
        highest_inbound_seq: 0,
        last_activity: std::time::Instant::now(),
    };
    sessions.insert(session).await;

    let mut response = Vec::with_capacity(36);
    response.push(0x00); // message tag, echoed back as zero
    response.push(0x00); // status code: success
    response.push(requested_privilege_byte(requested_privilege));
    response.push(0x00); // reserved
    response.extend_from_slice(&console_session_id.to_le_bytes());
    response.extend_from_slice(&managed_session_id.to_le_bytes());
    // Negotiated auth/integrity/confidentiality payloads: HMAC-SHA1, HMAC-SHA1-96, AES-CBC-128.
    response.extend_from_slice(&[0x00, 0x00, 0x08, 0x01]);
    response.extend_from_slice(&[0x01, 0x00, 0x08, 0x01]);
    response.extend_from_slice(&[0x02, 0x00, 0x08, 0x01]);

    Some(wire::encode(
        PayloadType::OpenSessionResponse,
        false,
        0,
        0,
        &response,
        None,
    ))
}

fn requested_privilege_byte(level: PrivilegeLevel) -> u8 {
    match level {
        PrivilegeLevel::Callback => 0x01,
        PrivilegeLevel::User => 0x02,
        PrivilegeLevel::Operator => 0x03,
        PrivilegeLevel::Administrator => 0x04,
    }
}

async fn handle_rakp1(
    payload: &[u8],
    vm_name: &str,
    state: &Arc<GlobalState>,
    sessions: &Arc<SessionTable>,
) -> Option<Vec<u8>> {
    if payload.len() < 28 {
        return None;
    }
    let managed_session_id = u32::from_le_bytes(payload[4..8].try_into().ok()?);
    let mut random_console = [0u8; 16];
    random_console.copy_from_slice(&payload[8..24]);
    let role_byte = payload[24];
    let username_len = payload[27] as usize;
    let username = payload.get(28..28 + username_len)?.to_vec();

    let vm = state.vm(vm_name).ok()?;
    if username != vm.ipmi_user.as_bytes() {
        // Invalid User: drop the would-be session so a subsequent authenticated packet using
        // this session id is silently rejected.
        sessions.remove(managed_session_id).await;
        return None;
    }

    let random_managed = sessions
        .with_session(managed_session_id, |session| {
            session.random_console = random_console;
            session.state = SessionState::Rakp2Sent;
            session.random_managed
        })
        .await?;

    let rakp2_code = crypto::rakp2_hmac(
        vm.ipmi_password.as_bytes(),
        &random_console,
        &random_managed,
        managed_session_id,
        role_byte,
        &username,
    );

    let mut response = Vec::with_capacity(40);
    response.push(0x00);
    response.push(0x00); // status: success
    response.push(0x00);
    response.push(0x00);
    response.extend_from_slice(&managed_session_id.to_le_bytes());
    response.extend_from_slice(&random_managed);
    response.extend_from_slice(&rakp2_code[..]);

    Some(wire::encode(PayloadType::Rakp2, false, 0, 0, &response, None))
}

async fn handle_rakp3(
    payload: &[u8],
    vm_name: &str,
    state: &Arc<GlobalState>,
    sessions: &Arc<SessionTable>,
) -> Option<Vec<u8>> {
    if payload.len() < 28 {
        return None;
    }
    let console_session_id = u32::from_le_bytes(payload[4..8].try_into().ok()?);
    let console_code: [u8; 20] = payload[8..28].try_into().ok()?;
    let vm = state.vm(vm_name).ok()?;

    let verified_managed_id = sessions
        .with_session_by_console_id(console_session_id, |session| {
            let expected =
                crypto::rakp3_hmac(vm.ipmi_password.as_bytes(), &session.random_managed, console_session_id);
            let verified = expected == console_code;
            if verified {
                let sik = crypto::derive_sik(
                    vm.ipmi_password.as_bytes(),
                    &session.random_console,
                    &session.random_managed,
                    requested_privilege_byte(session.privilege),
                    vm.ipmi_user.as_bytes(),
                );
                session.sik = Some(sik);
                session.k1 = Some(crypto::derive_k1(&sik));
                session.k2 = Some(crypto::derive_k2(&sik));
                session.state = SessionState::Rakp4Sent;
            }
            verified.then_some(session.managed_session_id)
        })
        .await
        .flatten()?;

    let mut response = Vec::with_capacity(8);
    response.push(0x00);
    response.push(0x00); // status: success
    response.push(0x00);
    response.push(0x00);
    response.extend_from_slice(&verified_managed_id.to_le_bytes());

    Some(wire::encode(PayloadType::Rakp4, false, 0, 0, &response, None))
}

async fn handle_ipmi_message(
    packet: &wire::SessionPacket,
    vm_name: &str,
    state: &Arc<GlobalState>,
    sessions: &Arc<SessionTable>,
) -> Option<Vec<u8>> {
    if packet.payload.len() < 6 {
        return None;
    }
    let netfn = packet.payload[1] >> 2;
    let cmd = packet.payload[5];
    let request_data = packet.payload.get(6..packet.payload.len().saturating_sub(1))?.to_vec();

    // An authenticated session (session_id != 0) replies authenticated too: a monotonic
    // outbound sequence number and an HMAC-SHA1-96 AuthCode keyed on the session's K1, per §4.2.
    let reply_auth = if packet.session_id != 0 {
        let outcome = sessions
            .with_session(packet.session_id, |session| {
                if !verify_authenticated_payload(session, packet) {
                    return None;
                }
                session.state = SessionState::Established;
                session.accept_sequence(packet.session_seq).ok()?;
                Some((session.managed_session_id, session.next_outbound_seq(), session.k1))
            })
            .await
            .flatten();
        let Some(reply_auth) = outcome else {
            return None;
        };
        Some(reply_auth)
    } else {
        None
    };

    let vm = state.vm(vm_name).ok()?;
    let Some(command) = IpmiCommand::parse(netfn, cmd, &request_data) else {
        return Some(encode_ipmi_response(netfn, cmd, crate::commands::CC_INVALID_COMMAND, &[], reply_auth));
    };

    let events = state.events.get(vm_name)?;
    let response = command.handle(&vm, state.vsphere.as_ref(), events).await;
    Some(encode_ipmi_response(netfn, cmd, response.completion, &response.data, reply_auth))
}

fn encode_ipmi_response(
    netfn: u8,
    cmd: u8,
    completion: u8,
    data: &[u8],
    reply_auth: Option<(u32, u32, Option<[u8; 20]>)>,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(7 + data.len());
    payload.push(0x20); // responder address: BMC
    payload.push(((netfn + 1) << 2) | 0x00); // response NetFn is request NetFn + 1
    payload.push(0x00); // checksum 1 placeholder, recomputed below
    payload.push(0x81); // requester address: remote console (fixed for this bridge)
    payload.push(0x00); // requester sequence/LUN
    payload.push(cmd);
    payload.push(completion);
    payload.extend_from_slice(data);
    payload.push(0x00); // checksum 2 placeholder, recomputed below

    fix_checksums(&mut payload);

    let Some((session_id, seq, k1)) = reply_auth else {
        return wire::encode(PayloadType::IpmiMessage, false, 0, 0, &payload, None);
    };
    let Some(k1) = k1 else {
        // Session established but no integrity key yet (should not happen once Established is
        // reached, since k1 is set at RAKP3); fall back to unauthenticated rather than drop.
        return wire::encode(PayloadType::IpmiMessage, false, session_id, seq, &payload, None);
    };
    let unsigned = wire::encode(PayloadType::IpmiMessage, true, session_id, seq, &payload, Some([0u8; 12]));
    let span = wire::decode(&unsigned)
        .ok()
        .flatten()
        .map(|packet| packet.authenticated_span)
        .unwrap_or_default();
    let code = crypto::hmac_sha1_96(&k1, &span);
    wire::encode(PayloadType::IpmiMessage, true, session_id, seq, &payload, Some(code))
}

/// Recomputes the two IPMI LAN message checksums in place (two's complement of the sum of the
/// preceding bytes since the last checksum, mod 256).
fn fix_checksums(payload: &mut [u8]) {
    if payload.len() < 3 {
        return;
    }
    let sum: u8 = payload[0..2].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    payload[2] = 0u8.wrapping_sub(sum);

    let last = payload.len() - 1;
    let sum2: u8 = payload[3..last].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    payload[last] = 0u8.wrapping_sub(sum2);
}

/// Validates the HMAC-SHA1-96 auth code on an authenticated payload against the session's
/// integrity key, per §4.2 step 2. Unauthenticated payloads (pre-session commands riding on an
/// established session id, which this bridge never emits but may receive) pass through
/// unchecked; a session with no integrity key yet (handshake incomplete) rejects any
/// authenticated payload outright.
fn verify_authenticated_payload(session: &IpmiSession, packet: &wire::SessionPacket) -> bool {
    if !packet.authenticated {
        return true;
    }
    let (Some(k1), Some(code)) = (session.k1, packet.auth_code) else {
        return false;
    };
    crypto::verify_hmac_sha1_96(&k1, &packet.authenticated_span, &code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session_with_k1(k1: Option<[u8; 20]>) -> IpmiSession {
        IpmiSession {
            managed_session_id: 1,
            console_session_id: 2,
            remote_addr: "127.0.0.1:1".parse().unwrap(),
            vm_name: "worker-1".to_string(),
            state: SessionState::Rakp4Sent,
            privilege: PrivilegeLevel::Administrator,
            sik: None,
            k1,
            k2: None,
            random_console: [0; 16],
            random_managed: [0; 16],
            outbound_seq: 0,
            highest_inbound_seq: 0,
            last_activity: std::time::Instant::now(),
        }
    }

    #[test]
    fn unauthenticated_payload_always_passes() {
        let session = sample_session_with_k1(None);
        let packet = wire::decode(&wire::encode(PayloadType::IpmiMessage, false, 0, 0, &[0x01], None))
            .unwrap()
            .unwrap();
        assert!(verify_authenticated_payload(&session, &packet));
    }

    #[test]
    fn authenticated_payload_without_k1_is_rejected() {
        let session = sample_session_with_k1(None);
        let bytes = wire::encode(PayloadType::IpmiMessage, true, 1, 1, &[0x01], Some([0u8; 12]));
        let packet = wire::decode(&bytes).unwrap().unwrap();
        assert!(!verify_authenticated_payload(&session, &packet));
    }

    #[test]
    fn authenticated_payload_with_valid_hmac_is_accepted() {
        let k1 = [0x42u8; 20];
        let session = sample_session_with_k1(Some(k1));
        let payload = [0x20, 0x18, 0xc8, 0x81, 0x04, 0x01, 0x5a];
        // Build the packet once without a code to recover the exact authenticated_span the
        // codec computes the HMAC over, then re-encode with the matching code.
        let unsigned = wire::encode(PayloadType::IpmiMessage, true, 1, 1, &payload, Some([0u8; 12]));
        let span = wire::decode(&unsigned).unwrap().unwrap().authenticated_span;
        let code = crypto::hmac_sha1_96(&k1, &span);
        let signed = wire::encode(PayloadType::IpmiMessage, true, 1, 1, &payload, Some(code));
        let packet = wire::decode(&signed).unwrap().unwrap();
        assert!(verify_authenticated_payload(&session, &packet));
    }

    #[test]
    fn authenticated_payload_with_tampered_hmac_is_rejected() {
        let k1 = [0x42u8; 20];
        let session = sample_session_with_k1(Some(k1));
        let bytes = wire::encode(PayloadType::IpmiMessage, true, 1, 1, &[0x01], Some([0xffu8; 12]));
        let packet = wire::decode(&bytes).unwrap().unwrap();
        assert!(!verify_authenticated_payload(&session, &packet));
    }
}
