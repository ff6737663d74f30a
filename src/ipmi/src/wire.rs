// SPDX-License-Identifier: Apache-2.0

//! RMCP framing and the IPMI v2.0/RMCP+ session header, decoupled from the UDP
//! socket so the codec is unit-testable on byte slices alone.

use crate::error::IpmiError;

/// RMCP header version byte, fixed at 0x06 for every released RMCP revision.
pub const RMCP_VERSION: u8 = 0x06;
/// RMCP sequence number meaning "no ACK requested", used on every IPMI-class packet.
pub const RMCP_SEQUENCE_NO_ACK: u8 = 0xff;
/// RMCP class byte identifying an IPMI payload (ASF RFC 4's RMCP class for IPMI).
pub const RMCP_CLASS_IPMI: u8 = 0x07;

/// Auth type byte indicating the IPMI v2.0/RMCP+ session format, as opposed to legacy 1.5 auth
/// types. This bridge only ever emits and accepts this value, supporting 2.0 exclusively.
pub const AUTH_TYPE_RMCP_PLUS: u8 = 0x06;

/// HMAC-SHA1-96 integrity pad trailer marker.
const NEXT_HEADER_IPMI: u8 = 0x07;

/// IPMI 2.0 session payload type, the low 6 bits of the payload-type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    /// A NetFn/Cmd IPMI message.
    IpmiMessage,
    /// RMCP+ Open Session Request.
    OpenSessionRequest,
    /// RMCP+ Open Session Response.
    OpenSessionResponse,
    /// RAKP Message 1.
    Rakp1,
    /// RAKP Message 2.
    Rakp2,
    /// RAKP Message 3.
    Rakp3,
    /// RAKP Message 4.
    Rakp4,
}

impl PayloadType {
    fn from_code(code: u8) -> Result<Self, IpmiError> {
        match code {
            0x00 => Ok(Self::IpmiMessage),
            0x10 => Ok(Self::OpenSessionRequest),
            0x11 => Ok(Self::OpenSessionResponse),
            0x12 => Ok(Self::Rakp1),
            0x13 => Ok(Self::Rakp2),
            0x14 => Ok(Self::Rakp3),
            0x15 => Ok(Self::Rakp4),
            other => Err(IpmiError::ProtocolMalformed(format!(
                "unsupported payload type {other:#04x}"
            ))),
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::IpmiMessage => 0x00,
            Self::OpenSessionRequest => 0x10,
            Self::OpenSessionResponse => 0x11,
            Self::Rakp1 => 0x12,
            Self::Rakp2 => 0x13,
            Self::Rakp3 => 0x14,
            Self::Rakp4 => 0x15,
        }
    }
}

/// A decoded IPMI v2.0 session header plus its payload, with the authenticated trailer (if any)
/// already stripped off and handed back separately for verification by [`crate::crypto`].
#[derive(Debug, Clone)]
pub struct SessionPacket {
    /// Whether the payload-type byte's "encrypted" bit was set.
    pub encrypted: bool,
    /// Whether the payload-type byte's "authenticated" bit was set.
    pub authenticated: bool,
    /// Decoded payload type.
    pub payload_type: PayloadType,
    /// Session ID, `0` for pre-session packets.
    pub session_id: u32,
    /// Session sequence number, `0` for pre-session packets.
    pub session_seq: u32,
    /// The payload bytes (decrypted already, if `encrypted` was set — decryption happens one
    /// layer up where the session's confidentiality key is available).
    pub payload: Vec<u8>,
    /// Raw authentication code bytes trailing the payload, if `authenticated`.
    pub auth_code: Option<[u8; 12]>,
    /// Everything from the start of the auth-type byte through the end of the payload,
    /// excluding the integrity pad/trailer — this is exactly what the auth code is computed
    /// over, handed back so the caller can re-verify without re-serializing.
    pub authenticated_span: Vec<u8>,
}

/// Encodes a full RMCP + IPMI v2.0 session packet, appending an integrity trailer when
/// `auth_code` is supplied.
pub fn encode(
    payload_type: PayloadType,
    authenticated: bool,
    session_id: u32,
    session_seq: u32,
    payload: &[u8],
    auth_code: Option<[u8; 12]>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + payload.len() + 14);
    out.push(RMCP_VERSION);
    out.push(0x00);
    out.push(RMCP_SEQUENCE_NO_ACK);
    out.push(RMCP_CLASS_IPMI);

    out.push(AUTH_TYPE_RMCP_PLUS);
    let mut type_byte = payload_type.code();
    if authenticated {
        type_byte |= 0x40;
    }
    out.push(type_byte);
    out.extend_from_slice(&session_id.to_le_bytes());
    out.extend_from_slice(&session_seq.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);

    if let Some(code) = auth_code {
        // Pad to a 4-byte boundary, per the IPMI 2.0 trailer format; the bridge always sends
        // zero-length pads since nothing downstream requires alignment beyond what's already
        // naturally aligned.
        out.push(0x00);
        out.push(NEXT_HEADER_IPMI);
        out.extend_from_slice(&code);
    }

    out
}

/// Decodes an RMCP + IPMI v2.0 session packet. Returns `Ok(None)` for frames that parse as valid
/// RMCP but a non-IPMI class (silently dropped), and `Err` for anything
/// that fails to parse as RMCP at all.
pub fn decode(datagram: &[u8]) -> Result<Option<SessionPacket>, IpmiError> {
    if datagram.len() < 4 {
        return Err(IpmiError::ProtocolMalformed("datagram shorter than RMCP header".to_string()));
    }
    let (version, _reserved, _sequence, class) =
        (datagram[0], datagram[1], datagram[2], datagram[3]);
    if version != RMCP_VERSION {
        return Err(IpmiError::ProtocolMalformed(format!(
            "unsupported RMCP version {version:#04x}"
        )));
    }
    if class != RMCP_CLASS_IPMI {
        return Ok(None);
    }

    let body = &datagram[4..];
    if body.len() < 10 {
        return Err(IpmiError::ProtocolMalformed("session header truncated".to_string()));
    }
    let auth_type = body[0];
    if auth_type != AUTH_TYPE_RMCP_PLUS {
        return Err(IpmiError::ProtocolMalformed(format!(
            "unsupported auth type {auth_type:#04x}, only IPMI 2.0/RMCP+ is accepted"
        )));
    }
    let type_byte = body[1];
    let encrypted = type_byte & 0x80 != 0;
    let authenticated = type_byte & 0x40 != 0;
    let payload_type = PayloadType::from_code(type_byte & 0x3f)?;

    let session_id = u32::from_le_bytes(body[2..6].try_into().unwrap());
    let session_seq = u32::from_le_bytes(body[6..10].try_into().unwrap());
    let payload_len_bytes = body
        .get(10..12)
        .ok_or_else(|| IpmiError::ProtocolMalformed("missing payload length field".to_string()))?;
    let payload_len = u16::from_le_bytes(payload_len_bytes.try_into().unwrap()) as usize;

    let payload_start = 12;
    let payload_end = payload_start
        .checked_add(payload_len)
        .filter(|&end| end <= body.len())
        .ok_or_else(|| IpmiError::ProtocolMalformed("payload length exceeds datagram".to_string()))?;
    let payload = body[payload_start..payload_end].to_vec();
    let authenticated_span = body[..payload_end].to_vec();

    let trailer = &body[payload_end..];
    let auth_code = if authenticated {
        if trailer.len() < 14 {
            return Err(IpmiError::ProtocolMalformed(
                "authenticated packet missing integrity trailer".to_string(),
            ));
        }
        let code_start = trailer.len() - 12;
        let mut code = [0u8; 12];
        code.copy_from_slice(&trailer[code_start..]);
        Some(code)
    } else {
        None
    };

    Ok(Some(SessionPacket {
        encrypted,
        authenticated,
        payload_type,
        session_id,
        session_seq,
        payload,
        auth_code,
        authenticated_span,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_round_trip() {
        let payload = vec![0x20, 0x18, 0xc8, 0x81, 0x04, 0x01, 0x5a];
        let bytes = encode(PayloadType::IpmiMessage, false, 0, 0, &payload, None);
        let decoded = decode(&bytes).unwrap().unwrap();
        assert!(!decoded.authenticated);
        assert_eq!(decoded.payload_type, PayloadType::IpmiMessage);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn authenticated_round_trip_preserves_auth_code() {
        let payload = vec![0xaa, 0xbb, 0xcc];
        let code = [7u8; 12];
        let bytes = encode(
            PayloadType::IpmiMessage,
            true,
            0x1234_5678,
            42,
            &payload,
            Some(code),
        );
        let decoded = decode(&bytes).unwrap().unwrap();
        assert!(decoded.authenticated);
        assert_eq!(decoded.session_id, 0x1234_5678);
        assert_eq!(decoded.session_seq, 42);
        assert_eq!(decoded.auth_code, Some(code));
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn non_ipmi_rmcp_class_is_dropped_silently() {
        let bytes = [RMCP_VERSION, 0x00, RMCP_SEQUENCE_NO_ACK, 0x06];
        assert!(decode(&bytes).unwrap().is_none());
    }

    #[test]
    fn wrong_rmcp_version_is_rejected() {
        let bytes = [0x05, 0x00, RMCP_SEQUENCE_NO_ACK, RMCP_CLASS_IPMI];
        assert!(matches!(
            decode(&bytes),
            Err(IpmiError::ProtocolMalformed(_))
        ));
    }

    #[test]
    fn truncated_datagram_is_rejected() {
        assert!(matches!(decode(&[0x06, 0x00]), Err(IpmiError::ProtocolMalformed(_))));
    }
}
