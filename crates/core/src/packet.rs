//! Client wire protocol framing: the one-byte `PacketType` prefix and the
//! handshake negotiation, matching the byte-exact external interface (not
//! the hand-rolled framing `messenger.rs` uses for cross-process payloads).

use crate::error::PacketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    ClientInput = 1,
    ServerSnapshot = 2,
    ReliableEvent = 3,
    Ping = 4,
    Handshake = 5,
    Disconnect = 6,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Result<Self, PacketError> {
        Ok(match v {
            1 => Self::ClientInput,
            2 => Self::ServerSnapshot,
            3 => Self::ReliableEvent,
            4 => Self::Ping,
            5 => Self::Handshake,
            6 => Self::Disconnect,
            other => return Err(PacketError::UnknownType(other)),
        })
    }

    pub fn is_reliable(self) -> bool {
        matches!(self, Self::ReliableEvent | Self::Handshake | Self::Disconnect)
    }
}

/// Splits the one-byte type prefix from the remainder of a raw datagram.
pub fn split_packet(raw: &[u8]) -> Result<(PacketType, &[u8]), PacketError> {
    if raw.is_empty() {
        return Err(PacketError::Truncated { needed: 1, available: 0 });
    }
    let packet_type = PacketType::from_u8(raw[0])?;
    Ok((packet_type, &raw[1..]))
}

pub fn frame_packet(packet_type: PacketType, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(packet_type as u8);
    buf.extend_from_slice(payload);
    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    /// Exact major match, client minor must be at or above server minor.
    pub fn is_compatible_with(&self, server: ProtocolVersion) -> bool {
        self.major == server.major && self.minor >= server.minor
    }
}

#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    pub protocol_version: ProtocolVersion,
    pub auth_token: String,
    pub username: String,
}

#[derive(Debug, Clone)]
pub enum HandshakeResponse {
    Accepted { entity_id: u32, spawn_pos: crate::fixed::FixedVec3, server_tick: u32 },
    Rejected { reason: String },
}

pub fn negotiate_handshake(
    request: &HandshakeRequest,
    server_version: ProtocolVersion,
    accept: impl FnOnce(&HandshakeRequest) -> Result<(u32, crate::fixed::FixedVec3, u32), String>,
) -> HandshakeResponse {
    if !request.protocol_version.is_compatible_with(server_version) {
        return HandshakeResponse::Rejected {
            reason: format!(
                "protocol version {}.{} incompatible with server {}.{}",
                request.protocol_version.major, request.protocol_version.minor, server_version.major, server_version.minor
            ),
        };
    }
    match accept(request) {
        Ok((entity_id, spawn_pos, server_tick)) => HandshakeResponse::Accepted { entity_id, spawn_pos, server_tick },
        Err(reason) => HandshakeResponse::Rejected { reason },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FixedVec3;

    #[test]
    fn split_and_frame_roundtrip() {
        let framed = frame_packet(PacketType::Ping, &[1, 2, 3]);
        let (ty, payload) = split_packet(&framed).unwrap();
        assert_eq!(ty, PacketType::Ping);
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn empty_packet_is_truncated() {
        assert!(split_packet(&[]).is_err());
    }

    #[test]
    fn unknown_type_byte_rejected() {
        assert!(split_packet(&[200]).is_err());
    }

    #[test]
    fn minor_version_mismatch_requires_client_at_or_above_server() {
        let server = ProtocolVersion { major: 1, minor: 2 };
        assert!(ProtocolVersion { major: 1, minor: 3 }.is_compatible_with(server));
        assert!(ProtocolVersion { major: 1, minor: 2 }.is_compatible_with(server));
        assert!(!ProtocolVersion { major: 1, minor: 1 }.is_compatible_with(server));
        assert!(!ProtocolVersion { major: 2, minor: 2 }.is_compatible_with(server));
    }

    #[test]
    fn incompatible_handshake_is_rejected_with_reason() {
        let request = HandshakeRequest { protocol_version: ProtocolVersion { major: 0, minor: 9 }, auth_token: "t".into(), username: "u".into() };
        let response = negotiate_handshake(&request, ProtocolVersion { major: 1, minor: 0 }, |_| Ok((1, FixedVec3::ZERO, 0)));
        assert!(matches!(response, HandshakeResponse::Rejected { .. }));
    }

    #[test]
    fn compatible_handshake_accepts() {
        let request = HandshakeRequest { protocol_version: ProtocolVersion { major: 1, minor: 0 }, auth_token: "t".into(), username: "u".into() };
        let response = negotiate_handshake(&request, ProtocolVersion { major: 1, minor: 0 }, |_| Ok((42, FixedVec3::ZERO, 100)));
        assert!(matches!(response, HandshakeResponse::Accepted { entity_id: 42, .. }));
    }
}
