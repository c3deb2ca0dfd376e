//! Cross-zone messenger: typed pub/sub messages over the external hot-state
//! service, with the wire layout from the external-interfaces section.

use crate::error::PacketError;
use crate::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    EntitySync = 0,
    MigrationRequest = 1,
    MigrationState = 2,
    MigrationComplete = 3,
    Broadcast = 4,
    Chat = 5,
    ZoneStatus = 6,
}

impl MessageType {
    fn from_u8(v: u8) -> Result<Self, PacketError> {
        Ok(match v {
            0 => Self::EntitySync,
            1 => Self::MigrationRequest,
            2 => Self::MigrationState,
            3 => Self::MigrationComplete,
            4 => Self::Broadcast,
            5 => Self::Chat,
            6 => Self::ZoneStatus,
            other => return Err(PacketError::UnknownType(other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossZoneMessage {
    pub message_type: MessageType,
    pub source_zone: ZoneId,
    pub target_zone: ZoneId,
    pub sequence: u32,
    pub timestamp_ms: u32,
    pub payload: Vec<u8>,
}

/// `u8 type | u32 sourceZoneId | u32 targetZoneId | u32 sequence | u32
/// timestamp | u32 payloadLen | payload`, little-endian.
pub fn encode_message(msg: &CrossZoneMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(21 + msg.payload.len());
    buf.push(msg.message_type as u8);
    buf.extend_from_slice(&msg.source_zone.to_le_bytes());
    buf.extend_from_slice(&msg.target_zone.to_le_bytes());
    buf.extend_from_slice(&msg.sequence.to_le_bytes());
    buf.extend_from_slice(&msg.timestamp_ms.to_le_bytes());
    buf.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&msg.payload);
    buf
}

pub fn decode_message(bytes: &[u8]) -> Result<CrossZoneMessage, PacketError> {
    if bytes.len() < 21 {
        return Err(PacketError::Truncated { needed: 21, available: bytes.len() });
    }
    let message_type = MessageType::from_u8(bytes[0])?;
    let source_zone = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
    let target_zone = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
    let sequence = u32::from_le_bytes(bytes[9..13].try_into().unwrap());
    let timestamp_ms = u32::from_le_bytes(bytes[13..17].try_into().unwrap());
    let payload_len = u32::from_le_bytes(bytes[17..21].try_into().unwrap()) as usize;
    if bytes.len() < 21 + payload_len {
        return Err(PacketError::Truncated { needed: 21 + payload_len, available: bytes.len() });
    }
    let payload = bytes[21..21 + payload_len].to_vec();
    Ok(CrossZoneMessage { message_type, source_zone, target_zone, sequence, timestamp_ms, payload })
}

pub fn directed_channel(zone: ZoneId) -> String {
    format!("zone:{zone}:messages")
}

pub const BROADCAST_CHANNEL: &str = "zone:broadcast";

/// Per-source-zone sequence tracker enforcing in-order delivery; the
/// pub/sub layer is assumed to guarantee per-channel FIFO, but this guards
/// against reordering if a transport only offers best-effort ordering.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    last_seen: std::collections::HashMap<ZoneId, u32>,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `msg` is in order and should be processed now;
    /// `false` if it arrived out of order and should be buffered/discarded.
    pub fn accept(&mut self, msg: &CrossZoneMessage) -> bool {
        match self.last_seen.get(&msg.source_zone) {
            Some(&last) if msg.sequence <= last => false,
            _ => {
                self.last_seen.insert(msg.source_zone, msg.sequence);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_roundtrips() {
        let msg = CrossZoneMessage {
            message_type: MessageType::EntitySync,
            source_zone: 1,
            target_zone: 2,
            sequence: 5,
            timestamp_ms: 12345,
            payload: vec![1, 2, 3, 4],
        };
        let bytes = encode_message(&msg);
        let decoded = decode_message(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn truncated_payload_fails_cleanly() {
        let mut bytes = encode_message(&CrossZoneMessage {
            message_type: MessageType::Chat,
            source_zone: 0,
            target_zone: 0,
            sequence: 0,
            timestamp_ms: 0,
            payload: vec![1, 2, 3],
        });
        bytes.truncate(bytes.len() - 1);
        assert!(decode_message(&bytes).is_err());
    }

    #[test]
    fn channel_names_match_convention() {
        assert_eq!(directed_channel(5), "zone:5:messages");
        assert_eq!(BROADCAST_CHANNEL, "zone:broadcast");
    }

    #[test]
    fn sequence_guard_rejects_out_of_order() {
        let mut guard = SequenceGuard::new();
        let msg = |seq| CrossZoneMessage { message_type: MessageType::EntitySync, source_zone: 1, target_zone: 2, sequence: seq, timestamp_ms: 0, payload: vec![] };
        assert!(guard.accept(&msg(1)));
        assert!(guard.accept(&msg(2)));
        assert!(!guard.accept(&msg(2)));
        assert!(!guard.accept(&msg(1)));
        assert!(guard.accept(&msg(3)));
    }
}
