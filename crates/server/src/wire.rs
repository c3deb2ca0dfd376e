//! Byte encodings for the client-facing payloads that the wire-layout
//! section leaves unspecified beyond "serialized InputState" / a
//! `{protocolVersion, authToken, username}` triple. Framed the same way
//! `outpost_core::packet` frames the type byte: explicit little-endian
//! reader/writer helpers, no serde.

use outpost_core::{CorePacketError as PacketError, FixedVec3, HandshakeRequest, HandshakeResponse, InputFlags, ProtocolVersion};

pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }
    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }
    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    pub fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    pub fn str16(&mut self, s: &str) {
        self.u16(s.len() as u16);
        self.buf.extend_from_slice(s.as_bytes());
    }
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn need(&self, n: usize) -> Result<(), PacketError> {
        if self.pos + n > self.buf.len() {
            Err(PacketError::Truncated { needed: self.pos + n, available: self.buf.len() })
        } else {
            Ok(())
        }
    }

    pub fn u8(&mut self) -> Result<u8, PacketError> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }
    pub fn u16(&mut self) -> Result<u16, PacketError> {
        self.need(2)?;
        let v = u16::from_le_bytes(self.buf[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        Ok(v)
    }
    pub fn u32(&mut self) -> Result<u32, PacketError> {
        self.need(4)?;
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }
    pub fn i32(&mut self) -> Result<i32, PacketError> {
        self.need(4)?;
        let v = i32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }
    pub fn f32(&mut self) -> Result<f32, PacketError> {
        self.need(4)?;
        let v = f32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }
    pub fn str16(&mut self) -> Result<String, PacketError> {
        let len = self.u16()? as usize;
        self.need(len)?;
        let s = String::from_utf8_lossy(&self.buf[self.pos..self.pos + len]).into_owned();
        self.pos += len;
        Ok(s)
    }
}

/// Wire form of `InputState`: flags, view angles, sequence, client send time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputWire {
    pub flags: InputFlags,
    pub yaw: f32,
    pub pitch: f32,
    pub sequence: u32,
    pub client_timestamp_ms: u32,
}

pub fn encode_input(input: &InputWire) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u16(input.flags.bits());
    w.f32(input.yaw);
    w.f32(input.pitch);
    w.u32(input.sequence);
    w.u32(input.client_timestamp_ms);
    w.into_vec()
}

pub fn decode_input(bytes: &[u8]) -> Result<InputWire, PacketError> {
    let mut r = ByteReader::new(bytes);
    let flags = InputFlags::from_bits_truncate(r.u16()?);
    let yaw = r.f32()?;
    let pitch = r.f32()?;
    let sequence = r.u32()?;
    let client_timestamp_ms = r.u32()?;
    Ok(InputWire { flags, yaw, pitch, sequence, client_timestamp_ms })
}

pub fn encode_handshake_request(req: &HandshakeRequest) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u16(req.protocol_version.major);
    w.u16(req.protocol_version.minor);
    w.str16(&req.auth_token);
    w.str16(&req.username);
    w.into_vec()
}

pub fn decode_handshake_request(bytes: &[u8]) -> Result<HandshakeRequest, PacketError> {
    let mut r = ByteReader::new(bytes);
    let major = r.u16()?;
    let minor = r.u16()?;
    let auth_token = r.str16()?;
    let username = r.str16()?;
    Ok(HandshakeRequest { protocol_version: ProtocolVersion { major, minor }, auth_token, username })
}

pub fn encode_handshake_response(resp: &HandshakeResponse) -> Vec<u8> {
    let mut w = ByteWriter::new();
    match resp {
        HandshakeResponse::Accepted { entity_id, spawn_pos, server_tick } => {
            w.u8(1);
            w.u32(*entity_id);
            w.i32(spawn_pos.x);
            w.i32(spawn_pos.y);
            w.i32(spawn_pos.z);
            w.u32(*server_tick);
        }
        HandshakeResponse::Rejected { reason } => {
            w.u8(0);
            w.str16(reason);
        }
    }
    w.into_vec()
}

#[allow(dead_code)]
pub fn decode_handshake_response(bytes: &[u8]) -> Result<HandshakeResponse, PacketError> {
    let mut r = ByteReader::new(bytes);
    match r.u8()? {
        1 => {
            let entity_id = r.u32()?;
            let spawn_pos = FixedVec3::new(r.i32()?, r.i32()?, r.i32()?);
            let server_tick = r.u32()?;
            Ok(HandshakeResponse::Accepted { entity_id, spawn_pos, server_tick })
        }
        _ => Ok(HandshakeResponse::Rejected { reason: r.str16()? }),
    }
}

/// Payload carried inside a `ReliableEvent` packet: the small set of
/// player-initiated actions that aren't part of the per-tick input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Attack { weapon: u8 },
    Chat { message: String },
    AckHandoff { token: String },
}

pub fn encode_command(cmd: &ClientCommand) -> Vec<u8> {
    let mut w = ByteWriter::new();
    match cmd {
        ClientCommand::Attack { weapon } => {
            w.u8(1);
            w.u8(*weapon);
        }
        ClientCommand::Chat { message } => {
            w.u8(2);
            w.str16(message);
        }
        ClientCommand::AckHandoff { token } => {
            w.u8(3);
            w.str16(token);
        }
    }
    w.into_vec()
}

pub fn decode_command(bytes: &[u8]) -> Result<ClientCommand, PacketError> {
    let mut r = ByteReader::new(bytes);
    match r.u8()? {
        1 => Ok(ClientCommand::Attack { weapon: r.u8()? }),
        2 => Ok(ClientCommand::Chat { message: r.str16()? }),
        3 => Ok(ClientCommand::AckHandoff { token: r.str16()? }),
        other => Err(PacketError::UnknownType(other)),
    }
}

/// Server-authority correction, sent over the same `ReliableEvent` channel
/// as `ClientCommand` but in the other direction: the client must snap to
/// `position`/`velocity` and resume input replay from
/// `last_processed_input_sequence`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerCorrection {
    pub server_tick: u32,
    pub position: FixedVec3,
    pub velocity: FixedVec3,
    pub last_processed_input_sequence: u32,
}

pub fn encode_correction(c: &ServerCorrection) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u8(4);
    w.u32(c.server_tick);
    w.i32(c.position.x);
    w.i32(c.position.y);
    w.i32(c.position.z);
    w.i32(c.velocity.x);
    w.i32(c.velocity.y);
    w.i32(c.velocity.z);
    w.u32(c.last_processed_input_sequence);
    w.into_vec()
}

pub fn decode_correction(bytes: &[u8]) -> Result<ServerCorrection, PacketError> {
    let mut r = ByteReader::new(bytes);
    match r.u8()? {
        4 => Ok(ServerCorrection {
            server_tick: r.u32()?,
            position: FixedVec3::new(r.i32()?, r.i32()?, r.i32()?),
            velocity: FixedVec3::new(r.i32()?, r.i32()?, r.i32()?),
            last_processed_input_sequence: r.u32()?,
        }),
        other => Err(PacketError::UnknownType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_roundtrips() {
        let input = InputWire { flags: InputFlags::FORWARD | InputFlags::SPRINT, yaw: 1.5, pitch: -0.2, sequence: 42, client_timestamp_ms: 123_456 };
        let bytes = encode_input(&input);
        let decoded = decode_input(&bytes).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn handshake_request_roundtrips() {
        let req = HandshakeRequest { protocol_version: ProtocolVersion { major: 1, minor: 0 }, auth_token: "tok".into(), username: "Aldric".into() };
        let bytes = encode_handshake_request(&req);
        let decoded = decode_handshake_request(&bytes).unwrap();
        assert_eq!(decoded.auth_token, req.auth_token);
        assert_eq!(decoded.username, req.username);
    }

    #[test]
    fn handshake_response_roundtrips() {
        let resp = HandshakeResponse::Accepted { entity_id: 7, spawn_pos: FixedVec3::new(1, 2, 3), server_tick: 99 };
        let bytes = encode_handshake_response(&resp);
        let decoded = decode_handshake_response(&bytes).unwrap();
        assert!(matches!(decoded, HandshakeResponse::Accepted { entity_id: 7, server_tick: 99, .. }));
    }

    #[test]
    fn command_roundtrips() {
        let cmd = ClientCommand::Chat { message: "gg".into() };
        let bytes = encode_command(&cmd);
        assert_eq!(decode_command(&bytes).unwrap(), cmd);
    }

    #[test]
    fn correction_roundtrips() {
        let correction = ServerCorrection {
            server_tick: 500,
            position: FixedVec3::new(1, 2, 3),
            velocity: FixedVec3::new(-4, 0, 4),
            last_processed_input_sequence: 77,
        };
        let bytes = encode_correction(&correction);
        assert_eq!(decode_correction(&bytes).unwrap(), correction);
    }
}
