//! Typed errors per fallible subsystem, following the granularity of the
//! teacher's `PacketError`: one enum per concern, `thiserror`-derived.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("buffer truncated: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("unknown packet type byte {0}")]
    UnknownType(u8),
    #[error("packet size {size} outside [{min}, {max}]")]
    SizeOutOfBounds { size: usize, min: usize, max: usize },
    #[error("protocol version mismatch: major {client_major} != {server_major}")]
    VersionMismatch { client_major: u16, server_major: u16 },
    #[error("invalid position delta tag {0}")]
    InvalidDeltaTag(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("baseline tick {0} not found in snapshot history")]
    BaselineUnavailable(u64),
    #[error(transparent)]
    Packet(#[from] PacketError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("migration for entity {0} already in progress")]
    AlreadyInProgress(u32),
    #[error("no active migration for entity {0}")]
    NoActiveMigration(u32),
    #[error("duplicate migration message (zone {0}, sequence {1}) dropped")]
    DuplicateDropped(u32, u64),
    #[error("migration for entity {0} timed out after {1} ms")]
    TimedOut(u32, u64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandoffError {
    #[error("no target zone found for projected position")]
    NoTargetZone,
    #[error("handoff token invalid for entity {0}")]
    InvalidToken(u32),
    #[error("handoff for player {0} not in progress")]
    NotInProgress(u64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("circuit breaker open, write dropped")]
    CircuitOpen,
    #[error("serialization failed: {0}")]
    Serialization(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("value out of bounds: {0}")]
    OutOfBounds(String),
    #[error("string rejected: {0}")]
    StringRejected(String),
    #[error("input sequence {got} not greater than last {last}")]
    SequenceNotMonotone { last: u32, got: u32 },
    #[error("input sequence delta {0} outside allowed range")]
    SequenceDeltaOutOfRange(u32),
}
