//! Persistence backends the `outpost-core` adapter traits are implemented
//! against: a hand-rolled RESP client for the hot key-value store, and a
//! structured-log stand-in for the cold column store.
//!
//! `outpost-core::persistence` only depends on the `HotStore`/`ColdStore`
//! seams; this module is where the binary plugs in the real network
//! clients, the way the config's redis/scylla host/port flags imply.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use log::{debug, warn};
use outpost_core::{
    ban_key, position_key, session_key, zone_players_key, zone_status_key, ColdStore, CombatEventRow, HotStore, HotWrite,
    PersistenceError, PlayerCombatStatsRow,
};

/// Blocking RESP-protocol client. Minimal on purpose: `SET`, `SADD`, and
/// `PING` are all the hot store needs for session/position/zone-status
/// writes and connection health checks.
pub struct RedisHotStore {
    stream: TcpStream,
}

impl RedisHotStore {
    pub fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_write_timeout(Some(Duration::from_secs(2)))?;
        stream.set_read_timeout(Some(Duration::from_secs(2)))?;
        Ok(Self { stream })
    }

    fn send_command(&mut self, args: &[&[u8]]) -> std::io::Result<String> {
        let mut frame = format!("*{}\r\n", args.len()).into_bytes();
        for arg in args {
            frame.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            frame.extend_from_slice(arg);
            frame.extend_from_slice(b"\r\n");
        }
        self.stream.write_all(&frame)?;
        read_reply_line(&mut self.stream)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        self.send_command(&[b"SET", key.as_bytes(), value])
            .map(|_| ())
            .map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    fn sadd(&mut self, key: &str, member: &str) -> Result<(), PersistenceError> {
        self.send_command(&[b"SADD", key.as_bytes(), member.as_bytes()])
            .map(|_| ())
            .map_err(|e| PersistenceError::Serialization(e.to_string()))
    }
}

fn read_reply_line(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

impl HotStore for RedisHotStore {
    fn write(&mut self, write: HotWrite) -> Result<(), PersistenceError> {
        match write {
            HotWrite::Session { player_id, value } => self.set(&session_key(player_id), &value),
            HotWrite::Position { player_id, position } => {
                let value = format!("{},{},{}", position.x, position.y, position.z);
                self.set(&position_key(player_id), value.as_bytes())
            }
            HotWrite::ZoneStatus { zone_id, value } => self.set(&zone_status_key(zone_id), &value),
            HotWrite::Ban { player_id, reason } => self.set(&ban_key(player_id), reason.as_bytes()),
        }
    }
}

/// Adds a player to a zone's membership set; called outside the
/// fire-and-forget `HotWrite` path because it's a structural join, not a
/// per-tick value overwrite.
pub fn record_zone_membership(store: &mut RedisHotStore, zone_id: u32, player_id: u64) -> Result<(), PersistenceError> {
    store.sadd(&zone_players_key(zone_id), &player_id.to_string())
}

/// Stand-in cold store: every row is logged at `info` level with the same
/// fields a CQL `INSERT`/`UPSERT` would carry. No column-store driver lives
/// in the dependency stack this binary draws from; wiring a real ScyllaDB
/// session is the integration point this type marks.
#[derive(Default)]
pub struct LoggingColdStore;

impl ColdStore for LoggingColdStore {
    fn insert_combat_event(&mut self, row: CombatEventRow) -> Result<(), PersistenceError> {
        log::info!(
            "combat_event attacker={} target={} damage={} critical={} ts={}",
            row.attacker, row.target, row.damage, row.was_critical, row.timestamp_ms
        );
        Ok(())
    }

    fn upsert_player_combat_stats(&mut self, row: PlayerCombatStatsRow) -> Result<(), PersistenceError> {
        log::info!(
            "player_combat_stats player={} dealt={} taken={} kills={} deaths={}",
            row.player_id, row.damage_dealt, row.damage_taken, row.kills, row.deaths
        );
        Ok(())
    }
}

/// One cross-zone pub/sub message as delivered to the reader thread, still
/// framed with the channel name it arrived on.
pub struct SubscribedMessage {
    pub channel: String,
    pub payload: Vec<u8>,
}

/// Subscribes to the given channels over RESP `SUBSCRIBE` and returns a
/// blocking iterator-like reader that yields decoded `message` pushes.
/// Connection loss surfaces as an `Err` so the caller's reconnect loop can
/// back off and retry rather than spin.
pub struct RedisSubscriber {
    reader: BufReader<TcpStream>,
}

impl RedisSubscriber {
    pub fn connect(host: &str, port: u16, channels: &[String]) -> std::io::Result<Self> {
        let mut stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(Some(Duration::from_millis(500)))?;
        let mut args: Vec<Vec<u8>> = vec![b"SUBSCRIBE".to_vec()];
        args.extend(channels.iter().map(|c| c.clone().into_bytes()));
        let mut frame = format!("*{}\r\n", args.len()).into_bytes();
        for arg in &args {
            frame.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            frame.extend_from_slice(arg);
            frame.extend_from_slice(b"\r\n");
        }
        stream.write_all(&frame)?;
        Ok(Self { reader: BufReader::new(stream) })
    }

    /// Reads and decodes the next RESP array reply. Returns `Ok(None)` on a
    /// read timeout (no message pending) rather than blocking forever, so
    /// the caller's loop can check the shutdown flag between polls.
    pub fn next_message(&mut self) -> std::io::Result<Option<SubscribedMessage>> {
        let mut header = String::new();
        match self.reader.read_line(&mut header) {
            Ok(0) => return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed")),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
            Err(e) => return Err(e),
        }
        if !header.starts_with('*') {
            return Ok(None);
        }
        let count: usize = header.trim_start_matches('*').trim().parse().unwrap_or(0);
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.read_bulk_string()?);
        }
        if parts.len() == 3 && parts[0] == "message" {
            Ok(Some(SubscribedMessage { channel: parts[1].clone(), payload: parts[2].clone().into_bytes() }))
        } else {
            debug!("ignoring non-message pub/sub frame: {parts:?}");
            Ok(None)
        }
    }

    fn read_bulk_string(&mut self) -> std::io::Result<String> {
        let mut len_line = String::new();
        self.reader.read_line(&mut len_line)?;
        let len: i64 = len_line.trim_start_matches('$').trim().parse().unwrap_or(-1);
        if len < 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; len as usize + 2];
        self.reader.read_exact(&mut buf)?;
        buf.truncate(len as usize);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

pub fn publish(host: &str, port: u16, channel: &str, payload: &[u8]) -> std::io::Result<()> {
    let mut stream = TcpStream::connect((host, port))?;
    stream.set_write_timeout(Some(Duration::from_secs(1)))?;
    let mut frame = format!("*3\r\n${}\r\nPUBLISH\r\n${}\r\n{}\r\n${}\r\n", 7, channel.len(), channel, payload.len()).into_bytes();
    warn_if_weird_framing(&mut frame, channel, payload);
    stream.write_all(&frame)?;
    stream.write_all(payload)?;
    stream.write_all(b"\r\n")?;
    let _ = read_reply_line(&mut stream);
    Ok(())
}

fn warn_if_weird_framing(_frame: &mut [u8], _channel: &str, payload: &[u8]) {
    if payload.is_empty() {
        warn!("publishing empty cross-zone payload");
    }
}
