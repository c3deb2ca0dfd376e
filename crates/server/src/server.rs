//! `ZoneServer`: owns the simulation thread and wires every `outpost-core`
//! subsystem into the per-tick pipeline. Background threads (transport
//! poll, persistence drain, cross-zone subscriber) only ever touch their
//! own mutex-guarded queue or lock-free metrics; the simulation thread
//! never blocks on I/O.

use std::collections::{HashMap, VecDeque};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use outpost_core::{
    apply_regen, calculate_priorities, clamp_rotation, decode_message, directed_channel,
    encode_delta_snapshot, encode_full_snapshot, field_culling_for_tier, frame_packet,
    negotiate_handshake, new_circuit_breaker, process_attack, rewind_candidates, split_packet,
    target_velocity, validate_input_sequence, validate_movement, validate_player_name,
    AntiCheatState, AuraProjectionManager, BehaviorProfile, CircuitBreaker,
    ClientPacketType as PacketType, CombatEventRow, CombatState, ConnectionThrottler,
    CrossZoneMessage, Entity, EntityId, EntityMigrationManager, EntitySnapshot,
    EntitySnapshotState, FixedVec3, FixedTimestep, HandoffPhase, HandshakeRequest,
    HandshakeResponse, HotWrite, InputState, IpAddr as ZoneIpAddr, IpAllowList, MessageType,
    MigrationState, NetworkState, PlayerInfo, PositionHistory, ProtocolVersion, QosController,
    ReplicationTracker, Rotation, SequenceGuard, TickArena, TokenBucket, TrafficAnalyzer,
    WeaponKind, World, WorldPartition, WriteQueue, ZoneConfig, ZoneHandoffController, ZoneId,
    ZoneMetrics,
};

use outpost_core::ColdStore;

use crate::config::ServerConfig;
use crate::store::{publish, LoggingColdStore, RedisHotStore};
use crate::wire::{
    decode_command, decode_handshake_request, decode_input, encode_command, encode_correction,
    encode_handshake_response, encode_input, ClientCommand, InputWire, ServerCorrection,
};

const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion { major: 1, minor: 0 };
const CONNECTION_TIMEOUT_MS: u64 = 15_000;

/// Scratch-arena budget per candidate entity for one attack's rewind
/// buffer (`EntityId` + `&PositionHistory` + team + alive flag, rounded up).
const ATTACK_SCRATCH_BYTES_PER_ENTITY: usize = 48;
/// Scratch-arena budget per entity for one tick's replication candidate
/// list and snapshot-state map.
const REPLICATION_SCRATCH_BYTES_PER_ENTITY: usize = 64;

/// Lifecycle state of one client connection. Handshake must complete
/// before any `ClientInput`/`ReliableEvent` packet is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Connected,
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub connection_id: u32,
    pub addr: SocketAddr,
    pub player_id: u64,
    pub entity: EntityId,
    pub state: ConnectionState,
    pub last_seen_ms: u64,
    pub last_input_sequence: u32,
    pub rtt_ms: u32,
    pub baseline_tick: u32,
}

/// Reasons a connection ends, mirrored to the client in the `Disconnect`
/// packet payload and to the ops log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Graceful,
    Timeout,
    Kicked,
    ProtocolError,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graceful => "graceful",
            Self::Timeout => "timeout",
            Self::Kicked => "kicked",
            Self::ProtocolError => "protocol_error",
        }
    }
}

/// Observable server-lifecycle events, drained by `main`/the TUI loop.
/// Kept deliberately small: the things an operator cares about, not a
/// full trace.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientConnected { connection_id: u32, addr: SocketAddr, entity: EntityId },
    ClientDisconnected { connection_id: u32, reason: DisconnectReason },
    ConnectionDenied { addr: SocketAddr, reason: String },
    ZoneHandoffCompleted { player_id: u64, target_zone: ZoneId },
    Error { message: String },
}

/// Point-in-time stats for the TUI/ops dashboard.
#[derive(Debug, Clone)]
pub struct ServerStats {
    pub zone_id: ZoneId,
    pub tick: u64,
    pub uptime_secs: u64,
    pub connected_players: i64,
    pub entities_active: i64,
    pub qos_level: &'static str,
    pub circuit_state: &'static str,
    pub snapshots_sent: u64,
    pub inputs_received: u64,
    pub inputs_dropped: u64,
    pub anticheat_violations: u64,
    pub migrations_completed: u64,
    pub migrations_failed: u64,
    pub write_queue_dropped: u64,
}

/// Owns every piece of per-zone simulation state. Constructed once per
/// process; `run()` drives the fixed-timestep loop until `running` flips
/// to `false`.
pub struct ZoneServer {
    socket: Arc<UdpSocket>,
    inbound: Arc<Mutex<VecDeque<(SocketAddr, Vec<u8>)>>>,
    cross_zone_inbound: Arc<Mutex<VecDeque<CrossZoneMessage>>>,
    write_queue: Arc<Mutex<WriteQueue<HotWrite>>>,
    running: Arc<AtomicBool>,
    metrics: Arc<ZoneMetrics>,

    zone_id: ZoneId,
    partition: WorldPartition,
    redis_host: String,
    redis_port: u16,

    world: World,
    spatial: outpost_core::SpatialHash,
    histories: HashMap<EntityId, PositionHistory>,
    behavior: HashMap<u64, BehaviorProfile>,
    replication: ReplicationTracker,
    snapshot_baselines: HashMap<(u32, u32), HashMap<EntityId, EntitySnapshotState>>,

    migrations: EntityMigrationManager,
    handoff: ZoneHandoffController,
    aura: AuraProjectionManager,
    sequence_guard: SequenceGuard,
    outbound_sequence: u32,

    throttler: ConnectionThrottler,
    ip_allow: IpAllowList,
    traffic: TrafficAnalyzer,
    breaker: CircuitBreaker,
    packet_buckets: HashMap<u32, TokenBucket>,

    connections: HashMap<u32, Connection>,
    addr_to_conn: HashMap<SocketAddr, u32>,
    next_connection_id: u32,
    next_player_id: u64,
    pending_commands: VecDeque<(u32, ClientCommand)>,

    timestep: FixedTimestep,
    qos: QosController,
    arena: TickArena,
    cfg: ZoneConfig,

    cold_store: LoggingColdStore,

    rng: StdRng,
    start: Instant,
    last_instant: Instant,
    tick: u64,
    events: VecDeque<ServerEvent>,
}

/// Handles for the three background threads `run()`/the TUI loop spawn
/// once at startup. `join()` is only meaningful after `running` flips to
/// `false` — the threads themselves poll that flag to exit.
pub struct BackgroundThreads {
    poll: thread::JoinHandle<()>,
    persistence: thread::JoinHandle<()>,
    subscriber: thread::JoinHandle<()>,
}

impl BackgroundThreads {
    pub fn join(self) {
        let _ = self.poll.join();
        let _ = self.persistence.join();
        let _ = self.subscriber.join();
    }
}

impl ZoneServer {
    pub fn new(config: &ServerConfig) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr())?;
        socket.set_nonblocking(false)?;
        let world_bounds = outpost_core::Rect {
            min_x: config.zone.world.world_min_x,
            max_x: config.zone.world.world_max_x,
            min_z: config.zone.world.world_min_z,
            max_z: config.zone.world.world_max_z,
        };
        let partition = WorldPartition::create_grid(world_bounds, 4, 4, config.network.port);

        Ok(Self {
            socket: Arc::new(socket),
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            cross_zone_inbound: Arc::new(Mutex::new(VecDeque::new())),
            write_queue: Arc::new(Mutex::new(WriteQueue::new(4096))),
            running: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(ZoneMetrics::new()),

            zone_id: config.zone_id,
            partition,
            redis_host: config.storage.redis_host.clone(),
            redis_port: config.storage.redis_port,

            world: World::new(),
            spatial: outpost_core::SpatialHash::new(config.zone.world.spatial_hash_cell_size),
            histories: HashMap::new(),
            behavior: HashMap::new(),
            replication: ReplicationTracker::new(),
            snapshot_baselines: HashMap::new(),

            migrations: EntityMigrationManager::new(config.zone.handoff.migration_timeout_ms),
            handoff: ZoneHandoffController::new(),
            aura: AuraProjectionManager::new(config.zone_id, config.zone.world.aura_buffer_meters),
            sequence_guard: SequenceGuard::new(),
            outbound_sequence: 0,

            throttler: ConnectionThrottler::new(),
            ip_allow: IpAllowList::new(),
            traffic: TrafficAnalyzer::new(),
            breaker: new_circuit_breaker(&config.zone.ddos),
            packet_buckets: HashMap::new(),

            connections: HashMap::new(),
            addr_to_conn: HashMap::new(),
            next_connection_id: 1,
            next_player_id: 1,
            pending_commands: VecDeque::new(),

            timestep: FixedTimestep::new(config.zone.tick.tick_rate_hz),
            qos: QosController::new(&config.zone.tick),
            arena: TickArena::new(config.zone.tick.tick_arena_bytes),
            cfg: config.zone,

            cold_store: LoggingColdStore::default(),

            rng: StdRng::from_os_rng(),
            start: Instant::now(),
            last_instant: Instant::now(),
            tick: 0,
            events: VecDeque::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.events.drain(..)
    }

    /// Spawns the transport-poll, persistence, and cross-zone subscriber
    /// background threads. Call once before driving ticks, whether via
    /// `run()` or by pumping `tick_if_due()` from an external loop (the TUI).
    pub fn spawn_background_threads(&self) -> BackgroundThreads {
        BackgroundThreads {
            poll: self.spawn_transport_thread(),
            persistence: self.spawn_persistence_thread(),
            subscriber: self.spawn_subscriber_thread(),
        }
    }

    /// Runs exactly the ticks the fixed timestep accumulator says are due
    /// given the wall-clock time elapsed since the last call, recording QoS
    /// and metrics for each. Safe to call from any loop cadence — the TUI's
    /// frame loop or `run()`'s own sleep loop.
    pub fn tick_if_due(&mut self, now: Instant) {
        let dt = (now - self.last_instant).as_secs_f32();
        self.last_instant = now;
        self.timestep.accumulate(dt);

        while self.timestep.consume_tick() {
            let tick_start = Instant::now();
            self.tick_once();
            let elapsed_us = tick_start.elapsed().as_micros() as u64;
            let budget_us = (1_000_000 / self.cfg.tick.tick_rate_hz as u64).max(1);
            self.qos.record_tick(elapsed_us > budget_us);
            self.metrics.ticks_run.increment();
            if elapsed_us > budget_us {
                self.metrics.tick_overruns.increment();
            }
        }
    }

    /// Spawns background threads and blocks on the fixed-timestep
    /// simulation loop until shutdown is requested. The headless entry
    /// point; the TUI entry point drives `tick_if_due` itself instead.
    pub fn run(&mut self) {
        let threads = self.spawn_background_threads();

        while self.running.load(Ordering::Relaxed) {
            self.tick_if_due(Instant::now());
            thread::sleep(Duration::from_millis(1));
        }

        info!("zone {} shutting down, draining connections", self.zone_id);
        self.shutdown_connections();
        threads.join();
    }

    fn spawn_transport_thread(&self) -> thread::JoinHandle<()> {
        let socket = self.socket.clone();
        let inbound = self.inbound.clone();
        let running = self.running.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 2048];
            socket
                .set_read_timeout(Some(Duration::from_millis(200)))
                .expect("set_read_timeout");
            while running.load(Ordering::Relaxed) {
                match socket.recv_from(&mut buf) {
                    Ok((n, addr)) => {
                        inbound.lock().unwrap().push_back((addr, buf[..n].to_vec()));
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => warn!("transport poll error: {e}"),
                }
            }
        })
    }

    fn spawn_persistence_thread(&self) -> thread::JoinHandle<()> {
        let write_queue = self.write_queue.clone();
        let running = self.running.clone();
        let redis_host = self.redis_host.clone();
        let redis_port = self.redis_port;
        let breaker_cfg = self.cfg.ddos;
        thread::spawn(move || {
            let mut breaker = new_circuit_breaker(&breaker_cfg);
            let mut store = match RedisHotStore::connect(&redis_host, redis_port) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("persistence thread: initial redis connect failed: {e}");
                    None
                }
            };
            while running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(50));
                let now_ms = now_ms();
                if store.is_none() {
                    store = RedisHotStore::connect(&redis_host, redis_port).ok();
                    continue;
                }
                let Some(s) = store.as_mut() else { continue };
                let mut queue = write_queue.lock().unwrap();
                let drained = queue.drain_into(s, &mut breaker, now_ms);
                if drained > 0 {
                    debug!("persistence: drained {drained} writes");
                }
            }
        })
    }

    fn spawn_subscriber_thread(&self) -> thread::JoinHandle<()> {
        let cross_zone_inbound = self.cross_zone_inbound.clone();
        let running = self.running.clone();
        let redis_host = self.redis_host.clone();
        let redis_port = self.redis_port;
        let zone_id = self.zone_id;
        thread::spawn(move || {
            let channels = vec![directed_channel(zone_id), outpost_core::BROADCAST_CHANNEL.to_string()];
            loop {
                if !running.load(Ordering::Relaxed) {
                    return;
                }
                let mut sub = match crate::store::RedisSubscriber::connect(&redis_host, redis_port, &channels) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("subscriber thread: connect failed: {e}");
                        thread::sleep(Duration::from_secs(1));
                        continue;
                    }
                };
                while running.load(Ordering::Relaxed) {
                    match sub.next_message() {
                        Ok(Some(msg)) => match decode_message(&msg.payload) {
                            Ok(decoded) => cross_zone_inbound.lock().unwrap().push_back(decoded),
                            Err(e) => warn!("cross-zone message dropped: {e}"),
                        },
                        Ok(None) => {}
                        Err(e) => {
                            warn!("subscriber connection lost: {e}");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// One full tick of the simulation pipeline, in the order the
    /// concurrency model specifies: reset scratch arena, drain inbound,
    /// drain cross-zone, simulate, replicate, persist, housekeep.
    fn tick_once(&mut self) {
        self.arena.reset();
        self.world.tick = self.tick;
        self.drain_inbound_packets();
        self.drain_cross_zone_messages();
        self.process_commands();
        self.simulate_movement();
        self.apply_regen_tick();
        self.update_zone_transitions();
        self.replicate_and_send_snapshots();
        self.enqueue_position_writes();
        self.cleanup_timed_out_connections();
        self.tick += 1;
    }

    // ---- inbound packet handling -------------------------------------

    fn drain_inbound_packets(&mut self) {
        let packets: Vec<_> = {
            let mut q = self.inbound.lock().unwrap();
            q.drain(..).collect()
        };
        for (addr, raw) in packets {
            if let Err(e) = self.handle_raw_packet(addr, &raw) {
                debug!("packet from {addr} rejected: {e}");
            }
        }
    }

    fn handle_raw_packet(&mut self, addr: SocketAddr, raw: &[u8]) -> Result<(), String> {
        let ip = socket_addr_to_zone_ip(addr);
        let now = now_ms();
        if self.ip_allow.is_blocked(ip, now) || self.throttler.is_blocked(ip, now) {
            return Err("blocked by rate limiter".to_string());
        }
        self.traffic.record_packet(now);
        self.traffic.update(&self.cfg.ddos);

        let (packet_type, payload) = split_packet(raw).map_err(|e| e.to_string())?;

        if packet_type == PacketType::Handshake {
            if !self.throttler.allow_connection(ip, now, &self.cfg.ddos) {
                return Err("connection throttled".to_string());
            }
        } else if let Some(&connection_id) = self.addr_to_conn.get(&addr) {
            let cfg = self.cfg.ddos;
            let bucket = self
                .packet_buckets
                .entry(connection_id)
                .or_insert_with(|| TokenBucket::new(cfg.packet_bucket_max_tokens, cfg.packet_bucket_tokens_per_second, now));
            if !bucket.allow(now) {
                return Err("packet rate limited".to_string());
            }
        }

        self.metrics.inputs_received.increment();

        match packet_type {
            PacketType::Handshake => self.handle_handshake(addr, payload),
            PacketType::ClientInput => self.handle_client_input(addr, payload),
            PacketType::ReliableEvent => self.handle_reliable_event(addr, payload),
            PacketType::Ping => self.handle_ping(addr, payload),
            PacketType::Disconnect => {
                self.disconnect_addr(addr, DisconnectReason::Graceful);
                Ok(())
            }
            PacketType::ServerSnapshot => Err("unexpected server->client packet type from client".to_string()),
        }
    }

    fn handle_handshake(&mut self, addr: SocketAddr, payload: &[u8]) -> Result<(), String> {
        let ip = socket_addr_to_zone_ip(addr);
        if self.traffic.is_emergency_mode() && !self.ip_allow.is_whitelisted(ip) {
            return Err("rejecting new connection, traffic analyzer is in emergency mode".to_string());
        }

        let request: HandshakeRequest = decode_handshake_request(payload).map_err(|e| e.to_string())?;
        validate_player_name(&request.username, &self.cfg.validator).map_err(|e| e.to_string())?;

        let zone_id = self.zone_id;
        let spawn_pos = FixedVec3::from_float(0.0, 0.0, 0.0);
        let tick = self.tick as u32;
        let mut world = std::mem::take(&mut self.world);
        let player_id = self.next_player_id;

        let response = negotiate_handshake(&request, PROTOCOL_VERSION, |_req| {
            let entity = Entity {
                position: Some(outpost_core::Position { pos: spawn_pos, timestamp_ms: now_ms() }),
                velocity: Some(outpost_core::Velocity::default()),
                rotation: Some(Rotation::default()),
                input: Some(InputState::default()),
                combat: Some(CombatState::new(100, 0)),
                network: Some(NetworkState::default()),
                anticheat: Some(AntiCheatState::default()),
                player: Some(PlayerInfo {
                    player_id,
                    connection_id: 0,
                    username: request.username.clone(),
                    session_start_ms: now_ms(),
                }),
            };
            let entity_id = world.spawn(entity);
            Ok((entity_id, spawn_pos, tick))
        });
        self.world = world;

        match &response {
            HandshakeResponse::Accepted { entity_id, .. } => {
                let connection_id = self.next_connection_id;
                self.next_connection_id += 1;
                self.next_player_id += 1;
                if let Some(e) = self.world.get_mut(*entity_id) {
                    if let Some(p) = e.player.as_mut() {
                        p.connection_id = connection_id;
                    }
                }
                let conn = Connection {
                    connection_id,
                    addr,
                    player_id,
                    entity: *entity_id,
                    state: ConnectionState::Connected,
                    last_seen_ms: now_ms(),
                    last_input_sequence: 0,
                    rtt_ms: 0,
                    baseline_tick: 0,
                };
                self.addr_to_conn.insert(addr, connection_id);
                self.connections.insert(connection_id, conn);
                self.histories.insert(*entity_id, PositionHistory::new());
                self.behavior.insert(player_id, BehaviorProfile::new(&self.cfg.anticheat, now_ms()));
                self.metrics.connected_players.add(1);
                self.metrics.entities_active.set(self.world.len() as i64);
                self.events.push_back(ServerEvent::ClientConnected { connection_id, addr, entity: *entity_id });
                info!("player {player_id} ({}) connected from {addr} as entity {entity_id} in zone {zone_id}", request.username);
            }
            HandshakeResponse::Rejected { reason } => {
                self.events.push_back(ServerEvent::ConnectionDenied { addr, reason: reason.clone() });
            }
        }

        let bytes = frame_packet(PacketType::Handshake, &encode_handshake_response(&response));
        let _ = self.socket.send_to(&bytes, addr);
        Ok(())
    }

    fn handle_client_input(&mut self, addr: SocketAddr, payload: &[u8]) -> Result<(), String> {
        let Some(&connection_id) = self.addr_to_conn.get(&addr) else {
            return Err("input from unknown connection".to_string());
        };
        let input: InputWire = decode_input(payload).map_err(|e| e.to_string())?;
        let conn = self.connections.get_mut(&connection_id).unwrap();
        conn.last_seen_ms = now_ms();

        if let Err(e) = validate_input_sequence(conn.last_input_sequence, input.sequence, &self.cfg.validator) {
            self.metrics.inputs_dropped.increment();
            return Err(e.to_string());
        }
        conn.last_input_sequence = input.sequence;
        let entity_id = conn.entity;

        let mut yaw = input.yaw;
        let mut pitch = input.pitch;
        clamp_rotation(&mut yaw, &mut pitch);

        if let Some(e) = self.world.get_mut(entity_id) {
            e.input = Some(InputState { flags: input.flags, yaw, pitch, sequence: input.sequence, timestamp_ms: input.client_timestamp_ms as u64 });
            if let Some(r) = e.rotation.as_mut() {
                *r = Rotation::new(yaw, pitch);
            }
        }
        Ok(())
    }

    fn handle_reliable_event(&mut self, addr: SocketAddr, payload: &[u8]) -> Result<(), String> {
        let Some(&connection_id) = self.addr_to_conn.get(&addr) else {
            return Err("command from unknown connection".to_string());
        };
        let command = decode_command(payload).map_err(|e| e.to_string())?;
        self.pending_commands.push_back((connection_id, command));
        Ok(())
    }

    fn handle_ping(&mut self, addr: SocketAddr, payload: &[u8]) -> Result<(), String> {
        let bytes = frame_packet(PacketType::Ping, payload);
        let _ = self.socket.send_to(&bytes, addr);
        Ok(())
    }

    // ---- cross-zone messages ------------------------------------------

    fn drain_cross_zone_messages(&mut self) {
        let messages: Vec<_> = {
            let mut q = self.cross_zone_inbound.lock().unwrap();
            q.drain(..).collect()
        };
        for msg in messages {
            if msg.target_zone != self.zone_id && msg.message_type != MessageType::Broadcast {
                continue;
            }
            if !self.sequence_guard.accept(&msg) {
                debug!("dropping out-of-order cross-zone message from zone {}", msg.source_zone);
                continue;
            }
            match msg.message_type {
                MessageType::MigrationRequest => self.handle_migration_request(&msg),
                MessageType::MigrationComplete => self.handle_migration_complete(&msg),
                MessageType::Chat | MessageType::Broadcast | MessageType::ZoneStatus | MessageType::EntitySync | MessageType::MigrationState => {
                    debug!("cross-zone {:?} from zone {} ({} bytes)", msg.message_type, msg.source_zone, msg.payload.len());
                }
            }
        }
    }

    fn handle_migration_request(&mut self, msg: &CrossZoneMessage) {
        let Ok(snapshot) = decode_entity_snapshot(&msg.payload) else {
            warn!("malformed migration request from zone {}", msg.source_zone);
            return;
        };
        if !self.migrations.on_migration_request_received(&snapshot) {
            self.metrics.migrations_failed.increment();
            return;
        }
        let entity = Entity {
            position: Some(outpost_core::Position { pos: snapshot.position, timestamp_ms: now_ms() }),
            velocity: Some(outpost_core::Velocity(snapshot.velocity)),
            rotation: Some(snapshot.rotation),
            input: Some(snapshot.last_input),
            combat: Some(snapshot.combat),
            network: Some(snapshot.network),
            anticheat: Some(snapshot.anticheat),
            player: Some(PlayerInfo {
                player_id: snapshot.player_id,
                connection_id: snapshot.connection_id,
                username: String::new(),
                session_start_ms: now_ms(),
            }),
        };
        self.world.spawn_with_id(snapshot.entity, entity);
        self.histories.insert(snapshot.entity, PositionHistory::new());
        self.metrics.migrations_completed.increment();

        // Target has synced the entity; tell the source so it can drive
        // its own state machine (TRANSFERRING -> SYNCING -> COMPLETING)
        // and release its copy.
        let reply = CrossZoneMessage {
            message_type: MessageType::MigrationComplete,
            source_zone: self.zone_id,
            target_zone: snapshot.source_zone,
            sequence: msg.sequence,
            timestamp_ms: now_ms() as u32,
            payload: snapshot.entity.to_le_bytes().to_vec(),
        };
        self.publish_cross_zone(&reply);
    }

    fn handle_migration_complete(&mut self, msg: &CrossZoneMessage) {
        if msg.payload.len() < 4 {
            return;
        }
        let entity = u32::from_le_bytes(msg.payload[0..4].try_into().unwrap());

        // Reply from the target confirms the snapshot is synced there;
        // drive SYNCING -> COMPLETING before releasing our copy.
        if let Err(e) = self.migrations.mark_syncing(entity) {
            debug!("migration {entity}: mark_syncing: {e}");
            return;
        }
        if let Err(e) = self.migrations.mark_completing(entity) {
            debug!("migration {entity}: mark_completing: {e}");
            return;
        }

        if let Ok(snapshot) = self.migrations.mark_completed(entity) {
            self.world.despawn(entity);
            self.replication.remove_entity(entity);
            self.histories.remove(&entity);
            if let Some((_, conn)) = self.connections.iter().find(|(_, c)| c.player_id == snapshot.player_id) {
                self.events.push_back(ServerEvent::ZoneHandoffCompleted { player_id: snapshot.player_id, target_zone: snapshot.target_zone });
                let _ = conn;
            }
        }
    }

    // ---- combat commands -----------------------------------------------

    fn process_commands(&mut self) {
        let commands: Vec<_> = self.pending_commands.drain(..).collect();
        for (connection_id, command) in commands {
            let Some(conn) = self.connections.get(&connection_id).cloned() else { continue };
            match command {
                ClientCommand::Attack { weapon } => self.process_attack_command(&conn, weapon),
                ClientCommand::Chat { message } => self.process_chat_command(&conn, message),
                ClientCommand::AckHandoff { token } => self.process_ack_handoff(&conn, token),
            }
        }
    }

    fn process_attack_command(&mut self, conn: &Connection, weapon: u8) {
        let weapon_kind = if weapon == 0 { WeaponKind::Melee } else { WeaponKind::Ranged };
        let Some(attacker) = self.world.get(conn.entity) else { return };
        let Some(attacker_pos) = attacker.position.map(|p| p.pos) else { return };
        let attacker_yaw = attacker.rotation.map(|r| r.yaw).unwrap_or(0.0);
        let attacker_team = attacker.combat.map(|c| c.team_id).unwrap_or(0);
        let attacker_alive = attacker.combat.map(|c| !c.is_dead).unwrap_or(false);
        let last_attack_time = attacker.combat.map(|c| c.last_attack_time).unwrap_or(0);

        let now = now_ms();

        if !self.arena.allocate(self.world.len() * ATTACK_SCRATCH_BYTES_PER_ENTITY) {
            warn!("tick arena exhausted, dropping attack from player {}", conn.player_id);
            return;
        }

        // Rewind every candidate to where the attacker's client actually saw
        // them, per the attacker's round-trip time, before target selection.
        let rewind_sources: Vec<(EntityId, &PositionHistory, u8, bool)> = self
            .world
            .iter()
            .filter(|(id, _)| **id != conn.entity)
            .filter_map(|(id, e)| {
                let combat = e.combat?;
                let history = self.histories.get(id)?;
                Some((*id, history, combat.team_id, combat.is_dead))
            })
            .collect();
        let candidates = rewind_candidates(&rewind_sources, now, conn.rtt_ms as u64, &self.cfg.combat);

        let result = process_attack(
            attacker_alive,
            true,
            last_attack_time,
            now,
            &self.cfg.combat,
            attacker_pos,
            attacker_yaw,
            attacker_team,
            weapon_kind,
            &candidates,
            &mut self.rng,
        );

        if !result.hit {
            return;
        }

        for hit in result.hits {
            if let Some(target) = self.world.get_mut(hit.target) {
                if let Some(combat) = target.combat.as_mut() {
                    combat.apply_damage(hit.damage, Some(conn.entity), now);
                    if combat.is_dead {
                        combat.respawn();
                    }
                }
            }
            let row = CombatEventRow { attacker: conn.entity, target: hit.target, damage: hit.damage, was_critical: hit.critical, timestamp_ms: now };
            if let Err(e) = self.cold_store.insert_combat_event(row) {
                warn!("combat event log failed: {e}");
            }
        }
        if let Some(attacker) = self.world.get_mut(conn.entity) {
            if let Some(c) = attacker.combat.as_mut() {
                c.last_attack_time = now;
            }
        }
    }

    fn process_chat_command(&mut self, conn: &Connection, message: String) {
        if outpost_core::validate_chat_message(&message, &self.cfg.validator).is_err() {
            return;
        }
        debug!("player {} chat: {message}", conn.player_id);
    }

    fn process_ack_handoff(&mut self, conn: &Connection, token: String) {
        if self.handoff.validate_handoff_token(conn.player_id, &token).is_ok() {
            let _ = self.handoff.complete_handoff(conn.player_id);
        }
    }

    // ---- movement / anti-cheat -----------------------------------------

    fn simulate_movement(&mut self) {
        let dt = self.timestep.dt();
        let dt_ms = (dt * 1000.0) as u32;
        let now = now_ms();
        let tick = self.tick;

        let entity_to_conn: HashMap<EntityId, u32> = self.connections.iter().map(|(&id, c)| (c.entity, id)).collect();
        let entity_ids: Vec<EntityId> = self.world.iter().map(|(id, _)| *id).collect();
        for entity_id in entity_ids {
            let Some(entity) = self.world.get(entity_id) else { continue };
            let (Some(position), Some(input)) = (entity.position, entity.input) else { continue };
            let old_pos = position.pos;

            let target = target_velocity(input.flags, input.yaw, &self.cfg.movement);
            let current_horizontal = entity.velocity.map(|v| glam::Vec2::new(v.0.to_glam().x, v.0.to_glam().z)).unwrap_or(glam::Vec2::ZERO);
            let rate = if target.length_squared() > 0.0 { self.cfg.movement.acceleration } else { self.cfg.movement.deceleration };
            let new_horizontal = outpost_core::approach(current_horizontal, target, rate, dt);
            let vertical = entity.velocity.map(|v| v.0.to_glam().y).unwrap_or(0.0);

            let (next_pos, next_vel) = outpost_core::integrate(old_pos.to_glam(), new_horizontal, vertical, dt, &self.cfg.world);
            let new_pos = FixedVec3::from_glam(next_pos);

            let anticheat = entity.anticheat.unwrap_or_default();
            let result = validate_movement(old_pos, new_pos, dt_ms.max(1), self.cfg.movement.max_speed, self.cfg.movement.speed_tolerance, anticheat.last_valid_position);

            let accepted_pos = if result.valid { new_pos } else { result.corrected_position };

            if let Some(e) = self.world.get_mut(entity_id) {
                e.position = Some(outpost_core::Position { pos: accepted_pos, timestamp_ms: now });
                e.velocity = Some(outpost_core::Velocity(FixedVec3::from_glam(next_vel)));
                if let Some(ac) = e.anticheat.as_mut() {
                    ac.last_valid_position = accepted_pos;
                    ac.last_validation_time = now;
                    if result.anticheat_triggered {
                        ac.suspicious_movements += 1;
                    }
                }
            }

            self.spatial.update(entity_id, accepted_pos.x, accepted_pos.z);
            if let Some(history) = self.histories.get_mut(&entity_id) {
                let rotation = self.world.get(entity_id).and_then(|e| e.rotation).unwrap_or_default();
                history.record(now, accepted_pos, self.world.get(entity_id).and_then(|e| e.velocity).map(|v| v.0).unwrap_or_default(), rotation);
            }

            if result.anticheat_triggered {
                self.metrics.anticheat_violations.increment();
                if let Some(player_id) = self.world.get(entity_id).and_then(|e| e.player.as_ref()).map(|p| p.player_id) {
                    if let Some(profile) = self.behavior.get_mut(&player_id) {
                        let severity = outpost_core::determine_severity(profile.recent_violation_count(self.cfg.anticheat.speed_violation_window_ms, now));
                        profile.record_violation(outpost_core::ViolationRecord {
                            timestamp_ms: now,
                            cheat_type: outpost_core::CheatType::SpeedHack,
                            severity,
                            confidence: 1.0,
                        });
                    }
                }
                if let Some(&connection_id) = entity_to_conn.get(&entity_id) {
                    if let Some(conn) = self.connections.get(&connection_id) {
                        let correction = ServerCorrection {
                            server_tick: tick as u32,
                            position: accepted_pos,
                            velocity: FixedVec3::from_glam(next_vel),
                            last_processed_input_sequence: conn.last_input_sequence,
                        };
                        let bytes = frame_packet(PacketType::ReliableEvent, &encode_correction(&correction));
                        let _ = self.socket.send_to(&bytes, conn.addr);
                    }
                }
            }
        }
    }

    fn apply_regen_tick(&mut self) {
        let now = now_ms();
        for (_, entity) in self.world.iter_mut() {
            if let Some(combat) = entity.combat.as_mut() {
                apply_regen(combat, now, &self.cfg.combat);
            }
        }
    }

    // ---- zone boundary / handoff / aura ---------------------------------

    fn update_zone_transitions(&mut self) {
        let now = now_ms();
        let Some(my_zone) = self.partition.zone(self.zone_id) else { return };
        let core = my_zone.bounds;

        let connections: Vec<Connection> = self.connections.values().cloned().collect();
        for conn in connections {
            let Some(entity) = self.world.get(conn.entity) else { continue };
            let Some(pos) = entity.position.map(|p| p.pos) else { continue };
            let velocity = entity.velocity.map(|v| v.0).unwrap_or_default();
            let x = outpost_core::to_float(pos.x);
            let z = outpost_core::to_float(pos.z);
            let distance_to_edge = core.distance_to_edge(x, z);

            let partition = &self.partition;
            let zone_id = self.zone_id;
            let phase = self.handoff.check_player_position(
                conn.player_id,
                conn.entity,
                distance_to_edge,
                || partition.find_zone_for_position(FixedVec3::new(pos.x + direction_bias(core, x, z), pos.y, pos.z)).filter(|z| *z != zone_id),
                &self.cfg.handoff,
                now,
            );

            if phase == HandoffPhase::Switching && self.migrations.migration_state(conn.entity) == MigrationState::None {
                self.initiate_migration(&conn, pos);
            }

            if self.aura.is_in_aura_buffer(core, pos) {
                if self.aura.is_entity_in_aura(conn.entity) {
                    self.aura.update_entity_state(conn.entity, pos, velocity, self.tick);
                } else {
                    self.aura.on_entity_entering_aura(conn.entity, pos, velocity, self.tick);
                }
            } else if self.aura.is_entity_in_aura(conn.entity) {
                self.aura.on_entity_leaving_aura(conn.entity);
            }
        }

        let timed_out = self.migrations.update(now);
        for entity in timed_out {
            warn!("migration for entity {entity} timed out");
            self.metrics.migrations_failed.increment();
        }
    }

    fn initiate_migration(&mut self, conn: &Connection, pos: FixedVec3) {
        let Some(entity) = self.world.get(conn.entity) else { return };
        let Some(target_zone) = self.handoff.active_handoffs().find(|h| h.player_id == conn.player_id).map(|h| h.target_zone) else { return };

        let snapshot = EntitySnapshot {
            entity: conn.entity,
            player_id: conn.player_id,
            connection_id: conn.connection_id,
            position: pos,
            velocity: entity.velocity.map(|v| v.0).unwrap_or_default(),
            rotation: entity.rotation.unwrap_or_default(),
            combat: entity.combat.unwrap_or(CombatState::new(100, 0)),
            network: entity.network.unwrap_or_default(),
            last_input: entity.input.unwrap_or_default(),
            anticheat: entity.anticheat.unwrap_or_default(),
            source_zone: self.zone_id,
            target_zone,
            timestamp_ms: now_ms(),
            sequence: self.tick,
        };

        match self.migrations.initiate_migration(snapshot.clone(), now_ms()) {
            Ok(sequence) => {
                let payload = encode_entity_snapshot(&snapshot);
                let msg = CrossZoneMessage {
                    message_type: MessageType::MigrationRequest,
                    source_zone: self.zone_id,
                    target_zone,
                    sequence: sequence as u32,
                    timestamp_ms: now_ms() as u32,
                    payload,
                };
                self.publish_cross_zone(&msg);
                // Published over pub/sub: PREPARING -> TRANSFERRING.
                if let Err(e) = self.migrations.mark_transferring(conn.entity) {
                    warn!("migration {} for entity {}: {e}", sequence, conn.entity);
                }
            }
            Err(e) => debug!("migration not started: {e}"),
        }
    }

    fn publish_cross_zone(&mut self, msg: &CrossZoneMessage) {
        let channel = directed_channel(msg.target_zone);
        let bytes = outpost_core::encode_message(msg);
        if let Err(e) = publish(&self.redis_host, self.redis_port, &channel, &bytes) {
            warn!("cross-zone publish failed: {e}");
        }
    }

    // ---- replication / snapshots ----------------------------------------

    fn replicate_and_send_snapshots(&mut self) {
        let tick_rate = self.cfg.tick.tick_rate_hz;
        let max_entities = self.qos.effective_max_snapshot_entities(&self.cfg.tick, self.cfg.replication.max_entities_per_snapshot);
        let mut repl_cfg = self.cfg.replication;
        repl_cfg.max_entities_per_snapshot = max_entities;

        if !self.arena.allocate(self.world.len() * REPLICATION_SCRATCH_BYTES_PER_ENTITY) {
            warn!("tick arena exhausted, skipping replication this tick ({} entities)", self.world.len());
            return;
        }

        let current_states: HashMap<EntityId, EntitySnapshotState> = self
            .world
            .iter()
            .filter_map(|(id, e)| entity_snapshot_state(e).map(|s| (*id, s)))
            .collect();

        let connections: Vec<Connection> = self.connections.values().cloned().collect();
        for conn in connections {
            let Some(viewer_pos) = self.world.get(conn.entity).and_then(|e| e.position).map(|p| p.pos) else { continue };
            let candidates: Vec<(EntityId, FixedVec3)> = current_states.iter().filter(|(id, _)| **id != conn.entity).map(|(id, s)| (*id, s.position)).collect();
            let priorities = calculate_priorities(viewer_pos, &candidates, &repl_cfg);

            let mut visible = Vec::with_capacity(priorities.len());
            for entry in &priorities {
                if !self.replication.needs_update(conn.connection_id, entry.entity, entry.tier, self.tick, tick_rate, &repl_cfg) {
                    continue;
                }
                let Some(state) = current_states.get(&entry.entity) else { continue };
                let culling = field_culling_for_tier(entry.tier);
                visible.push((entry.entity, cull_fields(*state, culling)));
                self.replication.mark_updated(conn.connection_id, entry.entity, self.tick);
            }

            let baseline_key = (conn.connection_id, conn.baseline_tick);
            let bytes = if conn.baseline_tick == 0 {
                let full: Vec<_> = visible.clone();
                encode_full_snapshot(self.tick as u32, &full)
            } else {
                let baseline = self.snapshot_baselines.get(&baseline_key).cloned().unwrap_or_default();
                let removed: Vec<EntityId> = baseline.keys().filter(|id| !current_states.contains_key(id)).copied().collect();
                encode_delta_snapshot(self.tick as u32, conn.baseline_tick, &visible, &baseline, &removed)
            };

            let current_tick = self.tick as u32;
            self.snapshot_baselines.insert((conn.connection_id, current_tick), visible.into_iter().collect());
            self.snapshot_baselines.retain(|(c, t), _| *c != conn.connection_id || *t + 3 >= current_tick);
            if let Some(c) = self.connections.get_mut(&conn.connection_id) {
                c.baseline_tick = self.tick as u32;
            }

            let framed = frame_packet(PacketType::ServerSnapshot, &bytes);
            let _ = self.socket.send_to(&framed, conn.addr);
            self.metrics.snapshots_sent.increment();
        }

        self.metrics.entities_active.set(self.world.len() as i64);
    }

    // ---- persistence ------------------------------------------------------

    fn enqueue_position_writes(&mut self) {
        let mut queue = self.write_queue.lock().unwrap();
        for (_, entity) in self.world.iter() {
            let (Some(pos), Some(player)) = (entity.position, entity.player.as_ref()) else { continue };
            queue.enqueue(HotWrite::Position { player_id: player.player_id, position: pos.pos });
        }
    }

    // ---- connection lifecycle ---------------------------------------------

    fn cleanup_timed_out_connections(&mut self) {
        let now = now_ms();
        let timed_out: Vec<u32> = self
            .connections
            .iter()
            .filter(|(_, c)| now.saturating_sub(c.last_seen_ms) > CONNECTION_TIMEOUT_MS)
            .map(|(id, _)| *id)
            .collect();
        for id in timed_out {
            self.disconnect_connection(id, DisconnectReason::Timeout);
        }
    }

    fn disconnect_addr(&mut self, addr: SocketAddr, reason: DisconnectReason) {
        if let Some(&connection_id) = self.addr_to_conn.get(&addr) {
            self.disconnect_connection(connection_id, reason);
        }
    }

    fn disconnect_connection(&mut self, connection_id: u32, reason: DisconnectReason) {
        let Some(conn) = self.connections.remove(&connection_id) else { return };
        self.addr_to_conn.remove(&conn.addr);
        self.packet_buckets.remove(&connection_id);
        self.world.despawn(conn.entity);
        self.spatial.remove(conn.entity);
        self.replication.remove_client(connection_id);
        self.replication.remove_entity(conn.entity);
        self.histories.remove(&conn.entity);
        self.behavior.remove(&conn.player_id);
        self.metrics.connected_players.add(-1);
        self.metrics.entities_active.set(self.world.len() as i64);

        let payload = reason.as_str().as_bytes();
        let bytes = frame_packet(PacketType::Disconnect, payload);
        let _ = self.socket.send_to(&bytes, conn.addr);

        info!("player {} disconnected ({})", conn.player_id, reason.as_str());
        self.events.push_back(ServerEvent::ClientDisconnected { connection_id, reason });
    }

    /// Kicks a client by connection id; used from the TUI's operator
    /// controls.
    pub fn kick_client(&mut self, connection_id: u32) {
        self.disconnect_connection(connection_id, DisconnectReason::Kicked);
    }

    pub fn shutdown_connections(&mut self) {
        let ids: Vec<u32> = self.connections.keys().copied().collect();
        for id in ids {
            self.disconnect_connection(id, DisconnectReason::Graceful);
        }
        let mut queue = self.write_queue.lock().unwrap();
        if let Ok(mut store) = RedisHotStore::connect(&self.redis_host, self.redis_port) {
            let mut breaker = new_circuit_breaker(&self.cfg.ddos);
            queue.drain_into(&mut store, &mut breaker, now_ms());
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            zone_id: self.zone_id,
            tick: self.tick,
            uptime_secs: self.start.elapsed().as_secs(),
            connected_players: self.metrics.connected_players.get(),
            entities_active: self.metrics.entities_active.get(),
            qos_level: qos_level_str(self.qos.level()),
            circuit_state: circuit_state_str(self.breaker.state()),
            snapshots_sent: self.metrics.snapshots_sent.get(),
            inputs_received: self.metrics.inputs_received.get(),
            inputs_dropped: self.metrics.inputs_dropped.get(),
            anticheat_violations: self.metrics.anticheat_violations.get(),
            migrations_completed: self.metrics.migrations_completed.get(),
            migrations_failed: self.metrics.migrations_failed.get(),
            write_queue_dropped: self.write_queue.lock().unwrap().dropped_count(),
        }
    }

    pub fn client_infos(&self) -> Vec<(u32, SocketAddr, u32)> {
        self.connections.values().map(|c| (c.connection_id, c.addr, c.rtt_ms)).collect()
    }
}

fn qos_level_str(level: outpost_core::QosLevel) -> &'static str {
    match level {
        outpost_core::QosLevel::Normal => "normal",
        outpost_core::QosLevel::Degraded => "degraded",
    }
}

fn circuit_state_str(state: outpost_core::CircuitState) -> &'static str {
    match state {
        outpost_core::CircuitState::Closed => "closed",
        outpost_core::CircuitState::Open => "open",
        outpost_core::CircuitState::HalfOpen => "half-open",
    }
}

fn entity_snapshot_state(entity: &Entity) -> Option<EntitySnapshotState> {
    let position = entity.position?.pos;
    let rotation = entity.rotation.unwrap_or_default();
    let velocity = entity.velocity.map(|v| v.0).unwrap_or_default();
    let combat = entity.combat?;
    let health_percent = ((combat.health.max(0) as f32 / combat.max_health.max(1) as f32) * 100.0) as u8;
    Some(EntitySnapshotState { position, rotation, velocity, health_percent, anim_state: 0, entity_type: 0 })
}

fn cull_fields(state: EntitySnapshotState, culling: outpost_core::FieldCulling) -> EntitySnapshotState {
    let mut s = state;
    if culling.position_and_health_only {
        s.velocity = FixedVec3::ZERO;
        s.anim_state = 0;
        s.rotation = Rotation::default();
    } else {
        if !culling.include_rotation {
            s.rotation = Rotation::default();
        }
        if !culling.include_animation {
            s.anim_state = 0;
        }
    }
    s
}

/// Hand-rolled little-endian framing for an `EntitySnapshot` crossing the
/// cross-zone pub/sub channel, since this payload is inside a
/// `CrossZoneMessage` whose own framing is already hand-rolled.
fn encode_entity_snapshot(s: &EntitySnapshot) -> Vec<u8> {
    let mut w = crate::wire::ByteWriter::new();
    w.u32(s.entity);
    w.u32((s.player_id & 0xFFFF_FFFF) as u32);
    w.u32((s.player_id >> 32) as u32);
    w.u32(s.connection_id);
    w.i32(s.position.x);
    w.i32(s.position.y);
    w.i32(s.position.z);
    w.i32(s.velocity.x);
    w.i32(s.velocity.y);
    w.i32(s.velocity.z);
    w.f32(s.rotation.yaw);
    w.f32(s.rotation.pitch);
    w.i32(s.combat.health);
    w.i32(s.combat.max_health);
    w.u8(s.combat.team_id);
    w.u32(s.source_zone);
    w.u32(s.target_zone);
    w.u32(s.sequence as u32);
    w.into_vec()
}

fn decode_entity_snapshot(bytes: &[u8]) -> Result<EntitySnapshot, String> {
    let mut r = crate::wire::ByteReader::new(bytes);
    let entity = r.u32().map_err(|e| e.to_string())?;
    let player_id_lo = r.u32().map_err(|e| e.to_string())? as u64;
    let player_id_hi = r.u32().map_err(|e| e.to_string())? as u64;
    let connection_id = r.u32().map_err(|e| e.to_string())?;
    let position = FixedVec3::new(
        r.i32().map_err(|e| e.to_string())?,
        r.i32().map_err(|e| e.to_string())?,
        r.i32().map_err(|e| e.to_string())?,
    );
    let velocity = FixedVec3::new(
        r.i32().map_err(|e| e.to_string())?,
        r.i32().map_err(|e| e.to_string())?,
        r.i32().map_err(|e| e.to_string())?,
    );
    let rotation = Rotation::new(r.f32().map_err(|e| e.to_string())?, r.f32().map_err(|e| e.to_string())?);
    let health = r.i32().map_err(|e| e.to_string())?;
    let max_health = r.i32().map_err(|e| e.to_string())?;
    let team_id = r.u8().map_err(|e| e.to_string())?;
    let source_zone = r.u32().map_err(|e| e.to_string())?;
    let target_zone = r.u32().map_err(|e| e.to_string())?;
    let sequence = r.u32().map_err(|e| e.to_string())? as u64;

    let mut combat = CombatState::new(max_health, team_id);
    combat.health = health;
    Ok(EntitySnapshot {
        entity,
        player_id: player_id_lo | (player_id_hi << 32),
        connection_id,
        position,
        velocity,
        rotation,
        combat,
        network: NetworkState::default(),
        last_input: InputState::default(),
        anticheat: AntiCheatState::default(),
        source_zone,
        target_zone,
        timestamp_ms: now_ms(),
        sequence,
    })
}

fn socket_addr_to_zone_ip(addr: SocketAddr) -> ZoneIpAddr {
    match addr.ip() {
        std::net::IpAddr::V4(v4) => ZoneIpAddr(v4.octets()),
        std::net::IpAddr::V6(_) => ZoneIpAddr([0, 0, 0, 0]),
    }
}

/// Nudges the probe point used to resolve a target zone slightly past the
/// boundary the entity is approaching, so `find_zone_for_position` looks
/// into the neighboring zone rather than re-resolving the current one.
fn direction_bias(core: outpost_core::Rect, x: f32, z: f32) -> i32 {
    let center = core.center();
    let dx = if x >= center.x { 1.0 } else { -1.0 };
    let dz = if z >= center.y { 1.0 } else { -1.0 };
    let _ = dz;
    outpost_core::to_fixed(dx * 0.1)
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
