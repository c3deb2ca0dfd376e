//! Delta-compressed snapshot codec: the bit-exact little-endian wire
//! format from the external-interfaces wire layout, with variable-length
//! position deltas and bounds-checked reads.
//!
//! The descriptive paragraph on position-delta sizing and the worked wire
//! layout disagree on exact byte counts; this module follows the wire
//! layout (the tag-byte-plus-per-component-width scheme) as authoritative
//! and records the reconciliation in the repo's design ledger.

use std::collections::HashMap;

use crate::entity::EntityId;
use crate::error::{PacketError, SnapshotError};
use crate::fixed::{FixedVec3, Rotation};

pub const FIELD_POSITION: u16 = 1 << 0;
pub const FIELD_ROTATION: u16 = 1 << 1;
pub const FIELD_VELOCITY: u16 = 1 << 2;
pub const FIELD_HEALTH: u16 = 1 << 3;
pub const FIELD_ANIM_STATE: u16 = 1 << 4;
pub const FIELD_ENTITY_TYPE: u16 = 1 << 5;
pub const NEW_ENTITY_MASK: u16 = 0xFFFF;

const POS_DELTA_TAG_1_BYTE: u8 = 0b00 << 6;
const POS_DELTA_TAG_2_BYTE: u8 = 0b01 << 6;
const POS_DELTA_TAG_4_BYTE: u8 = 0b10 << 6;

/// A single entity's replicated state as known to the server, the unit
/// both the snapshot history and delta diffing operate on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySnapshotState {
    pub position: FixedVec3,
    pub rotation: Rotation,
    pub velocity: FixedVec3,
    pub health_percent: u8,
    pub anim_state: u8,
    pub entity_type: u8,
}

struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }
    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn need(&self, n: usize) -> Result<(), PacketError> {
        if self.pos + n > self.buf.len() {
            Err(PacketError::Truncated { needed: self.pos + n, available: self.buf.len() })
        } else {
            Ok(())
        }
    }

    fn u8(&mut self) -> Result<u8, PacketError> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }
    fn u16(&mut self) -> Result<u16, PacketError> {
        self.need(2)?;
        let v = u16::from_le_bytes(self.buf[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        Ok(v)
    }
    fn u32(&mut self) -> Result<u32, PacketError> {
        self.need(4)?;
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }
    fn i16(&mut self) -> Result<i16, PacketError> {
        self.need(2)?;
        let v = i16::from_le_bytes(self.buf[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        Ok(v)
    }
    fn i32(&mut self) -> Result<i32, PacketError> {
        self.need(4)?;
        let v = i32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }
    fn f32(&mut self) -> Result<f32, PacketError> {
        self.need(4)?;
        let v = f32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }
}

fn write_position_delta(w: &mut ByteWriter, delta: FixedVec3) {
    let max_abs = delta.x.abs().max(delta.y.abs()).max(delta.z.abs());
    if max_abs <= 127 {
        w.u8(POS_DELTA_TAG_1_BYTE);
        w.buf.push(delta.x as i8 as u8);
        w.buf.push(delta.y as i8 as u8);
        w.buf.push(delta.z as i8 as u8);
    } else if max_abs <= 32767 {
        w.u8(POS_DELTA_TAG_2_BYTE);
        w.i16(delta.x as i16);
        w.i16(delta.y as i16);
        w.i16(delta.z as i16);
    } else {
        w.u8(POS_DELTA_TAG_4_BYTE);
        w.i32(delta.x);
        w.i32(delta.y);
        w.i32(delta.z);
    }
}

fn read_position_delta(r: &mut ByteReader) -> Result<FixedVec3, PacketError> {
    let tag = r.u8()?;
    match tag & 0b1100_0000 {
        POS_DELTA_TAG_1_BYTE => {
            r.need(3)?;
            let x = r.buf[r.pos] as i8 as i32;
            let y = r.buf[r.pos + 1] as i8 as i32;
            let z = r.buf[r.pos + 2] as i8 as i32;
            r.pos += 3;
            Ok(FixedVec3::new(x, y, z))
        }
        POS_DELTA_TAG_2_BYTE => Ok(FixedVec3::new(r.i16()? as i32, r.i16()? as i32, r.i16()? as i32)),
        POS_DELTA_TAG_4_BYTE => Ok(FixedVec3::new(r.i32()?, r.i32()?, r.i32()?)),
        _ => Err(PacketError::InvalidDeltaTag(tag)),
    }
}

/// Which fields differ between `current` and `baseline`; `NEW_ENTITY_MASK`
/// is not produced here (that's used only for entities absent from the
/// baseline entirely).
pub fn changed_fields_mask(current: &EntitySnapshotState, baseline: &EntitySnapshotState) -> u16 {
    let mut mask = 0u16;
    if current.position != baseline.position {
        mask |= FIELD_POSITION;
    }
    if current.rotation != baseline.rotation {
        mask |= FIELD_ROTATION;
    }
    if current.velocity != baseline.velocity {
        mask |= FIELD_VELOCITY;
    }
    if current.health_percent != baseline.health_percent {
        mask |= FIELD_HEALTH;
    }
    if current.anim_state != baseline.anim_state {
        mask |= FIELD_ANIM_STATE;
    }
    if current.entity_type != baseline.entity_type {
        mask |= FIELD_ENTITY_TYPE;
    }
    mask
}

fn write_entity_record(w: &mut ByteWriter, id: EntityId, mask: u16, current: &EntitySnapshotState, baseline: Option<&EntitySnapshotState>) {
    w.u32(id);
    w.u16(mask);
    if mask & FIELD_POSITION != 0 {
        let delta = match baseline {
            Some(b) => current.position.sub(b.position),
            None => current.position,
        };
        write_position_delta(w, delta);
    }
    if mask & FIELD_ROTATION != 0 {
        w.f32(current.rotation.yaw);
        w.f32(current.rotation.pitch);
    }
    if mask & FIELD_VELOCITY != 0 {
        w.i32(current.velocity.x);
        w.i32(current.velocity.y);
        w.i32(current.velocity.z);
    }
    if mask & FIELD_HEALTH != 0 {
        w.u8(current.health_percent);
    }
    if mask & FIELD_ANIM_STATE != 0 {
        w.u8(current.anim_state);
    }
    if mask & FIELD_ENTITY_TYPE != 0 {
        w.u8(current.entity_type);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub id: EntityId,
    pub mask: u16,
    pub position_delta: Option<FixedVec3>,
    pub rotation: Option<Rotation>,
    pub velocity: Option<FixedVec3>,
    pub health_percent: Option<u8>,
    pub anim_state: Option<u8>,
    pub entity_type: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSnapshot {
    pub server_tick: u32,
    pub baseline_tick: u32,
    pub entities: Vec<DecodedEntity>,
    pub removed: Vec<EntityId>,
}

fn read_entity_record(r: &mut ByteReader) -> Result<DecodedEntity, PacketError> {
    let id = r.u32()?;
    let mask = r.u16()?;
    let position_delta = if mask & FIELD_POSITION != 0 { Some(read_position_delta(r)?) } else { None };
    let rotation = if mask & FIELD_ROTATION != 0 { Some(Rotation::new(r.f32()?, r.f32()?)) } else { None };
    let velocity = if mask & FIELD_VELOCITY != 0 { Some(FixedVec3::new(r.i32()?, r.i32()?, r.i32()?)) } else { None };
    let health_percent = if mask & FIELD_HEALTH != 0 { Some(r.u8()?) } else { None };
    let anim_state = if mask & FIELD_ANIM_STATE != 0 { Some(r.u8()?) } else { None };
    let entity_type = if mask & FIELD_ENTITY_TYPE != 0 { Some(r.u8()?) } else { None };
    Ok(DecodedEntity { id, mask, position_delta, rotation, velocity, health_percent, anim_state, entity_type })
}

/// Encodes a full snapshot (`baselineTick == 0`): every entity carries the
/// new-entity mask and its absolute state.
pub fn encode_full_snapshot(server_tick: u32, entities: &[(EntityId, EntitySnapshotState)]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u32(server_tick);
    w.u32(0);
    w.u16(entities.len() as u16);
    w.u16(0);
    for (id, state) in entities {
        write_entity_record(&mut w, *id, NEW_ENTITY_MASK, state, None);
    }
    w.buf
}

/// Encodes a delta snapshot against `baseline`, omitting entities whose
/// state is unchanged, and appending the removed-entity trailer.
pub fn encode_delta_snapshot(
    server_tick: u32,
    baseline_tick: u32,
    current: &[(EntityId, EntitySnapshotState)],
    baseline: &HashMap<EntityId, EntitySnapshotState>,
    removed: &[EntityId],
) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u32(server_tick);
    w.u32(baseline_tick);

    let mut entity_records = Vec::new();
    for (id, state) in current {
        match baseline.get(id) {
            Some(base) => {
                let mask = changed_fields_mask(state, base);
                if mask != 0 {
                    entity_records.push((*id, mask, *state, Some(*base)));
                }
            }
            None => entity_records.push((*id, NEW_ENTITY_MASK, *state, None)),
        }
    }

    w.u16(entity_records.len() as u16);
    w.u16(removed.len() as u16);
    for (id, mask, state, base) in &entity_records {
        write_entity_record(&mut w, *id, *mask, state, base.as_ref());
    }
    for id in removed {
        w.u32(*id);
    }
    w.buf
}

/// Decodes a snapshot header and entity/removal list without applying it —
/// applying requires the baseline, handled by `apply_delta`.
pub fn decode_snapshot(bytes: &[u8]) -> Result<DecodedSnapshot, PacketError> {
    let mut r = ByteReader::new(bytes);
    let server_tick = r.u32()?;
    let baseline_tick = r.u32()?;
    let entity_count = r.u16()? as usize;
    let removed_count = r.u16()? as usize;

    let mut entities = Vec::with_capacity(entity_count);
    for _ in 0..entity_count {
        entities.push(read_entity_record(&mut r)?);
    }
    let mut removed = Vec::with_capacity(removed_count);
    for _ in 0..removed_count {
        removed.push(r.u32()?);
    }
    Ok(DecodedSnapshot { server_tick, baseline_tick, entities, removed })
}

/// `output = baseline`, then overwrite listed fields per entity and drop
/// removed entities. Fails if `baseline_tick` isn't the caller's baseline
/// (the caller is expected to have already looked it up in snapshot
/// history; this just applies the already-decoded delta).
pub fn apply_delta(
    baseline: &HashMap<EntityId, EntitySnapshotState>,
    decoded: &DecodedSnapshot,
) -> HashMap<EntityId, EntitySnapshotState> {
    let mut output = baseline.clone();
    for entity in &decoded.entities {
        let mut state = output.get(&entity.id).copied().unwrap_or(EntitySnapshotState {
            position: FixedVec3::ZERO,
            rotation: Rotation::default(),
            velocity: FixedVec3::ZERO,
            health_percent: 0,
            anim_state: 0,
            entity_type: 0,
        });
        if let Some(delta) = entity.position_delta {
            state.position = if entity.mask == NEW_ENTITY_MASK { delta } else { state.position.add(delta) };
        }
        if let Some(rotation) = entity.rotation {
            state.rotation = rotation;
        }
        if let Some(velocity) = entity.velocity {
            state.velocity = velocity;
        }
        if let Some(health) = entity.health_percent {
            state.health_percent = health;
        }
        if let Some(anim) = entity.anim_state {
            state.anim_state = anim;
        }
        if let Some(entity_type) = entity.entity_type {
            state.entity_type = entity_type;
        }
        output.insert(entity.id, state);
    }
    for id in &decoded.removed {
        output.remove(id);
    }
    output
}

/// Looks up a baseline in the server's bounded snapshot history; returns
/// `SnapshotError::BaselineUnavailable` if it has aged out, signaling the
/// caller to fall back to a full snapshot next cycle.
pub fn require_baseline(
    history: &HashMap<u64, HashMap<EntityId, EntitySnapshotState>>,
    baseline_tick: u64,
) -> Result<&HashMap<EntityId, EntitySnapshotState>, SnapshotError> {
    history.get(&baseline_tick).ok_or(SnapshotError::BaselineUnavailable(baseline_tick))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f32, health: u8) -> EntitySnapshotState {
        EntitySnapshotState {
            position: FixedVec3::from_float(x, 0.0, 0.0),
            rotation: Rotation::default(),
            velocity: FixedVec3::ZERO,
            health_percent: health,
            anim_state: 0,
            entity_type: 1,
        }
    }

    #[test]
    fn full_snapshot_roundtrips() {
        let entities = vec![(1, state(1.0, 100)), (2, state(2.0, 80))];
        let bytes = encode_full_snapshot(1, &entities);
        let decoded = decode_snapshot(&bytes).unwrap();
        assert_eq!(decoded.server_tick, 1);
        assert_eq!(decoded.entities.len(), 2);
        assert_eq!(decoded.entities[0].mask, NEW_ENTITY_MASK);
    }

    #[test]
    fn delta_only_encodes_changed_entities() {
        let mut baseline = HashMap::new();
        for i in 0..10u32 {
            baseline.insert(i, state(i as f32, 100));
        }
        let mut current: Vec<(EntityId, EntitySnapshotState)> = (0..10u32).map(|i| (i, state(i as f32, 100))).collect();
        current[3].1.position = FixedVec3::from_float(3.005, 0.0, 0.0);
        current[3].1.health_percent = 85;

        let full = encode_full_snapshot(2, &current);
        let delta = encode_delta_snapshot(2, 1, &current, &baseline, &[]);
        assert!(delta.len() < full.len());

        let decoded = decode_snapshot(&delta).unwrap();
        assert_eq!(decoded.entities.len(), 1);
        assert_eq!(decoded.entities[0].id, 3);
    }

    #[test]
    fn apply_delta_reproduces_current_exactly() {
        let mut baseline = HashMap::new();
        for i in 0..10u32 {
            baseline.insert(i, state(i as f32, 100));
        }
        let mut current: Vec<(EntityId, EntitySnapshotState)> = (0..10u32).map(|i| (i, state(i as f32, 100))).collect();
        current[3].1.position = FixedVec3::from_float(3.005, 0.0, 0.0);
        current[3].1.health_percent = 85;

        let delta = encode_delta_snapshot(2, 1, &current, &baseline, &[]);
        let decoded = decode_snapshot(&delta).unwrap();
        let applied = apply_delta(&baseline, &decoded);

        for (id, expected) in &current {
            assert_eq!(applied.get(id).unwrap(), expected);
        }
    }

    #[test]
    fn apply_delta_drops_removed_entities() {
        let mut baseline = HashMap::new();
        baseline.insert(1u32, state(1.0, 100));
        baseline.insert(2u32, state(2.0, 100));
        let delta = encode_delta_snapshot(2, 1, &[(2, state(2.0, 100))], &baseline, &[1]);
        let decoded = decode_snapshot(&delta).unwrap();
        let applied = apply_delta(&baseline, &decoded);
        assert!(!applied.contains_key(&1));
        assert!(applied.contains_key(&2));
    }

    #[test]
    fn truncated_buffer_fails_cleanly() {
        let bytes = vec![1, 2, 3];
        assert!(decode_snapshot(&bytes).is_err());
    }

    #[test]
    fn position_delta_picks_smallest_width() {
        let mut w = ByteWriter::new();
        write_position_delta(&mut w, FixedVec3::new(10, -5, 3));
        assert_eq!(w.buf.len(), 4); // tag + 3x i8
        let mut w2 = ByteWriter::new();
        write_position_delta(&mut w2, FixedVec3::new(1000, 0, 0));
        assert_eq!(w2.buf.len(), 7); // tag + 3x i16
    }
}
