//! Per-entity position history: a time-ordered ring covering the last 2 s,
//! used by lag-compensated combat to rewind a target's apparent position.

use std::collections::VecDeque;

use crate::fixed::{FixedVec3, Rotation};

pub const HISTORY_CAPACITY: usize = 120; // 2 s at 60 Hz
pub const HISTORY_WINDOW_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionHistoryEntry {
    pub timestamp_ms: u64,
    pub position: FixedVec3,
    pub velocity: FixedVec3,
    pub rotation: Rotation,
}

/// Time-ordered ring of up to `HISTORY_CAPACITY` entries; entries are
/// evicted by age, not by count, so a long-running entity doesn't silently
/// lose its most recent second just because capacity was hit faster than
/// expected.
#[derive(Debug, Default)]
pub struct PositionHistory {
    entries: VecDeque<PositionHistoryEntry>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self { entries: VecDeque::with_capacity(HISTORY_CAPACITY) }
    }

    pub fn record(&mut self, now_ms: u64, position: FixedVec3, velocity: FixedVec3, rotation: Rotation) {
        self.entries.push_back(PositionHistoryEntry {
            timestamp_ms: now_ms,
            position,
            velocity,
            rotation,
        });
        self.evict_older_than(now_ms);
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    fn evict_older_than(&mut self, now_ms: u64) {
        while let Some(front) = self.entries.front() {
            if now_ms.saturating_sub(front.timestamp_ms) > HISTORY_WINDOW_MS {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn oldest_timestamp(&self) -> Option<u64> {
        self.entries.front().map(|e| e.timestamp_ms)
    }

    pub fn newest_timestamp(&self) -> Option<u64> {
        self.entries.back().map(|e| e.timestamp_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the entry exactly at `t` if present.
    pub fn at_exact(&self, t: u64) -> Option<&PositionHistoryEntry> {
        self.entries.iter().find(|e| e.timestamp_ms == t)
    }

    /// Linear interpolation between the two entries bracketing `t`. Fails
    /// (`None`) if `t` lies outside `[oldest, newest]`.
    pub fn interpolated_position(&self, t: u64) -> Option<(FixedVec3, Rotation)> {
        if let Some(exact) = self.at_exact(t) {
            return Some((exact.position, exact.rotation));
        }
        let oldest = self.oldest_timestamp()?;
        let newest = self.newest_timestamp()?;
        if t < oldest || t > newest {
            return None;
        }

        let mut before: Option<&PositionHistoryEntry> = None;
        let mut after: Option<&PositionHistoryEntry> = None;
        for entry in &self.entries {
            if entry.timestamp_ms <= t {
                before = Some(entry);
            }
            if entry.timestamp_ms >= t && after.is_none() {
                after = Some(entry);
            }
        }

        match (before, after) {
            (Some(b), Some(a)) if b.timestamp_ms != a.timestamp_ms => {
                let span = (a.timestamp_ms - b.timestamp_ms) as f32;
                let alpha = (t - b.timestamp_ms) as f32 / span;
                Some((FixedVec3::lerp(b.position, a.position, alpha), Rotation::lerp(b.rotation, a.rotation, alpha)))
            }
            (Some(b), _) => Some((b.position, b.rotation)),
            (None, Some(a)) => Some((a.position, a.rotation)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(history: &mut PositionHistory, t: u64, x: f32) {
        history.record(t, FixedVec3::from_float(x, 0.0, 0.0), FixedVec3::ZERO, Rotation::default());
    }

    #[test]
    fn interpolation_matches_spec_example() {
        let mut history = PositionHistory::new();
        entry_at(&mut history, 500, 5.0);
        entry_at(&mut history, 600, 6.0);
        let (pos, _) = history.interpolated_position(508).unwrap();
        let x = crate::fixed::to_float(pos.x);
        assert!((x - 5.08).abs() < 0.01, "got {x}");
    }

    #[test]
    fn interpolation_fails_outside_window() {
        let mut history = PositionHistory::new();
        entry_at(&mut history, 500, 5.0);
        entry_at(&mut history, 600, 6.0);
        assert!(history.interpolated_position(700).is_none());
        assert!(history.interpolated_position(100).is_none());
    }

    #[test]
    fn old_entries_evicted_by_age_not_count() {
        let mut history = PositionHistory::new();
        entry_at(&mut history, 0, 0.0);
        entry_at(&mut history, 3000, 1.0);
        assert_eq!(history.len(), 1);
        assert_eq!(history.oldest_timestamp(), Some(3000));
    }

    #[test]
    fn entries_stay_time_ordered_and_recent() {
        let mut history = PositionHistory::new();
        for t in 0..130 {
            entry_at(&mut history, t * 16, t as f32);
        }
        assert!(history.len() <= HISTORY_CAPACITY);
        let oldest = history.oldest_timestamp().unwrap();
        let newest = history.newest_timestamp().unwrap();
        assert!(newest - oldest <= HISTORY_WINDOW_MS);
    }
}
