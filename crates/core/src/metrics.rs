//! Lock-free metrics: the simulation thread and background threads both
//! touch these without a mutex, per the concurrency model's requirement
//! that counters be atomics.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    pub const fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn add(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram for tick-duration / latency style samples;
/// bucket bounds are in microseconds, matching the tick-budget unit used
/// by the QoS controller.
#[derive(Debug)]
pub struct Histogram {
    bucket_bounds_us: &'static [u64],
    bucket_counts: Vec<AtomicU64>,
    sum_us: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bucket_bounds_us: &'static [u64]) -> Self {
        Self {
            bucket_bounds_us,
            bucket_counts: (0..=bucket_bounds_us.len()).map(|_| AtomicU64::new(0)).collect(),
            sum_us: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value_us: u64) {
        let bucket = self.bucket_bounds_us.iter().position(|&bound| value_us <= bound).unwrap_or(self.bucket_bounds_us.len());
        self.bucket_counts[bucket].fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(value_us, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_us(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum_us.load(Ordering::Relaxed) as f64 / count as f64
        }
    }
}

pub const TICK_DURATION_BUCKETS_US: &[u64] = &[1_000, 2_000, 5_000, 10_000, 16_667, 33_333];

#[derive(Debug, Default)]
pub struct ZoneMetrics {
    pub ticks_run: Counter,
    pub tick_overruns: Counter,
    pub snapshots_sent: Counter,
    pub inputs_received: Counter,
    pub inputs_dropped: Counter,
    pub anticheat_violations: Counter,
    pub migrations_completed: Counter,
    pub migrations_failed: Counter,
    pub connected_players: Gauge,
    pub entities_active: Gauge,
}

impl ZoneMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates() {
        let c = Counter::new();
        c.increment();
        c.add(5);
        assert_eq!(c.get(), 6);
    }

    #[test]
    fn gauge_set_and_add() {
        let g = Gauge::new();
        g.set(10);
        g.add(-3);
        assert_eq!(g.get(), 7);
    }

    #[test]
    fn histogram_buckets_and_mean() {
        let h = Histogram::new(&[1_000, 5_000]);
        h.observe(500);
        h.observe(4_000);
        h.observe(10_000);
        assert_eq!(h.count(), 3);
        assert!((h.mean_us() - (500.0 + 4_000.0 + 10_000.0) / 3.0).abs() < 0.01);
    }
}
