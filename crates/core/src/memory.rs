//! Arena and pool patterns standing in for the reference's manual memory
//! pools: a reset-then-bump per-tick arena, a fixed-block free-list
//! allocator, and a capacity-bounded vector that falls back to heap growth
//! rather than panicking under load.

/// Per-tick scratch arena. `reset()` at the top of every tick; allocations
/// made during the tick are valid until the next reset. Modeled as a bump
/// offset into a preallocated byte buffer so no per-tick heap traffic
/// occurs in the steady state.
pub struct TickArena {
    capacity: usize,
    used: usize,
    overflowed: bool,
}

impl TickArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: 0,
            overflowed: false,
        }
    }

    /// Resets the bump offset; must run before anything else in the tick
    /// (testable property: the arena is empty at the start of every tick).
    pub fn reset(&mut self) {
        self.used = 0;
        self.overflowed = false;
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Reserves `size` bytes, bumping the offset. Returns `false` and sets
    /// the overflow flag on exhaustion; the tick loop treats this as a
    /// resource-exhaustion error (log and force early-tick termination).
    pub fn allocate(&mut self, size: usize) -> bool {
        if self.used + size > self.capacity {
            self.overflowed = true;
            return false;
        }
        self.used += size;
        true
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn used(&self) -> usize {
        self.used
    }
}

/// A fixed-capacity free-list pool of `T`. `acquire`/`release` avoid heap
/// churn for short-lived, frequently recycled objects (e.g. hit-test scratch
/// records). Falls back to direct heap allocation past capacity rather than
/// failing — exhaustion is logged by the caller, not fatal.
pub struct BlockPool<T> {
    capacity: usize,
    free: Vec<T>,
    live_count: usize,
}

impl<T> BlockPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: Vec::with_capacity(capacity),
            live_count: 0,
        }
    }

    pub fn acquire(&mut self, make: impl FnOnce() -> T) -> T {
        self.live_count += 1;
        self.free.pop().unwrap_or_else(make)
    }

    /// Returns `false` (caller should drop the value) when the pool is
    /// already at capacity — this is the heap-fallback path.
    pub fn release(&mut self, value: T) -> bool {
        self.live_count = self.live_count.saturating_sub(1);
        if self.free.len() < self.capacity {
            self.free.push(value);
            true
        } else {
            false
        }
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.live_count >= self.capacity && self.free.is_empty()
    }
}

/// A vector bounded to a soft capacity: pushes past the bound still
/// succeed (heap fallback) but are counted so callers can log and degrade.
pub struct BoundedVec<T> {
    inner: Vec<T>,
    soft_cap: usize,
    overflow_count: u64,
}

impl<T> BoundedVec<T> {
    pub fn new(soft_cap: usize) -> Self {
        Self {
            inner: Vec::with_capacity(soft_cap),
            soft_cap,
            overflow_count: 0,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.inner.len() >= self.soft_cap {
            self.overflow_count += 1;
        }
        self.inner.push(value);
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_resets_to_empty() {
        let mut arena = TickArena::new(64);
        arena.allocate(32);
        assert!(!arena.is_empty());
        arena.reset();
        assert!(arena.is_empty());
    }

    #[test]
    fn arena_overflow_is_reported() {
        let mut arena = TickArena::new(16);
        assert!(arena.allocate(8));
        assert!(!arena.allocate(9));
        assert!(arena.overflowed());
    }

    #[test]
    fn block_pool_reuses_released_values() {
        let mut pool: BlockPool<Vec<u8>> = BlockPool::new(2);
        let a = pool.acquire(Vec::new);
        pool.release(a);
        let b = pool.acquire(Vec::new);
        assert_eq!(pool.live_count(), 1);
        pool.release(b);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn block_pool_past_capacity_signals_fallback() {
        let mut pool: BlockPool<u32> = BlockPool::new(1);
        pool.release(1);
        let accepted = pool.release(2);
        assert!(!accepted);
    }

    #[test]
    fn bounded_vec_counts_overflow_but_still_grows() {
        let mut v = BoundedVec::new(2);
        v.push(1);
        v.push(2);
        v.push(3);
        assert_eq!(v.len(), 3);
        assert_eq!(v.overflow_count(), 1);
    }
}
