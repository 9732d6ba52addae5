//! Injected identity and time sources.
//!
//! Version and credential UUIDs, and every timestamp, come from these traits
//! rather than from process-wide state, so tests can pin them.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use uuid::Uuid;

/// Source of fresh UUIDs.
pub trait UuidGenerator: Send + Sync {
    fn generate(&self) -> Uuid;
}

/// Random (v4) UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUuidGenerator;

impl UuidGenerator for RandomUuidGenerator {
    fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Predictable UUIDs counting up from 1.
#[derive(Debug, Default)]
pub struct SequentialUuidGenerator {
    next: AtomicU64,
}

impl SequentialUuidGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UuidGenerator for SequentialUuidGenerator {
    fn generate(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Uuid::from_u128(u128::from(n))
    }
}

/// Source of the current time (Unix ms).
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
