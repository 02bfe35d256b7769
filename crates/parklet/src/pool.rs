//! Shared slot accounting for the parking lot.
//!
//! One mutex covers the free count and the holder set together: no
//! operation may observe or produce the two out of sync. The lock is held
//! only for the O(1) span of a single operation, never across I/O.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::protocol::ConnectionId;

/// Fixed-capacity slot pool shared by every connection handler.
///
/// Structurally a counting semaphore with identity-tracked ownership:
/// release only succeeds for an identity that actually holds a slot, and a
/// holder acquiring again does not decrement twice.
pub struct SlotPool {
    capacity: usize,
    state: Mutex<LotState>,
}

struct LotState {
    available: usize,
    holders: HashSet<ConnectionId>,
}

/// Consistent view of the lot, taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LotSnapshot {
    pub available: usize,
    pub capacity: usize,
    pub held: usize,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LotState {
                available: capacity,
                holders: HashSet::with_capacity(capacity),
            }),
        }
    }

    /// Free-slot count. No side effect.
    pub fn query(&self) -> usize {
        self.lock().available
    }

    /// Try to take a slot for `id`.
    ///
    /// An identity already holding a slot gets `true` without a second
    /// decrement; membership in the holder set is the sole truth.
    pub fn acquire(&self, id: ConnectionId) -> bool {
        let mut state = self.lock();
        if state.holders.contains(&id) {
            tracing::debug!(conn = %id, "acquire while already holding");
            return true;
        }
        if state.available == 0 {
            return false;
        }
        state.available -= 1;
        state.holders.insert(id);
        debug_assert_eq!(state.available, self.capacity - state.holders.len());
        true
    }

    /// Give `id`'s slot back.
    ///
    /// `false` (and no change) when it holds none, so `available` can never
    /// rise above `capacity`.
    pub fn release(&self, id: ConnectionId) -> bool {
        let mut state = self.lock();
        if !state.holders.remove(&id) {
            return false;
        }
        state.available += 1;
        debug_assert_eq!(state.available, self.capacity - state.holders.len());
        true
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> LotSnapshot {
        let state = self.lock();
        LotSnapshot {
            available: state.available,
            capacity: self.capacity,
            held: state.holders.len(),
        }
    }

    /// No operation leaves the state partially applied, so a poisoned lock
    /// still guards a consistent value and is safe to recover.
    fn lock(&self) -> MutexGuard<'_, LotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
