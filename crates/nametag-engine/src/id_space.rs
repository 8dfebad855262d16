//! Synthetic entity id allocation.
//!
//! Marker ids come from a reserved partition at the top of the positive
//! 32-bit range. Real entity ids that show up inside the partition are
//! reserved as soon as they are observed and are never handed out.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use nametag_config::IdentifierConfig;
use nametag_protocol::EntityId;

use crate::error::EngineError;

/// Process-wide allocator for marker entity ids. Safe to share between
/// connection threads.
#[derive(Debug)]
pub struct IdentifierSpace {
    range_start: i32,
    range_end: i32,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Next never-issued id. `i64` so stepping past `i32::MAX` cannot overflow.
    next: i64,
    /// Released ids, reused oldest first once fresh ids run out.
    recycled: VecDeque<i32>,
    live: HashSet<i32>,
    /// Real entity ids observed inside the partition.
    reserved: HashSet<i32>,
}

impl Inner {
    /// Whether `id` was handed out at some point. Ids below `next` were
    /// either issued or skipped because they were reserved.
    fn was_issued(&self, id: i32) -> bool {
        i64::from(id) < self.next && !self.reserved.contains(&id)
    }
}

impl IdentifierSpace {
    /// Creates an allocator over the inclusive range `start..=end`.
    pub fn new(range_start: i32, range_end: i32) -> Self {
        Self {
            range_start,
            range_end,
            inner: Mutex::new(Inner {
                next: i64::from(range_start),
                recycled: VecDeque::new(),
                live: HashSet::new(),
                reserved: HashSet::new(),
            }),
        }
    }

    /// Creates an allocator from configuration.
    pub fn from_config(config: &IdentifierConfig) -> Self {
        Self::new(config.range_start, config.range_end)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `id` lies inside the synthetic partition.
    pub fn contains(&self, id: EntityId) -> bool {
        (self.range_start..=self.range_end).contains(&id.0)
    }

    /// Issues an id that is neither live nor reserved.
    pub fn allocate(&self) -> Result<EntityId, EngineError> {
        let mut inner = self.lock();

        while inner.next <= i64::from(self.range_end) {
            let candidate = inner.next as i32;
            inner.next += 1;
            if !inner.reserved.contains(&candidate) {
                inner.live.insert(candidate);
                return Ok(EntityId(candidate));
            }
        }

        while let Some(candidate) = inner.recycled.pop_front() {
            if !inner.reserved.contains(&candidate) {
                inner.live.insert(candidate);
                return Ok(EntityId(candidate));
            }
        }

        Err(EngineError::IdentifierExhausted {
            start: self.range_start,
            end: self.range_end,
        })
    }

    /// Returns `id` to the pool. Releasing an id that is not live is a no-op.
    pub fn release(&self, id: EntityId) {
        let mut inner = self.lock();
        if !inner.live.remove(&id.0) {
            tracing::warn!(%id, "release of synthetic id that is not live");
            return;
        }
        if !inner.reserved.contains(&id.0) {
            inner.recycled.push_back(id.0);
        }
    }

    /// Records a real entity id seen on the wire. Ids inside the partition
    /// that were never issued are withdrawn from circulation. A released
    /// marker id showing up again is a late echo of our own packet and stays
    /// recyclable.
    pub fn observe_real_id(&self, id: EntityId) {
        if !self.contains(id) {
            return;
        }
        let mut inner = self.lock();
        if inner.was_issued(id.0) && !inner.live.contains(&id.0) {
            tracing::debug!(%id, "released marker id seen on the wire, not reserving it");
            return;
        }
        if inner.reserved.insert(id.0) {
            tracing::warn!(%id, "real entity id inside the synthetic range, reserving it");
            if inner.live.contains(&id.0) {
                tracing::error!(%id, "real entity id collides with a live marker");
            }
        }
    }

    /// Whether `id` is currently issued.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.lock().live.contains(&id.0)
    }

    /// Number of issued ids.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }
}

impl Default for IdentifierSpace {
    fn default() -> Self {
        Self::from_config(&IdentifierConfig::default())
    }
}
