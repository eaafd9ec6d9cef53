//! Fixed-capacity response cache shared by every connection handler.
//!
//! Locking: one mutex guards the whole slot array. `insert` holds it for its
//! entire scan and write. `lookup` takes it once per slot, so a lookup and an
//! insert may interleave between slots, but every slot is always observed with
//! its valid flag, tag, payload and usage counter in a consistent state.

use bytes::Bytes;
use parking_lot::Mutex;
use thiserror::Error;

mod key;
mod slot;

pub use key::CacheKey;
use slot::CacheSlot;

use crate::settings::Settings;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,
    #[error(
        "cache footprint of {slots} slots x {slot_size} bytes exceeds the configured limit of {limit} bytes"
    )]
    CapacityExceeded {
        slots: usize,
        slot_size: usize,
        limit: usize,
    },
}

/// Where [`ResponseCache::insert`] placed an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub slot: usize,
    /// True when a valid entry with a different tag was overwritten.
    pub evicted: bool,
}

#[derive(Debug)]
pub struct ResponseCache {
    slots: Mutex<Box<[CacheSlot]>>,
    capacity: usize,
    max_object_size: usize,
}

impl ResponseCache {
    pub fn new(
        capacity: usize,
        max_object_size: usize,
        max_cache_size: usize,
    ) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        let exceeded = CacheError::CapacityExceeded {
            slots: capacity,
            slot_size: max_object_size,
            limit: max_cache_size,
        };
        match capacity.checked_mul(max_object_size) {
            Some(footprint) if footprint <= max_cache_size => {}
            _ => return Err(exceeded),
        }

        let slots = vec![CacheSlot::default(); capacity].into_boxed_slice();
        Ok(Self {
            slots: Mutex::new(slots),
            capacity,
            max_object_size,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CacheError> {
        Self::new(
            settings.cache_slots,
            settings.max_object_size,
            settings.max_cache_size,
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_object_size(&self) -> usize {
        self.max_object_size
    }

    /// Scans every slot. Each valid slot has its usage counter bumped whether
    /// or not it matches; a matching slot is then reset to zero and its
    /// payload returned. The scan never stops early.
    pub fn lookup(&self, url: &str) -> Option<Bytes> {
        let mut hit = None;
        for idx in 0..self.capacity {
            let mut slots = self.slots.lock();
            let slot = &mut slots[idx];
            if !slot.valid {
                continue;
            }
            slot.touch();
            if slot.tag == url {
                hit = Some(slot.payload.clone());
                slot.usage = 0;
            }
        }
        hit
    }

    /// Stores `payload` under `url`. The caller enforces the object size limit.
    ///
    /// Every valid slot has its usage counter bumped during the scan. The
    /// target is, in order of preference: the slot already tagged `url`, the
    /// first invalid slot, or the valid slot with the highest usage counter
    /// seen before the bump (lowest index on ties).
    pub fn insert(&self, url: &str, payload: Bytes) -> InsertOutcome {
        debug_assert!(payload.len() <= self.max_object_size);

        let mut slots = self.slots.lock();
        let mut existing = None;
        let mut empty = None;
        let mut victim = 0usize;
        let mut victim_usage = None;

        for (idx, slot) in slots.iter_mut().enumerate() {
            if slot.valid {
                if victim_usage.is_none_or(|max| slot.usage > max) {
                    victim = idx;
                    victim_usage = Some(slot.usage);
                }
                if existing.is_none() && slot.tag == url {
                    existing = Some(idx);
                }
                slot.touch();
            } else if empty.is_none() {
                empty = Some(idx);
            }
        }

        let (slot, evicted) = match (existing, empty) {
            (Some(idx), _) => (idx, false),
            (None, Some(idx)) => (idx, false),
            (None, None) => (victim, true),
        };
        slots[slot].fill(url, payload);
        InsertOutcome { slot, evicted }
    }

    /// Tags of all valid slots, in slot order. Does not touch usage counters.
    pub fn resident_tags(&self) -> Vec<String> {
        self.slots
            .lock()
            .iter()
            .filter(|slot| slot.valid)
            .map(|slot| slot.tag.clone())
            .collect()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.slots.lock().iter().any(|slot| slot.matches(url))
    }

    #[cfg(test)]
    fn usages(&self) -> Vec<Option<u64>> {
        self.slots
            .lock()
            .iter()
            .map(|slot| slot.valid.then_some(slot.usage))
            .collect()
    }
}
