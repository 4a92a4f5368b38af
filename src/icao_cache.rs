//! Fixed-capacity ICAO address cache.
//!
//! Deliberately a single-slot-per-hash probabilistic filter, not a general
//! hash map: a DF0/4/5/16/20/21 frame's CRC is XORed with the sender's ICAO
//! address, so the only way to "verify" one of those frames is to check
//! whether the recovered address was recently seen as the explicit address
//! of a DF11/17/18 frame. False negatives (evicted-too-soon entries) are
//! acceptable; false positives are bounded by the 24-bit address space and
//! the TTL below.

use tracing::trace;

use crate::error::DecoderError;

/// Recency window for a cached ICAO address, in seconds.
pub const ICAO_CACHE_TTL_SECS: u32 = 60;

/// Default slot count (power of two, per `IcaoCache::new`).
pub const DEFAULT_ICAO_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Slot {
    icao: u32,
    seen_at: u32,
}

/// Open-addressed, one-slot-per-hash ICAO address cache.
pub struct IcaoCache {
    slots: Box<[Option<Slot>]>,
    capacity: usize,
}

impl IcaoCache {
    /// Build a cache with the given capacity, which MUST be a power of two.
    pub fn new(capacity: usize) -> Result<Self, DecoderError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(DecoderError::CapacityNotPowerOfTwo(capacity));
        }
        Ok(Self {
            slots: vec![None; capacity].into_boxed_slice(),
            capacity,
        })
    }

    /// The three-round multiply-XOR hash, reduced into the cache's slot range.
    fn slot_index(&self, icao: u32) -> usize {
        let mut h = icao;
        h = (h >> 16 ^ h).wrapping_mul(0x45d9f3b);
        h = (h >> 16 ^ h).wrapping_mul(0x45d9f3b);
        h = h >> 16 ^ h;
        (h as usize) % self.capacity
    }

    /// Record `icao` as seen at `now_secs`, evicting whatever previously
    /// occupied that hash slot.
    pub fn add(&mut self, icao: u32, now_secs: u32) {
        let idx = self.slot_index(icao);
        self.slots[idx] = Some(Slot {
            icao,
            seen_at: now_secs,
        });
    }

    /// True iff `icao`'s slot currently holds `icao` and it was added within
    /// the last [`ICAO_CACHE_TTL_SECS`] seconds of `now_secs`.
    pub fn contains_recent(&self, icao: u32, now_secs: u32) -> bool {
        let idx = self.slot_index(icao);
        let hit = match self.slots[idx] {
            Some(slot) if slot.icao == icao => {
                now_secs.saturating_sub(slot.seen_at) <= ICAO_CACHE_TTL_SECS
            }
            _ => false,
        };
        trace!(icao = format!("{:06X}", icao), hit, "icao cache lookup");
        hit
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for IcaoCache {
    fn default() -> Self {
        Self {
            slots: vec![None; DEFAULT_ICAO_CACHE_CAPACITY].into_boxed_slice(),
            capacity: DEFAULT_ICAO_CACHE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_capacity() {
        assert!(IcaoCache::new(0).is_err());
        assert!(IcaoCache::new(100).is_err());
        assert!(IcaoCache::new(1024).is_ok());
    }

    #[test]
    fn ttl_boundary() {
        let mut cache = IcaoCache::default();
        let a = 0x4B1A1E;
        cache.add(a, 1000);
        assert!(cache.contains_recent(a, 1000));
        assert!(cache.contains_recent(a, 1000 + 60));
        assert!(!cache.contains_recent(a, 1000 + 61));
    }

    #[test]
    fn unknown_address_is_absent() {
        let cache = IcaoCache::default();
        assert!(!cache.contains_recent(0xABCDEF, 0));
    }

    #[test]
    fn eviction_on_hash_collision() {
        // Force a collision by capacity=2 and picking two addresses that land
        // on the same slot; the most recent insert wins the slot.
        let mut cache = IcaoCache::new(2).unwrap();
        let slot_of = |icao: u32| {
            let mut h = icao;
            h = (h >> 16 ^ h).wrapping_mul(0x45d9f3b);
            h = (h >> 16 ^ h).wrapping_mul(0x45d9f3b);
            h = h >> 16 ^ h;
            (h as usize) % 2
        };
        let mut by_slot: std::collections::HashMap<usize, Vec<u32>> = std::collections::HashMap::new();
        for icao in 0u32..5000 {
            by_slot.entry(slot_of(icao)).or_default().push(icao);
        }
        let collisions = by_slot.values().find(|v| v.len() >= 2).unwrap();
        let (a, b) = (collisions[0], collisions[1]);

        cache.add(a, 10);
        assert!(cache.contains_recent(a, 10));
        cache.add(b, 20);
        assert!(cache.contains_recent(b, 20));
        assert!(!cache.contains_recent(a, 20));
    }
}
