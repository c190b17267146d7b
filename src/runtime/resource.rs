//! Capacity accounting and admission gates.
//!
//! The resource engine tracks a counter per resource kind plus a
//! capture-byte and cleanup-slot counter per region, and exposes a
//! pre-flight `admit` predicate. Compound operations that reserve more
//! than one resource (e.g. `Runtime::spawn`'s task slot plus capture
//! bytes) reserve each step in turn and release whatever already
//! succeeded if a later step fails, the same inline rollback shape used
//! for every other multi-step admission in the runtime.

use crate::error::{Error, ErrorKind};
use crate::types::RegionId;
use crate::util::DetHashMap;

/// The kinds of fixed-capacity resource the engine accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Region,
    Task,
    Obligation,
    Timer,
    Channel,
}

const KIND_COUNT: usize = 5;

const fn kind_index(kind: ResourceKind) -> usize {
    match kind {
        ResourceKind::Region => 0,
        ResourceKind::Task => 1,
        ResourceKind::Obligation => 2,
        ResourceKind::Timer => 3,
        ResourceKind::Channel => 4,
    }
}

/// Per-region capture-byte and cleanup-stack-slot accounting.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RegionLimits {
    pub capture_bytes_capacity: usize,
    pub cleanup_slots_capacity: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct RegionUsage {
    capture_bytes_used: usize,
    cleanup_slots_used: usize,
}

/// Global and per-region capacity accounting.
#[derive(Debug)]
pub struct ResourceEngine {
    capacities: [usize; KIND_COUNT],
    used: [usize; KIND_COUNT],
    region_limits: RegionLimits,
    region_usage: DetHashMap<RegionId, RegionUsage>,
}

impl ResourceEngine {
    #[must_use]
    pub fn new(capacities: [usize; KIND_COUNT], region_limits: RegionLimits) -> Self {
        Self {
            capacities,
            used: [0; KIND_COUNT],
            region_limits,
            region_usage: DetHashMap::default(),
        }
    }

    #[must_use]
    pub fn capacity(&self, kind: ResourceKind) -> usize {
        self.capacities[kind_index(kind)]
    }

    #[must_use]
    pub fn used(&self, kind: ResourceKind) -> usize {
        self.used[kind_index(kind)]
    }

    /// Pre-flight predicate: would reserving `count` more of `kind`
    /// still fit within capacity?
    #[must_use]
    pub fn admit(&self, kind: ResourceKind, count: usize) -> bool {
        self.used(kind).saturating_add(count) <= self.capacity(kind)
    }

    /// Reserves `count` units of `kind`, failing with `ResourceExhausted`
    /// without mutating anything if it would not fit.
    pub fn reserve(&mut self, kind: ResourceKind, count: usize) -> Result<(), Error> {
        if !self.admit(kind, count) {
            return Err(ErrorKind::ResourceExhausted.into());
        }
        self.used[kind_index(kind)] += count;
        Ok(())
    }

    /// Releases `count` previously reserved units of `kind`, saturating
    /// at zero.
    pub fn release(&mut self, kind: ResourceKind, count: usize) {
        let idx = kind_index(kind);
        self.used[idx] = self.used[idx].saturating_sub(count);
    }

    fn region_usage_mut(&mut self, region: RegionId) -> &mut RegionUsage {
        self.region_usage.entry(region).or_default()
    }

    /// Reserves `bytes` of capture-byte budget for `region`.
    pub fn reserve_capture_bytes(&mut self, region: RegionId, bytes: usize) -> Result<(), Error> {
        let limit = self.region_limits.capture_bytes_capacity;
        let usage = self.region_usage_mut(region);
        if usage.capture_bytes_used.saturating_add(bytes) > limit {
            return Err(ErrorKind::ResourceExhausted.into());
        }
        usage.capture_bytes_used += bytes;
        Ok(())
    }

    pub fn release_capture_bytes(&mut self, region: RegionId, bytes: usize) {
        let usage = self.region_usage_mut(region);
        usage.capture_bytes_used = usage.capture_bytes_used.saturating_sub(bytes);
    }

    /// Reserves one cleanup-stack slot for `region`.
    pub fn reserve_cleanup_slot(&mut self, region: RegionId) -> Result<(), Error> {
        let limit = self.region_limits.cleanup_slots_capacity;
        let usage = self.region_usage_mut(region);
        if usage.cleanup_slots_used >= limit {
            return Err(ErrorKind::ResourceExhausted.into());
        }
        usage.cleanup_slots_used += 1;
        Ok(())
    }

    pub fn release_cleanup_slot(&mut self, region: RegionId) {
        let usage = self.region_usage_mut(region);
        usage.cleanup_slots_used = usage.cleanup_slots_used.saturating_sub(1);
    }

    #[must_use]
    pub fn capture_bytes_used(&self, region: RegionId) -> usize {
        self.region_usage.get(&region).map_or(0, |u| u.capture_bytes_used)
    }

    #[must_use]
    pub fn cleanup_slots_used(&self, region: RegionId) -> usize {
        self.region_usage.get(&region).map_or(0, |u| u.cleanup_slots_used)
    }

    /// Drops a region's accounting entirely once it has reached `Closed`.
    pub fn forget_region(&mut self, region: RegionId) {
        self.region_usage.remove(&region);
    }
}
