//! Host hooks: the clock, entropy, and allocator seams a runtime is
//! constructed against.
//!
//! Deterministic mode requires every hook that could otherwise introduce
//! nondeterminism — the logical clock, the entropy source — to be wired
//! to a seeded, replayable implementation. [`HostHooks::validate_for_mode`]
//! is the single gate that enforces this before a runtime accepts the
//! hook set.

use crate::error::{Error, ErrorKind};
use crate::types::Time;
use crate::util::{DetEntropy, EntropySource, OsEntropy};

/// Whether a runtime is constructed for deterministic replay or for
/// ordinary wall-clock operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Deterministic,
    Realtime,
}

/// A source of wall-clock and logical time.
pub trait Clock: std::fmt::Debug {
    /// Wall-clock nanoseconds, for diagnostics only — never consulted
    /// for scheduling decisions.
    fn wall_now_ns(&self) -> u64;

    /// Logical nanoseconds driving every scheduling decision. Under
    /// [`Mode::Deterministic`] this only ever advances when the
    /// scheduler explicitly asks it to.
    fn logical_now_ns(&self) -> u64;

    fn is_seeded(&self) -> bool;
}

/// Wall-clock time for both wall and logical readings. Not permitted in
/// deterministic mode.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn wall_now_ns(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos().min(u128::from(u64::MAX)) as u64)
            .unwrap_or(0)
    }

    fn logical_now_ns(&self) -> u64 {
        self.wall_now_ns()
    }

    fn is_seeded(&self) -> bool {
        false
    }
}

/// A logical clock advanced explicitly by the scheduler. Wall time is
/// reported as zero since it has no meaning in a replay.
#[derive(Debug, Default)]
pub struct DeterministicClock {
    logical_ns: u64,
}

impl DeterministicClock {
    #[must_use]
    pub const fn new() -> Self {
        Self { logical_ns: 0 }
    }

    pub fn advance_to(&mut self, time: Time) {
        self.logical_ns = self.logical_ns.max(time.as_nanos());
    }

    pub fn advance_by(&mut self, nanos: u64) {
        self.logical_ns = self.logical_ns.saturating_add(nanos);
    }
}

impl Clock for DeterministicClock {
    fn wall_now_ns(&self) -> u64 {
        0
    }

    fn logical_now_ns(&self) -> u64 {
        self.logical_ns
    }

    fn is_seeded(&self) -> bool {
        true
    }
}

/// A logical allocation handle. Opaque; only used to pair an `alloc`
/// with its matching `free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocId(u64);

/// A sealable logical allocator: bookkeeping for outstanding allocation
/// counts, not an actual memory allocator. Once [`SealableAllocator::seal`]
/// is called, every further `alloc`/`realloc` is rejected with
/// `AllocatorSealed`; `free` of already-outstanding allocations still
/// succeeds so teardown can proceed after seal.
#[derive(Debug, Default)]
pub struct SealableAllocator {
    next_id: u64,
    outstanding: usize,
    sealed: bool,
}

impl SealableAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            outstanding: 0,
            sealed: false,
        }
    }

    pub fn alloc(&mut self) -> Result<AllocId, Error> {
        if self.sealed {
            return Err(ErrorKind::AllocatorSealed.into());
        }
        let id = AllocId(self.next_id);
        self.next_id += 1;
        self.outstanding += 1;
        Ok(id)
    }

    pub fn realloc(&mut self, _id: AllocId) -> Result<(), Error> {
        if self.sealed {
            return Err(ErrorKind::AllocatorSealed.into());
        }
        Ok(())
    }

    pub fn free(&mut self, _id: AllocId) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }
}

/// The full host hook bundle a runtime is constructed against.
pub struct HostHooks {
    pub clock: Box<dyn Clock>,
    pub entropy: Box<dyn EntropySource>,
    pub allocator: SealableAllocator,
}

impl std::fmt::Debug for HostHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHooks")
            .field("clock", &self.clock)
            .field("entropy", &self.entropy)
            .field("allocator", &self.allocator)
            .finish()
    }
}

impl HostHooks {
    /// The production hook set: real wall clock, OS entropy.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            clock: Box::new(SystemClock),
            entropy: Box::new(OsEntropy),
            allocator: SealableAllocator::new(),
        }
    }

    /// The deterministic hook set: logical clock, seeded entropy.
    #[must_use]
    pub fn deterministic(seed: u64) -> Self {
        Self {
            clock: Box::new(DeterministicClock::new()),
            entropy: Box::new(DetEntropy::new(seed)),
            allocator: SealableAllocator::new(),
        }
    }

    /// Rejects a hook set that cannot satisfy the requested mode:
    /// deterministic mode requires both the clock and the entropy
    /// source to be seeded.
    pub fn validate_for_mode(&self, mode: Mode) -> Result<(), Error> {
        if mode == Mode::Deterministic && (!self.clock.is_seeded() || !self.entropy.is_seeded()) {
            return Err(ErrorKind::HookInvalid.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_clock_only_advances_when_told() {
        let mut clock = DeterministicClock::new();
        assert_eq!(clock.logical_now_ns(), 0);
        clock.advance_by(1000);
        assert_eq!(clock.logical_now_ns(), 1000);
    }

    #[test]
    fn deterministic_clock_advance_to_never_goes_backward() {
        let mut clock = DeterministicClock::new();
        clock.advance_to(Time::from_nanos(500));
        clock.advance_to(Time::from_nanos(100));
        assert_eq!(clock.logical_now_ns(), 500);
    }

    #[test]
    fn sealed_allocator_rejects_further_allocation() {
        let mut alloc = SealableAllocator::new();
        let id = alloc.alloc().unwrap();
        alloc.seal();
        assert!(matches!(alloc.alloc().unwrap_err().kind(), ErrorKind::AllocatorSealed));
        alloc.free(id);
        assert_eq!(alloc.outstanding(), 0);
    }

    #[test]
    fn realtime_hooks_fail_deterministic_validation() {
        let hooks = HostHooks::realtime();
        assert!(hooks.validate_for_mode(Mode::Deterministic).is_err());
        assert!(hooks.validate_for_mode(Mode::Realtime).is_ok());
    }

    #[test]
    fn deterministic_hooks_pass_deterministic_validation() {
        let hooks = HostHooks::deterministic(7);
        assert!(hooks.validate_for_mode(Mode::Deterministic).is_ok());
    }
}
