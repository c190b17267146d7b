//! Linear resource obligations.
//!
//! An obligation is reserved, then resolved exactly once by either
//! [`ObligationTable::commit`] or [`ObligationTable::abort`]. An
//! obligation still `Reserved` when its owning region finishes draining
//! is a leak: it is flagged `Leaked`, never silently dropped, and
//! handled per the table's configured [`LeakPolicy`].

use crate::error::Error;
use crate::types::id::OBLIGATION_TAG;
use crate::types::{RegionId, TaskId};
use crate::util::{Arena, Handle};

/// Identifier for a reserved obligation, re-exported from [`crate::types`]
/// as [`crate::types::ObligationId`]; kept local here to avoid a cycle
/// between `types` and `obligation`.
pub use crate::types::ObligationId;

/// The linear state of an obligation. Exactly one of `Committed` or
/// `Aborted` is reachable from `Reserved`; `Leaked` is reachable only
/// through region drain discovering an obligation still `Reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObligationState {
    Reserved,
    Committed,
    Aborted,
    Leaked,
}

impl ObligationState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Reserved)
    }
}

/// What to do when region drain discovers a leaked obligation. Leak
/// reporting is always observable-only — it never alters the region's or
/// obligation's semantic state, only how the leak is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LeakPolicy {
    /// Report every leak as escalated (panic-severity), immediately.
    Panic,
    /// Record the leak in the error ledger and telemetry at log severity.
    Log,
    /// Mark the obligation `Leaked` with no observable side effect
    /// beyond the state transition itself.
    Silent,
    /// Report at log severity until more than `threshold` leaks have been
    /// seen over this table's lifetime, then escalate every leak after
    /// that to panic-severity.
    Recover { threshold: u32 },
}

/// How one discovered leak was actually reported, after consulting the
/// table's [`LeakPolicy`] and its running leak count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakReport {
    Silent,
    Logged,
    Escalated,
}

#[derive(Debug, Clone)]
struct ObligationSlot {
    owner_region: RegionId,
    owner_task: Option<TaskId>,
    state: ObligationState,
    label: &'static str,
}

/// Arena-backed table of all obligations live in the runtime.
#[derive(Debug)]
pub struct ObligationTable {
    arena: Arena<ObligationSlot>,
    leak_policy: LeakPolicy,
    leak_count: u32,
}

impl ObligationTable {
    #[must_use]
    pub fn with_capacity(capacity: usize, leak_policy: LeakPolicy) -> Self {
        Self {
            arena: Arena::with_capacity(OBLIGATION_TAG, capacity),
            leak_policy,
            leak_count: 0,
        }
    }

    #[must_use]
    pub const fn leak_policy(&self) -> LeakPolicy {
        self.leak_policy
    }

    /// Classifies one freshly discovered leak against the configured
    /// policy, bumping the table's running leak count first so a
    /// `Recover` threshold is evaluated against the post-increment count.
    fn classify_leak(&mut self) -> LeakReport {
        self.leak_count += 1;
        match self.leak_policy {
            LeakPolicy::Silent => LeakReport::Silent,
            LeakPolicy::Log => LeakReport::Logged,
            LeakPolicy::Panic => LeakReport::Escalated,
            LeakPolicy::Recover { threshold } => {
                if self.leak_count > threshold {
                    LeakReport::Escalated
                } else {
                    LeakReport::Logged
                }
            }
        }
    }

    /// Reserves a new obligation owned by `region` (and optionally a
    /// specific `task`), returning its id.
    pub fn reserve(
        &mut self,
        region: RegionId,
        task: Option<TaskId>,
        label: &'static str,
    ) -> Result<ObligationId, Error> {
        let handle = self.arena.allocate(
            0,
            ObligationSlot {
                owner_region: region,
                owner_task: task,
                state: ObligationState::Reserved,
                label,
            },
        )?;
        Ok(ObligationId::from_handle(handle))
    }

    fn transition(&mut self, id: ObligationId, to: ObligationState) -> Result<(), Error> {
        let slot = self.arena.get_mut(id.handle())?;
        crate::runtime::transition::check_obligation_transition(slot.state, to)?;
        slot.state = to;
        Ok(())
    }

    /// Resolves an obligation as committed: the resource was consumed as
    /// intended.
    pub fn commit(&mut self, id: ObligationId) -> Result<(), Error> {
        self.transition(id, ObligationState::Committed)
    }

    /// Resolves an obligation as aborted: the resource was released
    /// without being consumed.
    pub fn abort(&mut self, id: ObligationId) -> Result<(), Error> {
        self.transition(id, ObligationState::Aborted)
    }

    #[must_use]
    pub fn state(&self, id: ObligationId) -> Option<ObligationState> {
        self.arena.get(id.handle()).ok().map(|s| s.state)
    }

    /// Scans all live obligations owned by `region` still `Reserved`,
    /// marks them `Leaked`, and classifies each against the configured
    /// leak policy, in ascending slot order for deterministic reporting.
    pub fn drain_leaks(&mut self, region: RegionId) -> Vec<(ObligationId, &'static str, LeakReport)> {
        let handles: Vec<Handle> = self
            .arena
            .live_handles()
            .filter(|h| {
                self.arena
                    .get(*h)
                    .is_ok_and(|s| s.owner_region == region && s.state == ObligationState::Reserved)
            })
            .collect();
        let mut leaked = Vec::with_capacity(handles.len());
        for h in handles {
            let label = match self.arena.get_mut(h) {
                Ok(slot) => {
                    slot.state = ObligationState::Leaked;
                    slot.label
                }
                Err(_) => continue,
            };
            let report = self.classify_leak();
            leaked.push((ObligationId::from_handle(h), label, report));
        }
        leaked
    }

    #[must_use]
    pub fn owner_task(&self, id: ObligationId) -> Option<TaskId> {
        self.arena.get(id.handle()).ok().and_then(|s| s.owner_task)
    }

    /// Count of obligations still `Reserved` across every region, without
    /// mutating anything — the read-only half of what `drain_leaks` would
    /// otherwise discover, used by quiescence checks.
    #[must_use]
    pub fn reserved_count(&self) -> usize {
        self.arena
            .live_handles()
            .filter(|h| self.arena.get(*h).is_ok_and(|s| s.state == ObligationState::Reserved))
            .count()
    }
}
