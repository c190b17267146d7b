//! The runtime singleton: owns every arena, the obligation table, the
//! resource engine, host hooks, telemetry, and the error ledger, and
//! implements the region lifecycle operations (`open`, `spawn`, `close`,
//! `drain`, `poison`) that drive everything else.

pub mod clock;
pub mod region;
pub mod resource;
pub mod scheduler;
pub mod timer;
pub mod transition;

pub use clock::{Clock, DeterministicClock, HostHooks, Mode, SealableAllocator, SystemClock};
pub use region::{Checkpoint, CleanupCallback, PollOutcome, RegionSlot, TaskBody, TaskSlot};
pub use resource::{RegionLimits, ResourceEngine, ResourceKind};
pub use scheduler::{run, RunReport, StopReason};
pub use timer::TimerWheel;
pub use transition::{
    check_obligation_transition, check_region_transition, check_task_transition, RegionState, TaskState,
};

use crate::affinity::{AffinityDomain, AffinityReport, AffinityTable};
use crate::error::{Error, ErrorKind};
use crate::ledger::LedgerTable;
use crate::obligation::{LeakPolicy, LeakReport, ObligationTable};
use crate::trace::{EventKind, TraceRing};
use crate::types::id::{CHANNEL_TAG, REGION_TAG, TASK_TAG, TIMER_TAG};
use crate::types::{Budget, CancelReason, ChannelId, RegionId, TaskId, TimerId};
use crate::util::{Arena, Handle};

/// Fixed-capacity configuration for a [`Runtime`]. All arenas are
/// fixed-size, per the handle arena design — there is no dynamic growth.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    pub region_capacity: usize,
    pub task_capacity: usize,
    pub obligation_capacity: usize,
    pub timer_capacity: usize,
    pub channel_capacity: usize,
    pub affinity_capacity: usize,
    pub region_limits: RegionLimits,
    pub leak_policy: LeakPolicy,
    pub trace_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            region_capacity: 256,
            task_capacity: 4096,
            obligation_capacity: 4096,
            timer_capacity: 1024,
            channel_capacity: 1024,
            affinity_capacity: 4096,
            region_limits: RegionLimits {
                capture_bytes_capacity: 1 << 20,
                cleanup_slots_capacity: 64,
            },
            leak_policy: LeakPolicy::Log,
            trace_capacity: 4096,
        }
    }
}

#[cfg(feature = "config-file")]
impl RuntimeConfig {
    /// Loads a `RuntimeConfig` from a TOML document covering every
    /// field. Never bypasses the arena-capacity validation that
    /// `Runtime::new` performs on the result — this only replaces how
    /// the config value itself is constructed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Error> {
        toml::from_str(toml_str).map_err(|_| Error::from(ErrorKind::InvalidArgument).with_context("malformed runtime config TOML"))
    }
}

/// Summary of one `drain` invocation.
#[derive(Debug, Clone)]
pub struct DrainReport {
    pub tasks_completed: u64,
    pub leaked: Vec<(crate::types::ObligationId, &'static str, LeakReport)>,
}

/// The condition in which no non-terminal tasks, no unresolved
/// obligations, and no open regions remain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuiescenceStatus {
    pub live_tasks: usize,
    pub reserved_obligations: usize,
    pub open_regions: usize,
}

impl QuiescenceStatus {
    #[must_use]
    pub const fn is_quiescent(&self) -> bool {
        self.live_tasks == 0 && self.reserved_obligations == 0 && self.open_regions == 0
    }
}

/// Folds an obligation label into a detail word for telemetry, so
/// `Reserve` events for differently labelled obligations fold differently
/// into the digest even when every other field matches.
fn label_detail(label: &str) -> u64 {
    use std::hash::Hasher;
    let mut hasher = crate::util::DetHasher::default();
    hasher.write(label.as_bytes());
    hasher.finish()
}

/// Owns every arena-backed entity kind plus the cross-cutting engines
/// (resources, telemetry, ledger) that validate and observe mutations
/// against them.
pub struct Runtime {
    pub(crate) regions: Arena<RegionSlot>,
    pub(crate) tasks: Arena<TaskSlot>,
    pub(crate) obligations: ObligationTable,
    pub(crate) timer_slots: Arena<()>,
    pub(crate) timers: TimerWheel,
    pub(crate) channel_slots: Arena<usize>,
    pub(crate) resources: ResourceEngine,
    pub(crate) affinity: AffinityTable,
    pub(crate) hooks: HostHooks,
    pub(crate) mode: Mode,
    pub(crate) trace: TraceRing,
    pub(crate) ledger: LedgerTable,
    pub(crate) round_index: u64,
}

impl Runtime {
    /// Builds a fresh runtime. Rejects a hook set that cannot satisfy
    /// `mode` (see [`HostHooks::validate_for_mode`]).
    pub fn new(mode: Mode, hooks: HostHooks, config: RuntimeConfig) -> Result<Self, Error> {
        hooks.validate_for_mode(mode)?;
        Ok(Self {
            regions: Arena::with_capacity(REGION_TAG, config.region_capacity),
            tasks: Arena::with_capacity(TASK_TAG, config.task_capacity),
            obligations: ObligationTable::with_capacity(config.obligation_capacity, config.leak_policy),
            timer_slots: Arena::with_capacity(TIMER_TAG, config.timer_capacity),
            timers: TimerWheel::new(),
            channel_slots: Arena::with_capacity(CHANNEL_TAG, config.channel_capacity),
            resources: ResourceEngine::new(
                [
                    config.region_capacity,
                    config.task_capacity,
                    config.obligation_capacity,
                    config.timer_capacity,
                    config.channel_capacity,
                ],
                config.region_limits,
            ),
            affinity: AffinityTable::with_capacity(config.affinity_capacity),
            hooks,
            mode,
            trace: TraceRing::new(config.trace_capacity),
            ledger: LedgerTable::new(),
            round_index: 0,
        })
    }

    /// Binds `entity` to `domain` for affinity tracking. Debug-only
    /// observer: never changes how `entity` is scheduled or admitted.
    pub fn bind_affinity(&mut self, entity: Handle, domain: AffinityDomain) -> Result<(), Error> {
        self.affinity.bind(entity, domain)
    }

    /// Explicitly moves `entity` to a new affinity domain.
    pub fn transfer_affinity(&mut self, entity: Handle, domain: AffinityDomain) -> Result<(), Error> {
        self.affinity.transfer(entity, domain)
    }

    /// Reports whether accessing `entity` from `accessing_domain` crosses
    /// affinity domains. Never rejects the access itself.
    pub fn check_affinity(&mut self, entity: Handle, accessing_domain: AffinityDomain) -> AffinityReport {
        self.affinity.check_access(entity, accessing_domain)
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn round_index(&self) -> u64 {
        self.round_index
    }

    /// The rolling telemetry digest over every event emitted so far.
    #[must_use]
    pub const fn digest(&self) -> u64 {
        self.trace.digest()
    }

    #[must_use]
    pub fn trace(&self) -> &TraceRing {
        &self.trace
    }

    #[must_use]
    pub fn ledger(&self) -> &LedgerTable {
        &self.ledger
    }

    /// Opens a new region, optionally nested under `parent`. `parent`
    /// must be `Open` (or absent); the new region starts `Open` with
    /// reset per-region counters.
    pub fn open_region(&mut self, parent: Option<RegionId>) -> Result<RegionId, Error> {
        if let Some(p) = parent {
            if !self.region_state(p)?.accepts_new_spawns() {
                return Err(ErrorKind::RegionNotOpen.into());
            }
        }
        self.resources.reserve(ResourceKind::Region, 1)?;
        let handle = match self.regions.allocate(0, RegionSlot::new(parent)) {
            Ok(h) => h,
            Err(e) => {
                self.resources.release(ResourceKind::Region, 1);
                return Err(e);
            }
        };
        self.trace.emit(EventKind::RegionOpen, handle, 0);
        tracing::trace!(region = ?handle, parent = ?parent, "region opened");
        Ok(RegionId::from_handle(handle))
    }

    /// Spawns `body` into `region`, reserving a task slot and, if
    /// `capture_bytes > 0`, that much capture-byte budget. Rolls back the
    /// task-slot reservation if the capture-byte reservation fails.
    pub fn spawn(
        &mut self,
        region: RegionId,
        capture_bytes: usize,
        body: Box<dyn TaskBody>,
    ) -> Result<TaskId, Error> {
        if !self.region_state(region)?.accepts_new_spawns() {
            return Err(ErrorKind::RegionNotOpen.into());
        }
        self.resources.reserve(ResourceKind::Task, 1)?;
        if let Err(e) = self.resources.reserve_capture_bytes(region, capture_bytes) {
            self.resources.release(ResourceKind::Task, 1);
            return Err(e);
        }
        let handle = match self.tasks.allocate(0, TaskSlot::new(region, body)) {
            Ok(h) => h,
            Err(e) => {
                self.resources.release(ResourceKind::Task, 1);
                self.resources.release_capture_bytes(region, capture_bytes);
                return Err(e);
            }
        };
        Ok(TaskId::from_handle(handle))
    }

    /// Defers `cb` to run LIFO when `region` reaches `drain`. Reserves
    /// one of the region's fixed cleanup-stack slots; `ResourceExhausted`
    /// once that limit is reached.
    pub fn defer_cleanup(&mut self, region: RegionId, cb: CleanupCallback) -> Result<(), Error> {
        self.resources.reserve_cleanup_slot(region)?;
        self.regions.get_mut(region.handle())?.defer(cb);
        Ok(())
    }

    /// Reserves a new obligation owned by `region` (and optionally a
    /// specific `task`).
    pub fn reserve_obligation(
        &mut self,
        region: RegionId,
        task: Option<TaskId>,
        label: &'static str,
    ) -> Result<crate::types::ObligationId, Error> {
        let id = self.obligations.reserve(region, task, label)?;
        self.trace.emit(EventKind::Reserve, id.handle(), label_detail(label));
        Ok(id)
    }

    /// Resolves an obligation as committed.
    pub fn commit_obligation(&mut self, id: crate::types::ObligationId) -> Result<(), Error> {
        self.obligations.commit(id)?;
        self.trace.emit(EventKind::Commit, id.handle(), 0);
        Ok(())
    }

    /// Resolves an obligation as aborted.
    pub fn abort_obligation(&mut self, id: crate::types::ObligationId) -> Result<(), Error> {
        self.obligations.abort(id)?;
        self.trace.emit(EventKind::Abort, id.handle(), 0);
        Ok(())
    }

    #[must_use]
    pub fn obligation_state(&self, id: crate::types::ObligationId) -> Option<crate::obligation::ObligationState> {
        self.obligations.state(id)
    }

    /// Rejects new spawns and reservations against `region`; tasks
    /// already running continue to be polled.
    pub fn close_region(&mut self, region: RegionId) -> Result<(), Error> {
        let state = self.region_state(region)?;
        check_region_transition(state, RegionState::Closing)?;
        self.regions.get_mut(region.handle())?.state = RegionState::Closing;
        Ok(())
    }

    /// Poisons `region` (legal only from `Open`): rejects all further
    /// admission and cooperatively cancels every non-terminal task.
    /// Returns the number of tasks cancelled.
    pub fn poison_region(&mut self, region: RegionId, reason: CancelReason) -> Result<usize, Error> {
        let state = self.region_state(region)?;
        check_region_transition(state, RegionState::Poisoned)?;
        self.regions.get_mut(region.handle())?.state = RegionState::Poisoned;
        self.trace.emit(EventKind::RegionPoison, region.handle(), u64::from(reason.kind.severity()));
        tracing::warn!(region = ?region.handle(), kind = ?reason.kind, "region poisoned");
        self.cancel_region(region, reason)
    }

    /// Requests cancellation of `task` with `reason`. A no-op on a
    /// terminal task. Strengthens any reason already pending rather than
    /// overwriting it outright.
    pub fn request_cancel(&mut self, task: TaskId, reason: CancelReason) -> Result<(), Error> {
        let slot = self.tasks.get(task.handle())?;
        if slot.state.is_terminal() {
            return Ok(());
        }
        let merged = match &slot.cancel_requested_reason {
            Some(existing) => crate::types::strengthen(existing, &reason),
            None => reason.clone(),
        };
        let state = slot.state;

        if state == TaskState::Running {
            check_task_transition(TaskState::Running, TaskState::CancelRequested)?;
            let slot = self.tasks.get_mut(task.handle())?;
            slot.state = TaskState::CancelRequested;
        }
        let severity = u64::from(merged.kind.severity());
        self.tasks.get_mut(task.handle())?.cancel_requested_reason = Some(merged);
        self.trace.emit(EventKind::Cancel, task.handle(), severity);
        Ok(())
    }

    /// Requests cancellation of every non-terminal task in `region` with
    /// `reason`, in ascending slot order, returning the count affected.
    pub fn cancel_region(&mut self, region: RegionId, reason: CancelReason) -> Result<usize, Error> {
        let tasks = self.tasks_in_region_ascending(region, false);
        for task in &tasks {
            self.request_cancel(*task, reason.clone())?;
        }
        Ok(tasks.len())
    }

    /// Drives `region` from `Closing` through `Draining`, `Finalizing`,
    /// to `Closed`: runs the scheduler until every task is terminal or
    /// `budget` is exhausted, runs the cleanup stack LIFO, and reports
    /// any obligation still `Reserved` as `Leaked`.
    pub fn drain(&mut self, region: RegionId, budget: Budget) -> Result<DrainReport, Error> {
        let state = self.region_state(region)?;
        check_region_transition(state, RegionState::Draining)?;
        self.regions.get_mut(region.handle())?.state = RegionState::Draining;

        let run_report = scheduler::run(self, region, budget)?;

        let state = self.region_state(region)?;
        check_region_transition(state, RegionState::Finalizing)?;
        self.regions.get_mut(region.handle())?.state = RegionState::Finalizing;

        let leaks = self.obligations.drain_leaks(region);
        for (id, label, report) in &leaks {
            if *report == LeakReport::Silent {
                continue;
            }
            let detail = u64::from(*report == LeakReport::Escalated);
            self.trace.emit(EventKind::Leak, id.handle(), detail);
            if *report == LeakReport::Escalated {
                tracing::error!(obligation = ?id.handle(), label, "obligation leaked");
            } else {
                tracing::debug!(obligation = ?id.handle(), label, "obligation leaked");
            }
            if let Some(owner) = self.obligations.owner_task(*id) {
                self.ledger.record(owner, ErrorKind::UnresolvedObligations, label, "drain");
            }
        }

        self.regions.get_mut(region.handle())?.run_cleanup_stack();

        let used_bytes = self.resources.capture_bytes_used(region);
        self.resources.release_capture_bytes(region, used_bytes);
        let used_slots = self.resources.cleanup_slots_used(region);
        for _ in 0..used_slots {
            self.resources.release_cleanup_slot(region);
        }
        self.resources.forget_region(region);

        let state = self.region_state(region)?;
        check_region_transition(state, RegionState::Closed)?;
        self.regions.get_mut(region.handle())?.state = RegionState::Closed;
        self.resources.release(ResourceKind::Region, 1);
        self.trace.emit(EventKind::RegionClose, region.handle(), 0);
        tracing::trace!(region = ?region.handle(), tasks_completed = run_report.tasks_completed, "region closed");

        Ok(DrainReport {
            tasks_completed: run_report.tasks_completed,
            leaked: leaks,
        })
    }

    /// Registers a timer expiring at `deadline`, reserving one slot from
    /// both the timer arena and the resource engine.
    pub fn register_timer(&mut self, deadline: crate::types::Time) -> Result<TimerId, Error> {
        self.resources.reserve(ResourceKind::Timer, 1)?;
        let handle = match self.timer_slots.allocate(0, ()) {
            Ok(h) => h,
            Err(e) => {
                self.resources.release(ResourceKind::Timer, 1);
                return Err(e);
            }
        };
        let id = TimerId::from_handle(handle);
        self.timers.register(id, deadline);
        Ok(id)
    }

    /// Cancels a timer. Idempotent: cancelling an already-fired (and
    /// thus already-reclaimed) timer is a silent no-op, matching the
    /// round-trip guarantee that `timer_cancel` never errors on a timer
    /// that has already expired.
    pub fn cancel_timer(&mut self, id: TimerId) -> Result<(), Error> {
        if self.timer_slots.get(id.handle()).is_err() {
            return Ok(());
        }
        self.timer_slots.reclaim(id.handle())?;
        self.timers.cancel(id);
        self.resources.release(ResourceKind::Timer, 1);
        Ok(())
    }

    /// Pops every timer due at or before `now`, reclaims their arena
    /// slots, and emits a `TimerFire` telemetry event for each, in
    /// `(deadline, registration order)` order.
    pub fn fire_timers(&mut self, now: crate::types::Time) -> Vec<TimerId> {
        let expired = self.timers.collect_expired(now);
        for id in &expired {
            let _ = self.timer_slots.reclaim(id.handle());
            self.resources.release(ResourceKind::Timer, 1);
            self.trace.emit(EventKind::TimerFire, id.handle(), now.as_nanos());
        }
        expired
    }

    /// Registers a new bounded-channel id with `capacity`, for liveness
    /// bookkeeping; the actual queue lives in a caller-owned
    /// [`crate::channel::BoundedChannel`].
    pub fn register_channel(&mut self, capacity: usize) -> Result<ChannelId, Error> {
        self.resources.reserve(ResourceKind::Channel, 1)?;
        let handle = match self.channel_slots.allocate(0, capacity) {
            Ok(h) => h,
            Err(e) => {
                self.resources.release(ResourceKind::Channel, 1);
                return Err(e);
            }
        };
        Ok(ChannelId::from_handle(handle))
    }

    /// Releases a channel id once its queue has been fully drained and
    /// dropped. `ChannelNotDrained` if the caller reports outstanding
    /// queued values.
    pub fn forget_channel(&mut self, id: ChannelId, drained: bool) -> Result<(), Error> {
        if !drained {
            return Err(ErrorKind::ChannelNotDrained.into());
        }
        self.channel_slots.reclaim(id.handle())?;
        self.resources.release(ResourceKind::Channel, 1);
        Ok(())
    }

    /// The condition in which no non-terminal tasks, no unresolved
    /// obligations, and no open (non-`Closed`) regions remain.
    #[must_use]
    pub fn quiescence(&self) -> QuiescenceStatus {
        let live_tasks = self
            .tasks
            .live_handles()
            .filter(|h| self.tasks.get(*h).is_ok_and(|t| !t.state.is_terminal()))
            .count();
        let reserved_obligations = self.obligations.reserved_count();
        let open_regions = self
            .regions
            .live_handles()
            .filter(|h| self.regions.get(*h).is_ok_and(|r| !matches!(r.state, RegionState::Closed)))
            .count();
        QuiescenceStatus {
            live_tasks,
            reserved_obligations,
            open_regions,
        }
    }

    /// `Ok` only at full quiescence; otherwise the most informative
    /// quiescence-family error for what remains outstanding.
    pub fn check_quiescence(&self) -> Result<(), Error> {
        let status = self.quiescence();
        if status.is_quiescent() {
            return Ok(());
        }
        if status.live_tasks > 0 {
            return Err(ErrorKind::QuiescenceTasksLive.into());
        }
        if status.reserved_obligations > 0 {
            return Err(ErrorKind::ObligationsUnresolved.into());
        }
        Err(ErrorKind::RegionsNotClosed.into())
    }

    #[must_use]
    pub(crate) fn region_state_unchecked(&self, region: RegionId) -> Option<RegionState> {
        self.regions.get(region.handle()).ok().map(|r| r.state)
    }

    /// Rebuilds every arena, engine, and ring from scratch under the same
    /// `mode` and `config`, but a fresh `hooks` set — for test isolation
    /// between scenarios that would otherwise share process-wide state.
    /// Idempotent: resetting an already-fresh runtime changes nothing
    /// observable.
    pub fn reset(&mut self, hooks: HostHooks, config: RuntimeConfig) -> Result<(), Error> {
        *self = Self::new(self.mode, hooks, config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::region::PollOutcome;
    use crate::types::{CancelKind, Outcome, Time};

    fn rt() -> Runtime {
        Runtime::new(Mode::Deterministic, HostHooks::deterministic(1), RuntimeConfig::default()).unwrap()
    }

    #[test]
    fn open_region_then_spawn_then_run_reaches_closed() {
        let mut r = rt();
        let region = r.open_region(None).unwrap();
        r.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(())))).unwrap();
        run(&mut r, region, Budget::new()).unwrap();
        r.close_region(region).unwrap();
        let report = r.drain(region, Budget::new()).unwrap();
        assert_eq!(report.tasks_completed, 0);
        assert_eq!(r.region_state_unchecked(region), Some(RegionState::Closed));
    }

    #[test]
    fn spawn_into_non_open_region_is_rejected() {
        let mut r = rt();
        let region = r.open_region(None).unwrap();
        r.close_region(region).unwrap();
        let err = r
            .spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(()))))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::RegionNotOpen));
    }

    #[test]
    fn poison_cancels_every_non_terminal_task() {
        let mut r = rt();
        let region = r.open_region(None).unwrap();
        let t1 = r.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Pending)).unwrap();
        let t2 = r.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Pending)).unwrap();
        run(&mut r, region, Budget::new().with_poll_quota(2)).unwrap();
        let reason = CancelReason::new(CancelKind::Shutdown, region, Time::ZERO);
        let affected = r.poison_region(region, reason).unwrap();
        assert_eq!(affected, 2);
        assert!(r.tasks.get(t1.handle()).unwrap().cancel_requested_reason.is_some());
        assert!(r.tasks.get(t2.handle()).unwrap().cancel_requested_reason.is_some());
    }

    #[test]
    fn drain_reports_leaked_obligation() {
        let mut r = rt();
        let region = r.open_region(None).unwrap();
        r.obligations.reserve(region, None, "socket").unwrap();
        r.close_region(region).unwrap();
        let report = r.drain(region, Budget::new()).unwrap();
        assert_eq!(report.leaked.len(), 1);
        assert_eq!(r.region_state_unchecked(region), Some(RegionState::Closed));
    }

    #[test]
    fn committed_obligation_leaves_no_leak_report() {
        let mut r = rt();
        let region = r.open_region(None).unwrap();
        let ob = r.obligations.reserve(region, None, "lock").unwrap();
        r.obligations.commit(ob).unwrap();
        r.close_region(region).unwrap();
        let report = r.drain(region, Budget::new()).unwrap();
        assert!(report.leaked.is_empty());
    }

    #[test]
    fn timer_register_then_fire_emits_event_and_reclaims_slot() {
        let mut r = rt();
        let id = r.register_timer(Time::from_secs(1)).unwrap();
        let fired = r.fire_timers(Time::from_secs(1));
        assert_eq!(fired, vec![id]);
        assert!(r.timer_slots.get(id.handle()).is_err());
    }

    #[test]
    fn cancel_timer_is_idempotent_after_it_already_fired() {
        let mut r = rt();
        let id = r.register_timer(Time::from_secs(1)).unwrap();
        r.fire_timers(Time::from_secs(1));
        assert!(r.cancel_timer(id).is_ok());
        assert!(r.cancel_timer(id).is_ok());
    }

    #[test]
    fn quiescence_reports_nonzero_live_tasks() {
        let mut r = rt();
        let region = r.open_region(None).unwrap();
        r.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Pending)).unwrap();
        assert!(!r.quiescence().is_quiescent());
        assert!(matches!(r.check_quiescence().unwrap_err().kind(), ErrorKind::QuiescenceTasksLive));
    }

    #[test]
    fn quiescent_runtime_reports_ok() {
        let r = rt();
        assert!(r.quiescence().is_quiescent());
        assert!(r.check_quiescence().is_ok());
    }

    #[test]
    fn deferred_cleanup_runs_lifo_during_drain() {
        use std::sync::{Arc, Mutex};
        let mut r = rt();
        let region = r.open_region(None).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            r.defer_cleanup(region, Box::new(move || order.lock().unwrap().push(i))).unwrap();
        }
        r.close_region(region).unwrap();
        r.drain(region, Budget::new()).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }
}
