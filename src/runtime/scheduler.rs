//! The single-threaded cooperative poll loop.
//!
//! `run` drives every non-terminal task in a region, in ascending
//! task-slot order, one round at a time, until the region's tasks are
//! all terminal, the budget's poll quota is exhausted, the budget's
//! deadline passes, or the region itself reaches a terminal state. The
//! same inputs — scenario, seed, budget, hook configuration — must
//! yield a byte-identical telemetry digest on every invocation.

use crate::error::{Error, ErrorKind};
use crate::runtime::region::{Checkpoint, PollOutcome};
use crate::runtime::transition::{check_task_transition, RegionState, TaskState};
use crate::runtime::Runtime;
use crate::trace::EventKind;
use crate::types::{Budget, CancelKind, CancelReason, Outcome, RegionId, Time};

/// Why a `run` invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every task in the region reached a terminal state.
    AllTasksTerminal,
    /// The region itself reached `Closed`.
    RegionTerminal,
    /// The budget's deadline passed; a deadline cancel was issued to
    /// every non-terminal task and `run` returned without polling
    /// further this invocation.
    DeadlineCancelled,
}

/// Summary of one `run` invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunReport {
    pub rounds: u64,
    pub polls_consumed: u64,
    pub tasks_completed: u64,
    pub stop_reason: Option<StopReason>,
}

/// Drives `region`'s non-terminal tasks to completion, or until the
/// budget or region state says to stop. `PollBudgetExhausted` is
/// returned, not carried in the report, since it is a contract
/// violation of the caller's supplied budget rather than a normal
/// stopping point.
pub fn run(rt: &mut Runtime, region: RegionId, mut budget: Budget) -> Result<RunReport, Error> {
    let mut report = RunReport::default();
    loop {
        let now = Time::from_nanos(rt.hooks.clock.logical_now_ns());

        if budget.is_expired(now) {
            let reason = CancelReason::new(CancelKind::Deadline, region, now);
            rt.cancel_region(region, reason)?;
            report.stop_reason = Some(StopReason::DeadlineCancelled);
            return Ok(report);
        }

        if rt.region_state(region)?.is_terminal() {
            report.stop_reason = Some(StopReason::RegionTerminal);
            return Ok(report);
        }

        let pending = rt.tasks_in_region_ascending(region, false);
        if pending.is_empty() {
            report.stop_reason = Some(StopReason::AllTasksTerminal);
            return Ok(report);
        }

        for task in pending {
            if budget.poll_quota_exhausted() {
                return Err(ErrorKind::PollBudgetExhausted.into());
            }
            budget.consume_poll();
            report.polls_consumed += 1;
            if rt.poll_one(task, now)? {
                report.tasks_completed += 1;
            }
        }
        rt.round_index += 1;
        report.rounds += 1;
    }
}

impl Runtime {
    /// Polls one task once. Returns whether it reached a terminal state
    /// this call.
    pub(crate) fn poll_one(&mut self, task_id: crate::types::TaskId, now: Time) -> Result<bool, Error> {
        let region = self.tasks.get(task_id.handle())?.region;

        let state = self.tasks.get(task_id.handle())?.state;
        if state == TaskState::Created {
            check_task_transition(TaskState::Created, TaskState::Running)?;
            self.tasks.get_mut(task_id.handle())?.state = TaskState::Running;
        }

        let state = self.tasks.get(task_id.handle())?.state;
        if state == TaskState::CancelRequested {
            check_task_transition(TaskState::CancelRequested, TaskState::Cancelling)?;
            self.tasks.get_mut(task_id.handle())?.state = TaskState::Cancelling;
        }

        let slot = self.tasks.get_mut(task_id.handle())?;
        let checkpoint = Checkpoint {
            task: task_id,
            region,
            cancel_requested: slot.cancel_requested_reason.is_some(),
            reason: slot.cancel_requested_reason.clone(),
        };
        let outcome = slot.body.poll(&checkpoint);

        self.trace.emit(EventKind::Poll, task_id.handle(), now.as_nanos());

        match outcome {
            PollOutcome::Pending => Ok(false),
            PollOutcome::Ready(outcome) => {
                let from = self.tasks.get(task_id.handle())?.state;
                check_task_transition(from, TaskState::Finalizing)?;
                self.tasks.get_mut(task_id.handle())?.state = TaskState::Finalizing;
                check_task_transition(TaskState::Finalizing, TaskState::Completed)?;
                let slot = self.tasks.get_mut(task_id.handle())?;
                slot.state = TaskState::Completed;
                slot.outcome = Some(outcome);
                self.trace.emit(EventKind::Complete, task_id.handle(), now.as_nanos());
                Ok(true)
            }
        }
    }

    /// The current lifecycle state of `region`.
    #[must_use]
    pub fn region_state(&self, region: RegionId) -> Result<RegionState, Error> {
        Ok(self.regions.get(region.handle())?.state)
    }

    /// Every non-terminal task in `region`, in ascending slot order. If
    /// `include_terminal` is set, terminal tasks are included too (used
    /// by cancellation propagation, which reports how many tasks it
    /// affected but must skip already-terminal ones either way).
    pub(crate) fn tasks_in_region_ascending(
        &self,
        region: RegionId,
        include_terminal: bool,
    ) -> Vec<crate::types::TaskId> {
        self.tasks
            .live_handles()
            .filter_map(|h| {
                let slot = self.tasks.get(h).ok()?;
                if slot.region != region {
                    return None;
                }
                if !include_terminal && slot.state == TaskState::Completed {
                    return None;
                }
                Some(crate::types::TaskId::from_handle(h))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::region::PollOutcome;
    use crate::runtime::HostHooks;
    use crate::runtime::Mode;
    use crate::types::Outcome;

    fn fresh_runtime() -> Runtime {
        Runtime::new(Mode::Deterministic, HostHooks::deterministic(1), Default::default()).unwrap()
    }

    #[test]
    fn task_completes_after_one_ready_poll() {
        let mut rt = fresh_runtime();
        let region = rt.open_region(None).unwrap();
        rt.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(())))).unwrap();
        let report = run(&mut rt, region, Budget::new()).unwrap();
        assert_eq!(report.tasks_completed, 1);
        assert_eq!(report.stop_reason, Some(StopReason::AllTasksTerminal));
    }

    #[test]
    fn pending_task_consumes_multiple_rounds() {
        let mut rt = fresh_runtime();
        let region = rt.open_region(None).unwrap();
        let mut polls = 0u32;
        rt.spawn(
            region,
            0,
            Box::new(move |_: &Checkpoint| {
                polls += 1;
                if polls >= 3 {
                    PollOutcome::Ready(Outcome::Ok(()))
                } else {
                    PollOutcome::Pending
                }
            }),
        )
        .unwrap();
        let report = run(&mut rt, region, Budget::new()).unwrap();
        assert_eq!(report.polls_consumed, 3);
        assert_eq!(report.rounds, 3);
    }

    #[test]
    fn poll_quota_exhaustion_is_reported() {
        let mut rt = fresh_runtime();
        let region = rt.open_region(None).unwrap();
        rt.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Pending)).unwrap();
        let err = run(&mut rt, region, Budget::new().with_poll_quota(2)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::PollBudgetExhausted));
    }

    #[test]
    fn tasks_polled_in_ascending_slot_order() {
        let mut rt = fresh_runtime();
        let region = rt.open_region(None).unwrap();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            rt.spawn(
                region,
                0,
                Box::new(move |_: &Checkpoint| {
                    order.borrow_mut().push(i);
                    PollOutcome::Ready(Outcome::Ok(()))
                }),
            )
            .unwrap();
        }
        run(&mut rt, region, Budget::new()).unwrap();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn same_scenario_produces_identical_digest_on_fresh_runtimes() {
        let run_once = || {
            let mut rt = Runtime::new(Mode::Deterministic, HostHooks::deterministic(42), Default::default()).unwrap();
            let region = rt.open_region(None).unwrap();
            for _ in 0..4 {
                rt.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(())))).unwrap();
            }
            run(&mut rt, region, Budget::new()).unwrap();
            rt.digest()
        };
        assert_eq!(run_once(), run_once());
    }
}
