//! Compile-time lifecycle transition tables.
//!
//! Every mutator in the runtime calls `transition_check(from, to)` before
//! mutating state; an illegal pair is rejected with `InvalidTransition`
//! and nothing is mutated. Keeping the tables here, rather than inlined
//! at each call site, is what lets [`crate::obligation`] and region/task
//! bookkeeping share one legality story.

use crate::error::{Error, ErrorKind};
use crate::obligation::ObligationState;

/// A region's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionState {
    Open,
    Closing,
    Draining,
    Finalizing,
    Closed,
    Poisoned,
}

impl RegionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    #[must_use]
    pub const fn accepts_new_spawns(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// A task's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Created,
    Running,
    CancelRequested,
    Cancelling,
    Finalizing,
    Completed,
}

impl TaskState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Table-driven legality check for region state transitions:
/// `Open->Closing`, `Open->Poisoned`, `Closing->Draining`,
/// `Draining->Finalizing`, `Finalizing->Closed`, `Poisoned->Closed`.
#[must_use]
pub const fn region_transition_legal(from: RegionState, to: RegionState) -> bool {
    matches!(
        (from, to),
        (RegionState::Open, RegionState::Closing)
            | (RegionState::Open, RegionState::Poisoned)
            | (RegionState::Closing, RegionState::Draining)
            | (RegionState::Draining, RegionState::Finalizing)
            | (RegionState::Finalizing, RegionState::Closed)
            | (RegionState::Poisoned, RegionState::Closed)
    )
}

/// Table-driven legality check for task state transitions:
/// `Created->Running`, `Running->CancelRequested`, `Running->Finalizing`,
/// `CancelRequested->Cancelling`, `Cancelling->Finalizing`,
/// `Finalizing->Completed`.
#[must_use]
pub const fn task_transition_legal(from: TaskState, to: TaskState) -> bool {
    matches!(
        (from, to),
        (TaskState::Created, TaskState::Running)
            | (TaskState::Running, TaskState::CancelRequested)
            | (TaskState::Running, TaskState::Finalizing)
            | (TaskState::CancelRequested, TaskState::Cancelling)
            | (TaskState::Cancelling, TaskState::Finalizing)
            | (TaskState::Finalizing, TaskState::Completed)
    )
}

/// Table-driven legality check for obligation state transitions:
/// `Reserved->Committed`, `Reserved->Aborted` only. `Leaked` is reached
/// only through region drain discovery, outside this table.
#[must_use]
pub const fn obligation_transition_legal(from: ObligationState, to: ObligationState) -> bool {
    matches!(
        (from, to),
        (ObligationState::Reserved, ObligationState::Committed)
            | (ObligationState::Reserved, ObligationState::Aborted)
    )
}

/// Validates a region transition, returning `InvalidTransition` if
/// illegal. Callers must not mutate state before calling this.
pub fn check_region_transition(from: RegionState, to: RegionState) -> Result<(), Error> {
    if region_transition_legal(from, to) {
        Ok(())
    } else {
        Err(ErrorKind::InvalidTransition.into())
    }
}

/// Validates a task transition, returning `InvalidTransition` if illegal.
pub fn check_task_transition(from: TaskState, to: TaskState) -> Result<(), Error> {
    if task_transition_legal(from, to) {
        Ok(())
    } else {
        Err(ErrorKind::InvalidTransition.into())
    }
}

/// Validates an obligation transition, returning `InvalidTransition` if
/// illegal.
pub fn check_obligation_transition(from: ObligationState, to: ObligationState) -> Result<(), Error> {
    if obligation_transition_legal(from, to) {
        Ok(())
    } else {
        Err(ErrorKind::InvalidTransition.into())
    }
}
