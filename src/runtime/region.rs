//! Region and task slot bodies, and the checkpoint/poll-outcome contract
//! a task's callable is driven through.

use crate::error::Error;
use crate::runtime::transition::{RegionState, TaskState};
use crate::types::{CancelReason, Outcome, RegionId, TaskId};
use crate::cancel::Witness;

/// Snapshot handed to a task's callable on each poll: whether
/// cancellation has been requested of it, and if so, with what reason.
/// The task observes this and cooperates by winding down on its own
/// schedule; the scheduler never forces termination below this
/// granularity.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub task: TaskId,
    pub region: RegionId,
    pub cancel_requested: bool,
    pub reason: Option<CancelReason>,
}

impl Checkpoint {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancel_requested
    }
}

/// What a task's callable returns from one poll.
pub enum PollOutcome {
    /// The task is finished, with the outcome it reached.
    Ready(Outcome<(), Error>),
    /// The task has more work to do; call it again next round.
    Pending,
}

/// A task's callable. Implemented for any `FnMut` closure with this
/// signature so ordinary closures can be spawned directly.
pub trait TaskBody {
    fn poll(&mut self, checkpoint: &Checkpoint) -> PollOutcome;
}

impl<F> TaskBody for F
where
    F: FnMut(&Checkpoint) -> PollOutcome,
{
    fn poll(&mut self, checkpoint: &Checkpoint) -> PollOutcome {
        self(checkpoint)
    }
}

/// A cleanup callback run, LIFO, during region finalize.
pub type CleanupCallback = Box<dyn FnOnce()>;

/// The per-task arena slot.
pub struct TaskSlot {
    pub region: RegionId,
    pub state: TaskState,
    pub body: Box<dyn TaskBody>,
    pub outcome: Option<Outcome<(), Error>>,
    pub witness: Option<Witness>,
    pub cancel_requested_reason: Option<CancelReason>,
}

impl TaskSlot {
    #[must_use]
    pub fn new(region: RegionId, body: Box<dyn TaskBody>) -> Self {
        Self {
            region,
            state: TaskState::Created,
            body,
            outcome: None,
            witness: None,
            cancel_requested_reason: None,
        }
    }
}

/// The per-region arena slot.
pub struct RegionSlot {
    pub parent: Option<RegionId>,
    pub state: RegionState,
    pub cleanup_stack: Vec<CleanupCallback>,
}

impl RegionSlot {
    #[must_use]
    pub fn new(parent: Option<RegionId>) -> Self {
        Self {
            parent,
            state: RegionState::Open,
            cleanup_stack: Vec::new(),
        }
    }

    /// Pushes a cleanup callback that runs LIFO during finalize.
    pub fn defer(&mut self, cb: CleanupCallback) {
        self.cleanup_stack.push(cb);
    }

    /// Runs every deferred cleanup callback in LIFO order, leaving the
    /// stack empty.
    pub fn run_cleanup_stack(&mut self) {
        while let Some(cb) = self.cleanup_stack.pop() {
            cb();
        }
    }
}
