//! The stable status taxonomy.
//!
//! Every public operation returns a [`Result<T>`] whose error carries one
//! of a closed set of [`ErrorKind`] codes. Codes are stable: new ones may
//! be added in the future, but an existing code's meaning never changes,
//! and its canonical string name (returned by [`ErrorKind::canonical_name`])
//! must be reproduced exactly in diagnostics.
//!
//! Three broad classes, per the error handling design:
//! - contract violations (reject, no mutation — [`ErrorKind::is_contract_violation`])
//! - resource pressure (reject, retryable in principle)
//! - protocol outcomes (`Cancelled`, `Disconnected` — not errors at the design level)

use std::fmt;

/// A stable status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    /// Operation succeeded.
    #[error("ok")]
    Ok,
    /// Operation has not yet completed (not terminal).
    #[error("pending")]
    Pending,
    /// A caller-supplied argument was invalid.
    #[error("invalid argument")]
    InvalidArgument,
    /// The entity is not in a state that permits this operation.
    #[error("invalid state")]
    InvalidState,
    /// No such entity.
    #[error("not found")]
    NotFound,
    /// The entity already exists.
    #[error("already exists")]
    AlreadyExists,

    /// The requested state transition is not in the legality table.
    #[error("invalid transition")]
    InvalidTransition,

    /// No region with this handle.
    #[error("region not found")]
    RegionNotFound,
    /// The region has already closed.
    #[error("region closed")]
    RegionClosed,
    /// The region's arena-backed resource is at capacity.
    #[error("region at capacity")]
    RegionAtCapacity,
    /// The region is not in the `Open` state.
    #[error("region not open")]
    RegionNotOpen,
    /// The region has been poisoned.
    #[error("region poisoned")]
    RegionPoisoned,
    /// Admission is closed for new work in this region.
    #[error("admission closed")]
    AdmissionClosed,
    /// Admission would exceed a configured limit.
    #[error("admission limit")]
    AdmissionLimit,

    /// No task with this handle.
    #[error("task not found")]
    TaskNotFound,
    /// The scheduler is unavailable to run this operation.
    #[error("scheduler unavailable")]
    SchedulerUnavailable,
    /// A name conflicts with an existing registration.
    #[error("name conflict")]
    NameConflict,
    /// The task has not yet reached a terminal state.
    #[error("task not completed")]
    TaskNotCompleted,
    /// The budget's poll quota was exhausted before quiescence.
    #[error("poll budget exhausted")]
    PollBudgetExhausted,

    /// The obligation has already been committed or aborted.
    #[error("obligation already resolved")]
    ObligationAlreadyResolved,
    /// One or more obligations remain unresolved.
    #[error("unresolved obligations")]
    UnresolvedObligations,

    /// The operation was cancelled (protocol outcome, not a defect).
    #[error("cancelled")]
    Cancelled,
    /// A cancellation witness's phase regressed.
    #[error("witness phase regression")]
    WitnessPhaseRegression,
    /// A cancellation witness's reason weakened.
    #[error("witness reason weakened")]
    WitnessReasonWeakened,
    /// A cancellation witness was presented for the wrong task.
    #[error("witness task mismatch")]
    WitnessTaskMismatch,
    /// A cancellation witness was presented for the wrong region.
    #[error("witness region mismatch")]
    WitnessRegionMismatch,
    /// A cancellation witness's epoch does not match the region's current epoch.
    #[error("witness epoch mismatch")]
    WitnessEpochMismatch,

    /// The channel's peer has disconnected (protocol outcome).
    #[error("disconnected")]
    Disconnected,
    /// A non-blocking operation would have to block.
    #[error("would block")]
    WouldBlock,
    /// The channel is at capacity.
    #[error("channel full")]
    ChannelFull,
    /// The channel still has undrained queued values.
    #[error("channel not drained")]
    ChannelNotDrained,

    /// No timer with this handle.
    #[error("timer not found")]
    TimerNotFound,
    /// Timers remain registered.
    #[error("timers pending")]
    TimersPending,

    /// Tasks remain non-terminal.
    #[error("tasks still active")]
    TasksStillActive,
    /// Obligations remain unresolved.
    #[error("obligations unresolved")]
    ObligationsUnresolved,
    /// Regions remain open.
    #[error("regions not closed")]
    RegionsNotClosed,
    /// Child regions/tasks remain incomplete.
    #[error("incomplete children")]
    IncompleteChildren,
    /// Quiescence was not reached within budget.
    #[error("quiescence not reached")]
    QuiescenceNotReached,
    /// Quiescence check found live tasks.
    #[error("quiescence tasks live")]
    QuiescenceTasksLive,

    /// An arena or other fixed-capacity pool is exhausted.
    #[error("resource exhausted")]
    ResourceExhausted,
    /// A handle's generation does not match the live slot.
    #[error("stale handle")]
    StaleHandle,

    /// A required host hook was not configured.
    #[error("hook missing")]
    HookMissing,
    /// A host hook returned an invalid value.
    #[error("hook invalid")]
    HookInvalid,
    /// Deterministic mode's contract was violated.
    #[error("determinism violation")]
    DeterminismViolation,
    /// The allocator has been sealed and rejects further heap requests.
    #[error("allocator sealed")]
    AllocatorSealed,
    /// A cross-affinity-domain access was observed without transfer.
    #[error("affinity violation")]
    AffinityViolation,
    /// The entity is not bound to any affinity domain.
    #[error("affinity not bound")]
    AffinityNotBound,
    /// The entity is already bound to an affinity domain.
    #[error("affinity already bound")]
    AffinityAlreadyBound,
    /// An explicit transfer is required to move affinity domains.
    #[error("affinity transfer required")]
    AffinityTransferRequired,
    /// The affinity domain table is full.
    #[error("affinity table full")]
    AffinityTableFull,
    /// Two values that should be equivalent under replay were not.
    #[error("equivalence mismatch")]
    EquivalenceMismatch,
}

impl ErrorKind {
    /// The canonical, stable string name for this code.
    #[must_use]
    pub fn canonical_name(self) -> &'static str {
        // `thiserror`'s Display impl already produces exactly this string;
        // exposed as its own method so callers don't need to round-trip
        // through `ToString` to get a `&'static str`.
        match self {
            Self::Ok => "ok",
            Self::Pending => "pending",
            Self::InvalidArgument => "invalid argument",
            Self::InvalidState => "invalid state",
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::InvalidTransition => "invalid transition",
            Self::RegionNotFound => "region not found",
            Self::RegionClosed => "region closed",
            Self::RegionAtCapacity => "region at capacity",
            Self::RegionNotOpen => "region not open",
            Self::RegionPoisoned => "region poisoned",
            Self::AdmissionClosed => "admission closed",
            Self::AdmissionLimit => "admission limit",
            Self::TaskNotFound => "task not found",
            Self::SchedulerUnavailable => "scheduler unavailable",
            Self::NameConflict => "name conflict",
            Self::TaskNotCompleted => "task not completed",
            Self::PollBudgetExhausted => "poll budget exhausted",
            Self::ObligationAlreadyResolved => "obligation already resolved",
            Self::UnresolvedObligations => "unresolved obligations",
            Self::Cancelled => "cancelled",
            Self::WitnessPhaseRegression => "witness phase regression",
            Self::WitnessReasonWeakened => "witness reason weakened",
            Self::WitnessTaskMismatch => "witness task mismatch",
            Self::WitnessRegionMismatch => "witness region mismatch",
            Self::WitnessEpochMismatch => "witness epoch mismatch",
            Self::Disconnected => "disconnected",
            Self::WouldBlock => "would block",
            Self::ChannelFull => "channel full",
            Self::ChannelNotDrained => "channel not drained",
            Self::TimerNotFound => "timer not found",
            Self::TimersPending => "timers pending",
            Self::TasksStillActive => "tasks still active",
            Self::ObligationsUnresolved => "obligations unresolved",
            Self::RegionsNotClosed => "regions not closed",
            Self::IncompleteChildren => "incomplete children",
            Self::QuiescenceNotReached => "quiescence not reached",
            Self::QuiescenceTasksLive => "quiescence tasks live",
            Self::ResourceExhausted => "resource exhausted",
            Self::StaleHandle => "stale handle",
            Self::HookMissing => "hook missing",
            Self::HookInvalid => "hook invalid",
            Self::DeterminismViolation => "determinism violation",
            Self::AllocatorSealed => "allocator sealed",
            Self::AffinityViolation => "affinity violation",
            Self::AffinityNotBound => "affinity not bound",
            Self::AffinityAlreadyBound => "affinity already bound",
            Self::AffinityTransferRequired => "affinity transfer required",
            Self::AffinityTableFull => "affinity table full",
            Self::EquivalenceMismatch => "equivalence mismatch",
        }
    }

    /// True for contract violations: the operation is rejected and no
    /// state is mutated. Unrecoverable without caller intervention.
    #[must_use]
    pub const fn is_contract_violation(self) -> bool {
        matches!(
            self,
            Self::InvalidArgument
                | Self::InvalidState
                | Self::InvalidTransition
                | Self::StaleHandle
                | Self::WitnessPhaseRegression
                | Self::WitnessReasonWeakened
                | Self::WitnessTaskMismatch
                | Self::WitnessRegionMismatch
                | Self::WitnessEpochMismatch
        )
    }

    /// True for resource-pressure codes: rejected, retryable in principle.
    #[must_use]
    pub const fn is_resource_pressure(self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted
                | Self::ChannelFull
                | Self::WouldBlock
                | Self::PollBudgetExhausted
        )
    }

    /// True for protocol outcomes: not defects, just "this is shutting down".
    #[must_use]
    pub const fn is_protocol_outcome(self) -> bool {
        matches!(self, Self::Cancelled | Self::Disconnected)
    }
}

/// An error carrying a stable [`ErrorKind`] plus optional diagnostic context.
///
/// `Error` never alters control flow on its own — it is just a typed
/// envelope. The per-task [error ledger](crate::ledger) is what records
/// these at propagation sites without changing the status itself.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Option<&'static str>,
}

impl Error {
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    #[must_use]
    pub const fn with_context(mut self, context: &'static str) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn context(&self) -> Option<&'static str> {
        self.context
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.canonical_name())?;
        if let Some(ctx) = self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
