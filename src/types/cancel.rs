//! Cancellation kind and reason: the data half of the cancellation lattice.
//!
//! Cancellation is a first-class protocol, never a silent drop. Every
//! kind is bound to a fixed severity; [`strengthen`] merges two reasons
//! by taking the more severe one, and a reason never spontaneously
//! weakens as it propagates through a region tree.

use super::id::{RegionId, TaskId, Time};
use super::budget::Budget;
use core::fmt;

/// Maximum depth of a cancellation reason's parent-cause chain before
/// further causes are dropped and [`CancelReason::truncated`] is set.
pub const MAX_CAUSE_DEPTH: usize = 8;

/// The kind of cancellation request.
///
/// Eleven variants, each bound to one of six severities (0-5) by
/// [`CancelKind::severity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelKind {
    /// Explicit cancellation requested by user code.
    User,
    /// A registered timer fired.
    Timeout,
    /// A budget deadline passed.
    Deadline,
    /// The scheduler's poll quota was exhausted.
    PollQuota,
    /// A cost/cleanup budget was exhausted.
    CostBudget,
    /// A fail-fast policy cancelled siblings after one failed.
    FailFast,
    /// This branch lost a race to a sibling.
    RaceLost,
    /// A linked peer (e.g. a joined task) exited.
    LinkedExit,
    /// The parent region is closing or cancelling.
    Parent,
    /// A resource constraint forced cancellation.
    Resource,
    /// Runtime shutdown.
    Shutdown,
}

impl CancelKind {
    /// All eleven kinds, for exhaustive property tests.
    pub const ALL: [Self; 11] = [
        Self::User,
        Self::Timeout,
        Self::Deadline,
        Self::PollQuota,
        Self::CostBudget,
        Self::FailFast,
        Self::RaceLost,
        Self::LinkedExit,
        Self::Parent,
        Self::Resource,
        Self::Shutdown,
    ];

    /// Returns the severity (0-5) of this cancellation kind. Higher
    /// severity wins when [`strengthen`]ing two reasons.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Timeout | Self::Deadline => 1,
            Self::PollQuota | Self::CostBudget => 2,
            Self::FailFast | Self::RaceLost | Self::LinkedExit => 3,
            Self::Parent | Self::Resource => 4,
            Self::Shutdown => 5,
        }
    }

    /// The fixed cleanup budget table: higher severity generally means a
    /// tighter poll-quota allowance but a higher scheduling priority, so
    /// urgent cancellations finalize ahead of lower-severity cleanup.
    #[must_use]
    pub const fn cleanup_budget(self) -> Budget {
        match self {
            Self::User => Budget::new().with_poll_quota(1000).with_priority(50),
            Self::Timeout => Budget::new().with_poll_quota(500).with_priority(80),
            Self::Deadline => Budget::new().with_poll_quota(500).with_priority(90),
            Self::PollQuota => Budget::new().with_poll_quota(300).with_priority(110),
            Self::CostBudget => Budget::new().with_poll_quota(300).with_priority(120),
            Self::FailFast => Budget::new().with_poll_quota(200).with_priority(150),
            Self::RaceLost => Budget::new().with_poll_quota(200).with_priority(150),
            Self::LinkedExit => Budget::new().with_poll_quota(200).with_priority(160),
            Self::Parent => Budget::new().with_poll_quota(150).with_priority(200),
            Self::Resource => Budget::new().with_poll_quota(150).with_priority(210),
            Self::Shutdown => Budget::new().with_poll_quota(50).with_priority(255),
        }
    }
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Timeout => "timeout",
            Self::Deadline => "deadline",
            Self::PollQuota => "poll-quota",
            Self::CostBudget => "cost-budget",
            Self::FailFast => "fail-fast",
            Self::RaceLost => "race-lost",
            Self::LinkedExit => "linked-exit",
            Self::Parent => "parent",
            Self::Resource => "resource",
            Self::Shutdown => "shutdown",
        };
        write!(f, "{s}")
    }
}

/// The reason for a cancellation: kind, origin, timestamp, optional
/// message, and an optional bounded parent-cause chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    /// The kind of cancellation.
    pub kind: CancelKind,
    /// The region in which the cancellation originated.
    pub origin_region: RegionId,
    /// The task in which the cancellation originated, if task-scoped.
    pub origin_task: Option<TaskId>,
    /// When the cancellation was issued.
    pub timestamp: Time,
    /// Optional human-readable message (static for determinism).
    pub message: Option<&'static str>,
    /// The reason this reason superseded, if any, up to `MAX_CAUSE_DEPTH`.
    pub parent_cause: Option<Box<CancelReason>>,
    /// Set when a parent-cause chain was truncated at `MAX_CAUSE_DEPTH`.
    pub truncated: bool,
}

impl CancelReason {
    /// Creates a new cancellation reason with no parent cause.
    #[must_use]
    pub const fn new(kind: CancelKind, origin_region: RegionId, timestamp: Time) -> Self {
        Self {
            kind,
            origin_region,
            origin_task: None,
            timestamp,
            message: None,
            parent_cause: None,
            truncated: false,
        }
    }

    #[must_use]
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.origin_task = Some(task);
        self
    }

    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    /// Chains `self` on top of `cause`, bounding the resulting depth at
    /// `MAX_CAUSE_DEPTH`. Exceeding the bound sets `truncated` instead of
    /// growing the chain further.
    #[must_use]
    pub fn with_cause(mut self, cause: Self) -> Self {
        let depth = cause.chain_depth();
        if depth >= MAX_CAUSE_DEPTH {
            self.truncated = true;
        } else {
            self.truncated = cause.truncated;
            self.parent_cause = Some(Box::new(cause));
        }
        self
    }

    fn chain_depth(&self) -> usize {
        let mut depth = 1;
        let mut cur = self.parent_cause.as_deref();
        while let Some(c) = cur {
            depth += 1;
            cur = c.parent_cause.as_deref();
        }
        depth
    }

    #[must_use]
    pub const fn severity(&self) -> u8 {
        self.kind.severity()
    }

    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self.kind, CancelKind::Shutdown)
    }

    #[must_use]
    pub const fn cleanup_budget(&self) -> Budget {
        self.kind.cleanup_budget()
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cancel in {}", self.kind, self.origin_region)?;
        if let Some(msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Strengthens `a` with `b`, returning the more severe of the two.
///
/// Ties on severity are broken by the earlier timestamp; ties on
/// timestamp are broken left-biased (`a` wins), matching the spec's
/// exact-equality rule.
#[must_use]
pub fn strengthen(a: &CancelReason, b: &CancelReason) -> CancelReason {
    let sa = a.severity();
    let sb = b.severity();
    if sa > sb {
        a.clone()
    } else if sb > sa {
        b.clone()
    } else if b.timestamp < a.timestamp {
        b.clone()
    } else {
        a.clone()
    }
}
