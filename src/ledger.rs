//! Per-task bounded error ledger.
//!
//! Every non-`Ok` return at a propagation site is recorded here along
//! with where it happened and when, purely for post-mortem diagnostics —
//! the ledger is never consulted to decide correctness and never changes
//! the status it records.

use crate::error::ErrorKind;
use crate::types::TaskId;

/// Ring depth: how many breadcrumbs a single task's ledger retains
/// before wrapping.
pub const LEDGER_DEPTH: usize = 32;

/// One recorded propagation site.
#[derive(Debug, Clone, Copy)]
pub struct Breadcrumb {
    pub status: ErrorKind,
    pub operation: &'static str,
    pub source_location: &'static str,
    pub sequence: u64,
}

/// A single task's bounded breadcrumb ring. Overflow wraps silently;
/// [`Ledger::overflowed`] reports whether that has happened.
#[derive(Debug)]
pub struct Ledger {
    task: TaskId,
    slots: Vec<Breadcrumb>,
    next_slot: usize,
    next_sequence: u64,
    overflowed: bool,
}

impl Ledger {
    #[must_use]
    pub fn new(task: TaskId) -> Self {
        Self {
            task,
            slots: Vec::with_capacity(LEDGER_DEPTH),
            next_slot: 0,
            next_sequence: 0,
            overflowed: false,
        }
    }

    #[must_use]
    pub const fn task(&self) -> TaskId {
        self.task
    }

    /// Records one breadcrumb, wrapping the ring if it's full.
    pub fn record(&mut self, status: ErrorKind, operation: &'static str, source_location: &'static str) {
        let crumb = Breadcrumb {
            status,
            operation,
            source_location,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        if self.slots.len() < LEDGER_DEPTH {
            self.slots.push(crumb);
        } else {
            self.slots[self.next_slot] = crumb;
            self.overflowed = true;
        }
        self.next_slot = (self.next_slot + 1) % LEDGER_DEPTH;
    }

    #[must_use]
    pub const fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Breadcrumbs in recording order (oldest retained first).
    #[must_use]
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        if !self.overflowed {
            return self.slots.clone();
        }
        let mut out = Vec::with_capacity(LEDGER_DEPTH);
        out.extend_from_slice(&self.slots[self.next_slot..]);
        out.extend_from_slice(&self.slots[..self.next_slot]);
        out
    }
}

/// Table of per-task ledgers, owned by the runtime.
#[derive(Debug, Default)]
pub struct LedgerTable {
    ledgers: crate::util::DetHashMap<TaskId, Ledger>,
}

impl LedgerTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledgers: crate::util::DetHashMap::default(),
        }
    }

    pub fn record(&mut self, task: TaskId, status: ErrorKind, operation: &'static str, source_location: &'static str) {
        self.ledgers
            .entry(task)
            .or_insert_with(|| Ledger::new(task))
            .record(status, operation, source_location);
    }

    #[must_use]
    pub fn overflowed(&self, task: TaskId) -> bool {
        self.ledgers.get(&task).is_some_and(Ledger::overflowed)
    }

    #[must_use]
    pub fn breadcrumbs(&self, task: TaskId) -> Vec<Breadcrumb> {
        self.ledgers.get(&task).map(Ledger::breadcrumbs).unwrap_or_default()
    }

    pub fn forget(&mut self, task: TaskId) {
        self.ledgers.remove(&task);
    }
}

/// Records `$expr`'s error (if any) into `$ledger` for `$task` under
/// `$operation`, then returns it from the enclosing function — the
/// runtime's analogue of the spec's propagation macro.
#[macro_export]
macro_rules! ledger_try {
    ($ledger:expr, $task:expr, $operation:literal, $expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                $ledger.record($task, err.kind(), $operation, concat!(file!(), ":", line!()));
                return Err(err);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(slot: u16) -> TaskId {
        TaskId::new_for_test(slot, 0)
    }

    #[test]
    fn records_are_kept_in_order_until_overflow() {
        let mut ledger = Ledger::new(task(0));
        ledger.record(ErrorKind::WouldBlock, "recv", "a.rs:1");
        ledger.record(ErrorKind::ChannelFull, "send", "a.rs:2");
        let crumbs = ledger.breadcrumbs();
        assert_eq!(crumbs.len(), 2);
        assert_eq!(crumbs[0].sequence, 0);
        assert_eq!(crumbs[1].sequence, 1);
        assert!(!ledger.overflowed());
    }

    #[test]
    fn overflow_wraps_and_reports_true() {
        let mut ledger = Ledger::new(task(0));
        for i in 0..(LEDGER_DEPTH + 5) {
            ledger.record(ErrorKind::WouldBlock, "recv", "a.rs:1");
            let _ = i;
        }
        assert!(ledger.overflowed());
        assert_eq!(ledger.breadcrumbs().len(), LEDGER_DEPTH);
    }

    #[test]
    fn overflowed_breadcrumbs_stay_in_sequence_order() {
        let mut ledger = Ledger::new(task(0));
        for _ in 0..(LEDGER_DEPTH + 3) {
            ledger.record(ErrorKind::WouldBlock, "recv", "a.rs:1");
        }
        let crumbs = ledger.breadcrumbs();
        for pair in crumbs.windows(2) {
            assert!(pair[0].sequence < pair[1].sequence);
        }
    }

    #[test]
    fn table_tracks_independent_ledgers_per_task() {
        let mut table = LedgerTable::new();
        table.record(task(0), ErrorKind::WouldBlock, "recv", "a.rs:1");
        table.record(task(1), ErrorKind::ChannelFull, "send", "b.rs:1");
        assert_eq!(table.breadcrumbs(task(0)).len(), 1);
        assert_eq!(table.breadcrumbs(task(1)).len(), 1);
        assert!(!table.overflowed(task(0)));
    }
}
