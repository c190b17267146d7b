//! The cancellation witness protocol.
//!
//! A [`Witness`] is the authoritative, monotonic record of a single
//! task's progress through cancellation: `Requested -> Cancelling ->
//! Finalizing -> Completed`. Every update to a witness must carry a
//! reason at least as severe as the one already recorded and a phase no
//! earlier than the current one, scoped to the same task, region, and
//! epoch — any violation is rejected rather than silently applied.

use crate::types::{strengthen, CancelReason, RegionId, TaskId};
use crate::error::{Error, ErrorKind};

/// A witness's position in the cancellation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WitnessPhase {
    Requested,
    Cancelling,
    Finalizing,
    Completed,
}

impl WitnessPhase {
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        (next as u8) >= (self as u8)
    }
}

/// The monotonic cancellation record for one task within one region
/// epoch.
#[derive(Debug, Clone)]
pub struct Witness {
    task: TaskId,
    region: RegionId,
    epoch: u64,
    phase: WitnessPhase,
    reason: CancelReason,
}

impl Witness {
    #[must_use]
    pub const fn new(task: TaskId, region: RegionId, epoch: u64, reason: CancelReason) -> Self {
        Self {
            task,
            region,
            epoch,
            phase: WitnessPhase::Requested,
            reason,
        }
    }

    #[must_use]
    pub const fn task(&self) -> TaskId {
        self.task
    }

    #[must_use]
    pub const fn region(&self) -> RegionId {
        self.region
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub const fn phase(&self) -> WitnessPhase {
        self.phase
    }

    #[must_use]
    pub const fn reason(&self) -> &CancelReason {
        &self.reason
    }

    /// Advances the witness to `phase`, strengthening its reason with
    /// `incoming`. Rejects a phase regression, a scope mismatch, or an
    /// epoch mismatch without mutating the witness.
    pub fn advance(
        &mut self,
        phase: WitnessPhase,
        task: TaskId,
        region: RegionId,
        epoch: u64,
        incoming: &CancelReason,
    ) -> Result<(), Error> {
        if task != self.task {
            return Err(ErrorKind::WitnessTaskMismatch.into());
        }
        if region != self.region {
            return Err(ErrorKind::WitnessRegionMismatch.into());
        }
        if epoch != self.epoch {
            return Err(ErrorKind::WitnessEpochMismatch.into());
        }
        if !self.phase.can_advance_to(phase) {
            return Err(ErrorKind::WitnessPhaseRegression.into());
        }
        let merged = strengthen(&self.reason, incoming);
        if merged.severity() < self.reason.severity() {
            return Err(ErrorKind::WitnessReasonWeakened.into());
        }
        self.reason = merged;
        self.phase = phase;
        Ok(())
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.phase, WitnessPhase::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CancelKind, Time};

    fn reason(kind: CancelKind) -> CancelReason {
        CancelReason::new(kind, RegionId::new_for_test(0, 0), Time::ZERO)
    }

    fn witness() -> Witness {
        Witness::new(
            TaskId::new_for_test(1, 0),
            RegionId::new_for_test(0, 0),
            0,
            reason(CancelKind::User),
        )
    }

    #[test]
    fn phases_advance_in_order() {
        let mut w = witness();
        let t = w.task();
        let r = w.region();
        w.advance(WitnessPhase::Cancelling, t, r, 0, &reason(CancelKind::User)).unwrap();
        w.advance(WitnessPhase::Finalizing, t, r, 0, &reason(CancelKind::User)).unwrap();
        w.advance(WitnessPhase::Completed, t, r, 0, &reason(CancelKind::User)).unwrap();
        assert!(w.is_completed());
    }

    #[test]
    fn phase_regression_is_rejected() {
        let mut w = witness();
        let t = w.task();
        let r = w.region();
        w.advance(WitnessPhase::Finalizing, t, r, 0, &reason(CancelKind::User)).unwrap();
        let err = w.advance(WitnessPhase::Requested, t, r, 0, &reason(CancelKind::User)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WitnessPhaseRegression));
        assert_eq!(w.phase(), WitnessPhase::Finalizing);
    }

    #[test]
    fn task_mismatch_is_rejected() {
        let mut w = witness();
        let wrong_task = TaskId::new_for_test(2, 0);
        let err = w
            .advance(WitnessPhase::Cancelling, wrong_task, w.region(), 0, &reason(CancelKind::User))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WitnessTaskMismatch));
    }

    #[test]
    fn epoch_mismatch_is_rejected() {
        let mut w = witness();
        let t = w.task();
        let r = w.region();
        let err = w.advance(WitnessPhase::Cancelling, t, r, 1, &reason(CancelKind::User)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WitnessEpochMismatch));
    }

    #[test]
    fn reason_strengthens_but_never_weakens() {
        let mut w = witness();
        let t = w.task();
        let r = w.region();
        w.advance(WitnessPhase::Cancelling, t, r, 0, &reason(CancelKind::Shutdown)).unwrap();
        assert_eq!(w.reason().kind, CancelKind::Shutdown);
        w.advance(WitnessPhase::Finalizing, t, r, 0, &reason(CancelKind::User)).unwrap();
        assert_eq!(w.reason().kind, CancelKind::Shutdown);
    }

    #[test]
    fn same_phase_reissue_is_allowed() {
        let mut w = witness();
        let t = w.task();
        let r = w.region();
        assert!(w.advance(WitnessPhase::Requested, t, r, 0, &reason(CancelKind::User)).is_ok());
    }
}
