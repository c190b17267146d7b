//! End-to-end scenarios exercising the runtime through its public API,
//! one per scenario enumerated against the core's testable properties.

use detcrew::error::ErrorKind;
use detcrew::runtime::region::{Checkpoint, PollOutcome};
use detcrew::runtime::{HostHooks, Mode, RegionState, Runtime, RuntimeConfig};
use detcrew::types::{CancelKind, CancelReason, Outcome, Time};

fn deterministic_runtime() -> Runtime {
    Runtime::new(Mode::Deterministic, HostHooks::deterministic(1), RuntimeConfig::default()).unwrap()
}

#[test]
fn scenario_1_noop_tasks_reach_closed_with_stable_digest() {
    let run_once = || {
        let mut rt = deterministic_runtime();
        let region = rt.open_region(None).unwrap();
        rt.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(())))).unwrap();
        rt.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(())))).unwrap();
        let report = detcrew::runtime::run(&mut rt, region, detcrew::Budget::new().with_poll_quota(10)).unwrap();
        assert_eq!(report.tasks_completed, 2);
        assert_eq!(rt.region_state(region).unwrap(), RegionState::Open);
        rt.close_region(region).unwrap();
        let drain_report = rt.drain(region, detcrew::Budget::new()).unwrap();
        assert!(drain_report.leaked.is_empty());
        assert_eq!(rt.region_state(region).unwrap(), RegionState::Closed);
        assert_ne!(rt.digest(), 0);
        rt.digest()
    };
    assert_eq!(run_once(), run_once());
}

#[test]
fn scenario_2_poll_budget_exhausts_with_all_tasks_still_running() {
    let mut rt = deterministic_runtime();
    let region = rt.open_region(None).unwrap();
    for _ in 0..16 {
        rt.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Pending)).unwrap();
    }
    let err = detcrew::runtime::run(&mut rt, region, detcrew::Budget::new().with_poll_quota(15)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PollBudgetExhausted));
    assert_eq!(rt.quiescence().live_tasks, 16);
    assert_eq!(rt.region_state(region).unwrap(), RegionState::Open);
}

#[test]
fn scenario_3_deadline_cancel_completes_task_as_cancelled() {
    let mut rt = deterministic_runtime();
    let region = rt.open_region(None).unwrap();
    let mut yielded = false;
    let task = rt
        .spawn(
            region,
            0,
            Box::new(move |cp: &Checkpoint| {
                if cp.is_cancelled() {
                    return PollOutcome::Ready(Outcome::Cancelled(cp.reason.clone().unwrap()));
                }
                if !yielded {
                    yielded = true;
                    return PollOutcome::Pending;
                }
                PollOutcome::Ready(Outcome::Ok(()))
            }),
        )
        .unwrap();
    let first_run = detcrew::runtime::run(&mut rt, region, detcrew::Budget::new().with_poll_quota(1));
    assert!(matches!(first_run.unwrap_err().kind(), ErrorKind::PollBudgetExhausted));
    let reason = CancelReason::new(CancelKind::Deadline, region, Time::ZERO);
    rt.request_cancel(task, reason).unwrap();
    rt.close_region(region).unwrap();
    let report = rt.drain(region, detcrew::Budget::new().with_poll_quota(50)).unwrap();
    assert_eq!(report.tasks_completed, 1);
    assert_eq!(rt.region_state(region).unwrap(), RegionState::Closed);
}

#[test]
fn scenario_4_region_cancel_propagate_reaches_every_task() {
    let mut rt = deterministic_runtime();
    let region = rt.open_region(None).unwrap();
    for _ in 0..8 {
        rt.spawn(
            region,
            0,
            Box::new(|cp: &Checkpoint| {
                if cp.is_cancelled() {
                    PollOutcome::Ready(Outcome::Cancelled(cp.reason.clone().unwrap()))
                } else {
                    PollOutcome::Pending
                }
            }),
        )
        .unwrap();
    }
    let first_run = detcrew::runtime::run(&mut rt, region, detcrew::Budget::new().with_poll_quota(8));
    assert!(matches!(first_run.unwrap_err().kind(), ErrorKind::PollBudgetExhausted));
    let reason = CancelReason::new(CancelKind::Shutdown, region, Time::ZERO);
    let affected = rt.cancel_region(region, reason).unwrap();
    assert_eq!(affected, 8);
    rt.close_region(region).unwrap();
    let drain_report = rt.drain(region, detcrew::Budget::new().with_poll_quota(50)).unwrap();
    assert_eq!(drain_report.tasks_completed, 8);
}

#[test]
fn scenario_5_resolved_obligations_leave_no_leak_report() {
    let mut rt = deterministic_runtime();
    let region = rt.open_region(None).unwrap();
    let ob0 = rt.reserve_obligation(region, None, "a").unwrap();
    let ob1 = rt.reserve_obligation(region, None, "b").unwrap();
    let ob2 = rt.reserve_obligation(region, None, "c").unwrap();
    rt.commit_obligation(ob0).unwrap();
    rt.abort_obligation(ob1).unwrap();
    rt.commit_obligation(ob2).unwrap();
    rt.close_region(region).unwrap();
    let report = rt.drain(region, detcrew::Budget::new()).unwrap();
    assert!(report.leaked.is_empty());
}

#[test]
fn scenario_6_unresolved_obligation_is_leaked_but_region_still_closes() {
    let mut rt = deterministic_runtime();
    let region = rt.open_region(None).unwrap();
    let ob = rt.reserve_obligation(region, None, "socket").unwrap();
    rt.close_region(region).unwrap();
    let report = rt.drain(region, detcrew::Budget::new()).unwrap();
    assert_eq!(report.leaked.len(), 1);
    assert_eq!(report.leaked[0].0, ob);
    assert_eq!(rt.region_state(region).unwrap(), RegionState::Closed);
}

#[test]
fn scenario_7_channel_reservation_and_disconnect() {
    use detcrew::channel::BoundedChannel;
    use detcrew::types::ChannelId;
    let id = ChannelId::new_for_test(0, 0);
    let mut channel: BoundedChannel<u32> = BoundedChannel::new(id, 4);
    let p0 = channel.try_reserve().unwrap();
    let p1 = channel.try_reserve().unwrap();
    let p2 = channel.try_reserve().unwrap();
    let _p3 = channel.try_reserve().unwrap();
    assert!(matches!(channel.try_reserve().unwrap_err().kind(), ErrorKind::ChannelFull));
    p0.abort(&mut channel);
    let p0b = channel.try_reserve().unwrap();
    p1.send(&mut channel, 42).unwrap();
    channel.close_receiver();
    assert!(matches!(p2.send(&mut channel, 7).unwrap_err().kind(), ErrorKind::Disconnected));
    p0b.abort(&mut channel);
}

#[test]
fn scenario_8_timers_fire_in_deadline_then_registration_order() {
    let mut rt = deterministic_runtime();
    let t100 = rt.register_timer(Time::from_nanos(100)).unwrap();
    let t50a = rt.register_timer(Time::from_nanos(50)).unwrap();
    let t50b = rt.register_timer(Time::from_nanos(50)).unwrap();
    let t200 = rt.register_timer(Time::from_nanos(200)).unwrap();
    let fired = rt.fire_timers(Time::from_nanos(60));
    assert_eq!(fired, vec![t50a, t50b]);
    assert!(rt.cancel_timer(t100).is_ok());
    assert!(rt.cancel_timer(t200).is_ok());
    assert_eq!(rt.fire_timers(Time::from_nanos(0)).len(), 0);
    // already-fired timers cancel idempotently
    assert!(rt.cancel_timer(t50a).is_ok());
}

#[test]
fn scenario_9_global_task_arena_exhaustion_is_visible_from_any_region() {
    let config = RuntimeConfig {
        task_capacity: 1,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::new(Mode::Deterministic, HostHooks::deterministic(1), config).unwrap();
    let region_a = rt.open_region(None).unwrap();
    let region_b = rt.open_region(None).unwrap();
    rt.spawn(region_a, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(())))).unwrap();
    let err = rt
        .spawn(region_b, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(()))))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ResourceExhausted));
    let err_a = rt
        .spawn(region_a, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(()))))
        .unwrap_err();
    assert!(matches!(err_a.kind(), ErrorKind::ResourceExhausted));
}

#[test]
fn scenario_10_sealed_allocator_still_admits_arena_based_spawn() {
    let mut hooks = HostHooks::deterministic(1);
    hooks.allocator.seal();
    assert!(hooks.allocator.is_sealed());
    let mut rt = Runtime::new(Mode::Deterministic, hooks, RuntimeConfig::default()).unwrap();
    let region = rt.open_region(None).unwrap();
    rt.spawn(region, 0, Box::new(|_: &Checkpoint| PollOutcome::Ready(Outcome::Ok(())))).unwrap();
    rt.close_region(region).unwrap();
    let report = rt.drain(region, detcrew::Budget::new()).unwrap();
    assert_eq!(report.tasks_completed, 1);
}
