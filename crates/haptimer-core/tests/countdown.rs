//! Countdown engine driven with synthetic instants.
//!
//! Covers time accounting across pause/resume, reset idempotence and the
//! guarantee that every trigger point fires exactly once, in decreasing
//! order, whatever the tick cadence.

use std::time::{Duration, Instant};

use haptimer_core::timer::limits::PREMIUM_POINT_CAPACITY;
use haptimer_core::{CountdownEngine, CountdownState, HapticPattern, TriggerPointSet};
use proptest::prelude::*;
use uuid::Uuid;

/// Tick `engine` every `cadence` from `start` until it completes, collecting
/// fired point ids in firing order.
fn run_to_completion(
    engine: &mut CountdownEngine,
    points: &TriggerPointSet,
    start: Instant,
    cadence: Duration,
) -> Vec<(Uuid, u32)> {
    let mut fired = Vec::new();
    let mut now = start;
    while engine.state() == CountdownState::Running {
        now += cadence;
        let outcome = engine.tick(now).expect("running engine ticks");
        for point in CountdownEngine::due_trigger_points(points, outcome.before, outcome.after) {
            fired.push((point.id, point.trigger_seconds));
        }
    }
    fired
}

#[test]
fn ten_minute_timer_pauses_resumes_and_completes_once() {
    let t0 = Instant::now();
    let points = TriggerPointSet::new(600);
    let mut engine = CountdownEngine::new(600);
    engine.start(t0).unwrap();

    let outcome = engine.tick(t0 + Duration::from_secs(300)).unwrap();
    assert!(CountdownEngine::due_trigger_points(&points, outcome.before, outcome.after).is_empty());
    assert_eq!(engine.remaining_whole_secs(), 300);

    engine.pause(t0 + Duration::from_secs(300)).unwrap();
    // Ten minutes away from the timer are never counted.
    let back = t0 + Duration::from_secs(900);
    engine.resume(back).unwrap();
    assert_eq!(engine.remaining_whole_secs(), 300);

    let outcome = engine.tick(back + Duration::from_secs(300)).unwrap();
    assert!(outcome.is_completed());
    assert_eq!(engine.state(), CountdownState::Completed);
    assert_eq!(engine.remaining_secs(), 0.0);

    let due = CountdownEngine::due_trigger_points(&points, outcome.before, outcome.after);
    assert_eq!(due.len(), 1);
    assert!(due[0].is_mandatory);
}

#[test]
fn paused_time_is_excluded_from_elapsed() {
    let t0 = Instant::now();
    let mut engine = CountdownEngine::new(120);
    engine.start(t0).unwrap();
    engine.pause(t0 + Duration::from_secs(10)).unwrap();
    engine.resume(t0 + Duration::from_secs(70)).unwrap();
    engine.pause(t0 + Duration::from_secs(80)).unwrap();
    engine.resume(t0 + Duration::from_secs(200)).unwrap();
    engine.tick(t0 + Duration::from_secs(205)).unwrap();
    // 10 + 10 + 5 seconds of running time.
    assert_eq!(engine.remaining(), Duration::from_secs(95));
}

#[test]
fn late_pause_leaves_the_completion_point_to_the_tick() {
    let t0 = Instant::now();
    let points = TriggerPointSet::new(60);
    let mut engine = CountdownEngine::new(60);
    engine.start(t0).unwrap();
    engine.tick(t0 + Duration::from_millis(59_900)).unwrap();

    assert!(engine.pause(t0 + Duration::from_secs(61)).is_err());
    let outcome = engine.tick(t0 + Duration::from_secs(61)).unwrap();
    assert!(outcome.is_completed());
    let due = CountdownEngine::due_trigger_points(&points, outcome.before, outcome.after);
    assert_eq!(due.len(), 1);
    assert!(due[0].is_mandatory);
}

#[test]
fn reset_is_idempotent_from_every_state() {
    let t0 = Instant::now();

    let mut idle = CountdownEngine::new(90);
    idle.reset();
    let once = idle.snapshot();
    idle.reset();
    assert_eq!(idle.snapshot(), once);

    let mut running = CountdownEngine::new(90);
    running.start(t0).unwrap();
    running.tick(t0 + Duration::from_secs(20)).unwrap();
    running.reset();
    running.reset();
    assert_eq!(running.snapshot(), once);

    let mut completed = CountdownEngine::new(90);
    completed.start(t0).unwrap();
    completed.tick(t0 + Duration::from_secs(90)).unwrap();
    assert_eq!(completed.state(), CountdownState::Completed);
    completed.reset();
    assert_eq!(completed.snapshot(), once);
}

#[test]
fn completed_engine_auto_resets_after_grace_only() {
    let t0 = Instant::now();
    let mut engine = CountdownEngine::new(30).with_grace(Duration::from_secs(1));
    engine.start(t0).unwrap();
    let done = t0 + Duration::from_secs(31);
    engine.tick(done).unwrap();

    assert!(engine.auto_reset(done + Duration::from_millis(999)).is_none());
    assert_eq!(engine.state(), CountdownState::Completed);
    assert!(engine.auto_reset(done + Duration::from_secs(1)).is_some());
    assert_eq!(engine.state(), CountdownState::Idle);
    assert_eq!(engine.remaining_whole_secs(), 30);
}

#[test]
fn overshooting_tick_fires_every_remaining_point() {
    let t0 = Instant::now();
    let mut points = TriggerPointSet::new(300);
    points.add_with_pattern(240, HapticPattern::Wave, PREMIUM_POINT_CAPACITY).unwrap();
    points.add_with_pattern(60, HapticPattern::Alert, PREMIUM_POINT_CAPACITY).unwrap();

    let mut engine = CountdownEngine::new(300);
    engine.start(t0).unwrap();
    // The host slept through the whole countdown.
    let outcome = engine.tick(t0 + Duration::from_secs(3600)).unwrap();
    let due: Vec<u32> = CountdownEngine::due_trigger_points(&points, outcome.before, outcome.after)
        .iter()
        .map(|p| p.trigger_seconds)
        .collect();
    assert_eq!(due, vec![240, 60, 0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_point_fires_exactly_once_in_decreasing_order(
        duration in 60u32..=1800,
        slots in proptest::collection::vec(1u32..60, 0..5),
        cadence_ms in 50u64..=7000,
    ) {
        let mut points = TriggerPointSet::new(duration);
        for slot in slots {
            // Rejections (spacing, range) are fine; whatever was accepted must fire.
            let _ = points.add(slot * 30, PREMIUM_POINT_CAPACITY);
        }

        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(duration);
        engine.start(t0).unwrap();
        let fired = run_to_completion(&mut engine, &points, t0, Duration::from_millis(cadence_ms));

        prop_assert_eq!(fired.len(), points.len());
        for point in points.iter() {
            prop_assert_eq!(fired.iter().filter(|(id, _)| *id == point.id).count(), 1);
        }
        prop_assert!(fired.windows(2).all(|w| w[0].1 >= w[1].1));
        prop_assert_eq!(fired.last().map(|(_, at)| *at), Some(0));
    }
}
