//! Countdown engine implementation.
//!
//! The engine is a monotonic-clock-anchored state machine. It does not use
//! internal threads or read a clock itself: every time-dependent command
//! takes the current `Instant`, and the caller is responsible for calling
//! `tick()` periodically.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!       Completed -(grace)-> Idle
//! ```
//!
//! `reset()` returns to `Idle` from any state.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CountdownEngine::new(600);
//! engine.start(Instant::now())?;
//! // In a loop:
//! if let Some(outcome) = engine.tick(Instant::now()) {
//!     for point in CountdownEngine::due_trigger_points(&points, outcome.before, outcome.after) {
//!         // fire point
//!     }
//! }
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::display::format_clock;
use super::limits::{duration_in_range, AUTO_RESET_GRACE, MAX_DURATION_SECS, MIN_DURATION_SECS};
use super::points::{TriggerPoint, TriggerPointSet};
use crate::error::PreconditionViolation;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for CountdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CountdownState::Idle => "idle",
            CountdownState::Running => "running",
            CountdownState::Paused => "paused",
            CountdownState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Read-only view of the engine, recomputed on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: CountdownState,
    pub duration_seconds: u32,
    /// Fractional seconds remaining.
    pub remaining_seconds: f64,
    /// Ceiling-rounded, for display.
    pub remaining_whole_seconds: u32,
    /// `remaining_seconds / duration_seconds`, drains from 1.0 to 0.0.
    pub remaining_fraction: f64,
    pub display: String,
}

/// Result of one `tick()` while running.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// Seconds remaining before this tick.
    pub before: f64,
    /// Seconds remaining after this tick (0.0 once completed).
    pub after: f64,
    /// `Some(Event::TimerCompleted)` when this tick finished the countdown.
    pub completed: Option<Event>,
}

impl TickOutcome {
    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }
}

/// Core countdown engine.
///
/// Operates on monotonic instants supplied by the caller. Not reentrant:
/// callers sharing one engine across threads must serialize access.
#[derive(Debug, Clone)]
pub struct CountdownEngine {
    duration_secs: u32,
    state: CountdownState,
    /// Remaining time. Authoritative while not running; refreshed on tick.
    remaining: Duration,
    /// Absolute deadline while running.
    end_at: Option<Instant>,
    /// When the countdown reached zero (only while Completed).
    completed_at: Option<Instant>,
    grace: Duration,
}

impl CountdownEngine {
    /// Create an idle engine for `duration_secs`.
    ///
    /// The duration is not validated here; `start()` refuses to run an
    /// out-of-range duration.
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            state: CountdownState::Idle,
            remaining: Duration::from_secs(duration_secs.into()),
            end_at: None,
            completed_at: None,
            grace: AUTO_RESET_GRACE,
        }
    }

    /// Override the auto-reset grace delay.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining.as_secs_f64()
    }

    /// Remaining time rounded up to whole seconds.
    pub fn remaining_whole_secs(&self) -> u32 {
        self.remaining_secs().ceil() as u32
    }

    /// 1.0 .. 0.0 fraction of the duration still remaining.
    pub fn remaining_fraction(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        (self.remaining_secs() / f64::from(self.duration_secs)).clamp(0.0, 1.0)
    }

    pub fn completed_at(&self) -> Option<Instant> {
        self.completed_at
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let whole = self.remaining_whole_secs();
        EngineSnapshot {
            state: self.state,
            duration_seconds: self.duration_secs,
            remaining_seconds: self.remaining_secs(),
            remaining_whole_seconds: whole,
            remaining_fraction: self.remaining_fraction(),
            display: format_clock(whole),
        }
    }

    pub fn snapshot_event(&self) -> Event {
        Event::StateSnapshot {
            snapshot: self.snapshot(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set a new duration. Only allowed while idle.
    pub fn configure(&mut self, duration_secs: u32) -> Result<Event, PreconditionViolation> {
        self.require(CountdownState::Idle, "configure")?;
        check_duration(duration_secs)?;
        self.duration_secs = duration_secs;
        self.remaining = Duration::from_secs(duration_secs.into());
        info!(duration_secs, "countdown configured");
        Ok(Event::TimerConfigured {
            duration_secs,
            at: Utc::now(),
        })
    }

    pub fn start(&mut self, now: Instant) -> Result<Event, PreconditionViolation> {
        self.require(CountdownState::Idle, "start")?;
        check_duration(self.duration_secs)?;
        self.remaining = Duration::from_secs(self.duration_secs.into());
        self.end_at = Some(now + self.remaining);
        self.completed_at = None;
        self.state = CountdownState::Running;
        info!(duration_secs = self.duration_secs, "countdown started");
        Ok(Event::TimerStarted {
            duration_secs: self.duration_secs,
            at: Utc::now(),
        })
    }

    /// Freeze the remaining time. Paused time is never counted.
    ///
    /// Refused once the deadline has passed; the next `tick()` completes the
    /// countdown instead.
    pub fn pause(&mut self, now: Instant) -> Result<Event, PreconditionViolation> {
        self.require(CountdownState::Running, "pause")?;
        if self.end_at.is_some_and(|end| end <= now) {
            warn!("pause after the deadline, leaving completion to the next tick");
            return Err(PreconditionViolation::CountdownElapsed);
        }
        if let Some(end) = self.end_at.take() {
            self.remaining = end.saturating_duration_since(now);
        }
        self.state = CountdownState::Paused;
        info!(remaining_ms = self.remaining_ms(), "countdown paused");
        Ok(Event::TimerPaused {
            remaining_ms: self.remaining_ms(),
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self, now: Instant) -> Result<Event, PreconditionViolation> {
        self.require(CountdownState::Paused, "resume")?;
        self.end_at = Some(now + self.remaining);
        self.state = CountdownState::Running;
        info!(remaining_ms = self.remaining_ms(), "countdown resumed");
        Ok(Event::TimerResumed {
            remaining_ms: self.remaining_ms(),
            at: Utc::now(),
        })
    }

    /// Return to `Idle` with the full duration. Valid from every state.
    pub fn reset(&mut self) -> Event {
        if self.state != CountdownState::Idle {
            info!(from = %self.state, "countdown reset");
        }
        self.state = CountdownState::Idle;
        self.remaining = Duration::from_secs(self.duration_secs.into());
        self.end_at = None;
        self.completed_at = None;
        Event::TimerReset { at: Utc::now() }
    }

    /// Advance the countdown to `now`.
    ///
    /// Returns `None` when not running, so a late tick after `pause()` or
    /// `reset()` is harmless.
    pub fn tick(&mut self, now: Instant) -> Option<TickOutcome> {
        if self.state != CountdownState::Running {
            return None;
        }
        let end = self.end_at?;
        let before = self.remaining_secs();
        self.remaining = end.saturating_duration_since(now);

        if self.remaining.is_zero() {
            self.state = CountdownState::Completed;
            self.end_at = None;
            self.completed_at = Some(now);
            info!(duration_secs = self.duration_secs, "countdown completed");
            return Some(TickOutcome {
                before,
                after: 0.0,
                completed: Some(Event::TimerCompleted {
                    duration_secs: self.duration_secs,
                    at: Utc::now(),
                }),
            });
        }

        Some(TickOutcome {
            before,
            after: self.remaining_secs(),
            completed: None,
        })
    }

    /// Fall back to `Idle` once the grace delay after completion has passed.
    ///
    /// No-op unless the engine is still `Completed` and the grace delay
    /// measured from the completion instant has elapsed.
    pub fn auto_reset(&mut self, now: Instant) -> Option<Event> {
        if self.state != CountdownState::Completed {
            return None;
        }
        let completed_at = self.completed_at?;
        if now.saturating_duration_since(completed_at) < self.grace {
            return None;
        }
        self.reset();
        debug!("auto-reset after completion");
        Some(Event::TimerAutoReset { at: Utc::now() })
    }

    /// Points crossed while remaining time went from `before` to `after`.
    ///
    /// In elapsed time the tick covers `(elapsed_before, elapsed_after]`, so a
    /// point at `t` seconds remaining is due iff `after <= t < before`. This
    /// fires every point exactly once, including the completion point.
    /// Ordered by decreasing `trigger_seconds`, ties in insertion order.
    pub fn due_trigger_points(points: &TriggerPointSet, before: f64, after: f64) -> Vec<&TriggerPoint> {
        points
            .sorted_desc()
            .into_iter()
            .filter(|p| {
                let t = f64::from(p.trigger_seconds);
                after <= t && t < before
            })
            .collect()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require(&self, expected: CountdownState, operation: &'static str) -> Result<(), PreconditionViolation> {
        if self.state == expected {
            return Ok(());
        }
        warn!(operation, state = %self.state, "rejected countdown command");
        Err(PreconditionViolation::InvalidTransition {
            operation,
            state: self.state,
        })
    }

    fn remaining_ms(&self) -> u64 {
        u64::try_from(self.remaining.as_millis()).unwrap_or(u64::MAX)
    }
}

fn check_duration(duration_secs: u32) -> Result<(), PreconditionViolation> {
    if duration_in_range(duration_secs) {
        return Ok(());
    }
    warn!(duration_secs, "duration out of range");
    Err(PreconditionViolation::DurationOutOfRange {
        duration: duration_secs,
        min: MIN_DURATION_SECS,
        max: MAX_DURATION_SECS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::limits::FREE_POINT_CAPACITY;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn start_pause_resume() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(600);
        assert_eq!(engine.state(), CountdownState::Idle);

        engine.start(t0).unwrap();
        assert_eq!(engine.state(), CountdownState::Running);

        engine.pause(t0 + secs(5)).unwrap();
        assert_eq!(engine.state(), CountdownState::Paused);

        engine.resume(t0 + secs(60)).unwrap();
        assert_eq!(engine.state(), CountdownState::Running);
    }

    #[test]
    fn invalid_transitions_are_rejected_without_change() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(600);
        assert!(engine.pause(t0).is_err());
        assert!(engine.resume(t0).is_err());
        engine.start(t0).unwrap();
        let err = engine.start(t0).unwrap_err();
        assert_eq!(
            err,
            PreconditionViolation::InvalidTransition {
                operation: "start",
                state: CountdownState::Running
            }
        );
        assert!(engine.configure(900).is_err());
        assert_eq!(engine.state(), CountdownState::Running);
        assert_eq!(engine.duration_secs(), 600);
    }

    #[test]
    fn start_rejects_too_short_duration() {
        let mut engine = CountdownEngine::new(10);
        assert!(matches!(
            engine.start(Instant::now()),
            Err(PreconditionViolation::DurationOutOfRange { duration: 10, .. })
        ));
        assert_eq!(engine.state(), CountdownState::Idle);
    }

    #[test]
    fn configure_only_accepts_supported_range() {
        let mut engine = CountdownEngine::new(600);
        assert!(engine.configure(29).is_err());
        assert!(engine.configure(86_400).is_err());
        engine.configure(86_399).unwrap();
        assert_eq!(engine.remaining_whole_secs(), 86_399);
    }

    #[test]
    fn tick_tracks_fraction_and_ceiling_seconds() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(100);
        engine.start(t0).unwrap();
        let outcome = engine.tick(t0 + Duration::from_millis(25_500)).unwrap();
        assert_eq!(outcome.before, 100.0);
        assert!((outcome.after - 74.5).abs() < 1e-9);
        assert_eq!(engine.remaining_whole_secs(), 75);
        assert!((engine.remaining_fraction() - 0.745).abs() < 1e-9);
        let snap = engine.snapshot();
        assert_eq!(snap.display, "1:15");
    }

    #[test]
    fn tick_past_deadline_completes_and_clamps() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(30);
        engine.start(t0).unwrap();
        let outcome = engine.tick(t0 + secs(45)).unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.after, 0.0);
        assert_eq!(engine.state(), CountdownState::Completed);
        assert_eq!(engine.remaining_whole_secs(), 0);
        assert!(engine.tick(t0 + secs(46)).is_none());
    }

    #[test]
    fn paused_time_is_excluded() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(600);
        engine.start(t0).unwrap();
        engine.tick(t0 + secs(5));
        engine.pause(t0 + secs(5)).unwrap();
        let before_pause = engine.remaining();
        engine.resume(t0 + secs(3600)).unwrap();
        assert_eq!(engine.remaining(), before_pause);
        engine.tick(t0 + secs(3600) + Duration::from_millis(100));
        assert!((engine.remaining_secs() - 594.9).abs() < 1e-6);
    }

    #[test]
    fn pause_after_deadline_is_refused() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(60);
        engine.start(t0).unwrap();
        assert_eq!(engine.pause(t0 + secs(61)), Err(PreconditionViolation::CountdownElapsed));
        assert_eq!(engine.state(), CountdownState::Running);

        let outcome = engine.tick(t0 + secs(61)).unwrap();
        assert!(outcome.is_completed());
        assert_eq!(engine.state(), CountdownState::Completed);
    }

    #[test]
    fn reset_is_idempotent_from_every_state() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(120);
        engine.reset();
        assert_eq!(engine.state(), CountdownState::Idle);

        engine.start(t0).unwrap();
        engine.tick(t0 + secs(30));
        engine.reset();
        engine.reset();
        assert_eq!(engine.state(), CountdownState::Idle);
        assert_eq!(engine.remaining_whole_secs(), 120);

        engine.start(t0).unwrap();
        engine.pause(t0 + secs(10)).unwrap();
        engine.reset();
        assert_eq!(engine.remaining_whole_secs(), 120);

        engine.start(t0).unwrap();
        engine.tick(t0 + secs(200));
        assert_eq!(engine.state(), CountdownState::Completed);
        engine.reset();
        assert_eq!(engine.state(), CountdownState::Idle);
        assert_eq!(engine.remaining_whole_secs(), 120);
    }

    #[test]
    fn auto_reset_waits_for_grace() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(30);
        engine.start(t0).unwrap();
        engine.tick(t0 + secs(30));
        assert_eq!(engine.state(), CountdownState::Completed);
        assert!(engine.auto_reset(t0 + secs(30) + Duration::from_millis(500)).is_none());
        assert!(engine.auto_reset(t0 + secs(31)).is_some());
        assert_eq!(engine.state(), CountdownState::Idle);
        assert_eq!(engine.remaining_whole_secs(), 30);
    }

    #[test]
    fn auto_reset_after_manual_reset_is_noop() {
        let t0 = Instant::now();
        let mut engine = CountdownEngine::new(30);
        engine.start(t0).unwrap();
        engine.tick(t0 + secs(30));
        engine.reset();
        engine.start(t0 + secs(30)).unwrap();
        assert!(engine.auto_reset(t0 + secs(31)).is_none());
        assert_eq!(engine.state(), CountdownState::Running);
    }

    #[test]
    fn due_points_fire_once_across_straddling_ticks() {
        let mut points = TriggerPointSet::new(600);
        points.add(300, FREE_POINT_CAPACITY).unwrap();
        points.add(120, FREE_POINT_CAPACITY).unwrap();

        let due = CountdownEngine::due_trigger_points(&points, 310.0, 299.5);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].trigger_seconds, 300);

        // Landing exactly on a threshold fires it; the next tick does not.
        let due = CountdownEngine::due_trigger_points(&points, 121.0, 120.0);
        assert_eq!(due.len(), 1);
        assert!(CountdownEngine::due_trigger_points(&points, 120.0, 119.9).is_empty());

        // One huge tick crosses everything, highest threshold first.
        let due = CountdownEngine::due_trigger_points(&points, 600.0, 0.0);
        let order: Vec<u32> = due.iter().map(|p| p.trigger_seconds).collect();
        assert_eq!(order, vec![300, 120, 0]);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = CountdownEngine::new(900);
        match engine.snapshot_event() {
            Event::StateSnapshot { snapshot, .. } => {
                assert_eq!(snapshot.state, CountdownState::Idle);
                assert_eq!(snapshot.remaining_whole_seconds, 900);
                assert_eq!(snapshot.remaining_fraction, 1.0);
                assert_eq!(snapshot.display, "15:00");
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
