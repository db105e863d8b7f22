//! Timer session and its scheduling loop.
//!
//! A [`TimerSession`] is the single logical owner of one [`CountdownEngine`]
//! and one [`TriggerPointSet`]. Every public operation takes the session
//! lock, so the engine sees exclusive, non-reentrant access even though the
//! tick loop runs on a tokio worker.
//!
//! While running, a tick loop wakes every `tick_interval`, advances the
//! engine, resolves newly-due points against the pattern catalog and queues
//! the resulting cues for the render loop. Rendering never blocks ticking.
//!
//! Cancellation is generation-based: `pause()`, `reset()` and every new run
//! bump the generation under the lock and abort the old tick task. A tick
//! that already woke up re-checks its generation under the lock and exits
//! without touching state.

mod tasks;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entitlement::{EntitlementSource, Tier};
use crate::error::{PlacementError, PreconditionViolation};
use crate::events::Event;
use crate::haptics::{events_with_rng, HapticCue, HapticPattern, HapticSink};
use crate::storage::{Config, TimerRecord};
use crate::timer::limits::{AUTO_RESET_GRACE, DEFAULT_TICK_INTERVAL};
use crate::timer::{CountdownEngine, CountdownState, EngineSnapshot, TriggerPoint, TriggerPointSet};
use tasks::TickStep;

const EVENT_CAPACITY: usize = 64;

/// Current instant on the tokio clock (honours paused time in tests).
pub(crate) fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub tick_interval: Duration,
    pub auto_reset_grace: Duration,
    /// Seed for randomized placement and pattern jitter; entropy when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            auto_reset_grace: AUTO_RESET_GRACE,
            rng_seed: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.timer.tick_interval_ms.max(1)),
            auto_reset_grace: Duration::from_millis(config.timer.auto_reset_grace_ms),
            rng_seed: config.haptics.rng_seed,
        }
    }
}

struct SessionState {
    engine: CountdownEngine,
    points: TriggerPointSet,
    /// Bumped whenever the current tick loop must stop.
    generation: u64,
    ticker: Option<JoinHandle<()>>,
    rng: Mcg128Xsl64,
}

pub(crate) struct Shared {
    state: Mutex<SessionState>,
    tick_interval: Duration,
    cues: mpsc::UnboundedSender<HapticCue>,
    snapshots: watch::Sender<EngineSnapshot>,
    events: broadcast::Sender<Event>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Engine and point set mutations are atomic, so a poisoned lock still
        // guards consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish(&self, state: &SessionState, event: Event) {
        self.snapshots.send_replace(state.engine.snapshot());
        self.emit(event);
    }

    fn tick_once(&self, generation: u64, now: Instant) -> TickStep {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.generation != generation {
            return TickStep::Stale;
        }
        let Some(outcome) = state.engine.tick(now) else {
            return TickStep::Stale;
        };

        self.fire_due(state, outcome.before, outcome.after);
        self.snapshots.send_replace(state.engine.snapshot());

        match outcome.completed {
            Some(event) => {
                self.emit(event);
                TickStep::Completed {
                    grace: state.engine.grace(),
                }
            }
            None => TickStep::Continue,
        }
    }

    /// Queue a cue for every point crossed between `before` and `after`.
    fn fire_due(&self, state: &mut SessionState, before: f64, after: f64) {
        for point in CountdownEngine::due_trigger_points(&state.points, before, after) {
            let cue = HapticCue {
                point_id: point.id,
                trigger_seconds: point.trigger_seconds,
                pattern: point.pattern,
                events: events_with_rng(point.pattern, &mut state.rng),
            };
            debug!(trigger_seconds = point.trigger_seconds, pattern = %point.pattern, "haptic point due");
            if self.cues.send(cue).is_err() {
                warn!(trigger_seconds = point.trigger_seconds, "render queue closed, dropping cue");
            }
            self.emit(Event::PointFired {
                point_id: point.id,
                trigger_seconds: point.trigger_seconds,
                pattern: point.pattern,
                at: Utc::now(),
            });
        }
    }

    /// Delayed transition after completion.
    fn finish_grace(&self, generation: u64, now: Instant) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        if let Some(event) = state.engine.auto_reset(now) {
            state.ticker = None;
            self.publish(&state, event);
        }
    }
}

/// One countdown with its haptic points, a sink and an entitlement source.
///
/// Must be created inside a tokio runtime.
pub struct TimerSession {
    shared: Arc<Shared>,
    entitlements: Arc<dyn EntitlementSource>,
}

impl TimerSession {
    pub fn new(
        duration_secs: u32,
        options: SessionOptions,
        sink: Arc<dyn HapticSink>,
        entitlements: Arc<dyn EntitlementSource>,
    ) -> Self {
        Self::with_points(TriggerPointSet::new(duration_secs), options, sink, entitlements)
    }

    /// Build a session around an existing point set (e.g. a restored timer).
    pub fn with_points(
        points: TriggerPointSet,
        options: SessionOptions,
        sink: Arc<dyn HapticSink>,
        entitlements: Arc<dyn EntitlementSource>,
    ) -> Self {
        let engine = CountdownEngine::new(points.duration_secs()).with_grace(options.auto_reset_grace);
        let rng = match options.rng_seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let (cue_tx, cue_rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(engine.snapshot());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        tokio::spawn(tasks::render_loop(sink, cue_rx));

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    engine,
                    points,
                    generation: 0,
                    ticker: None,
                    rng,
                }),
                tick_interval: options.tick_interval,
                cues: cue_tx,
                snapshots,
                events,
            }),
            entitlements,
        }
    }

    /// Restore a saved timer into a fresh idle session.
    pub fn from_record(
        record: &TimerRecord,
        options: SessionOptions,
        sink: Arc<dyn HapticSink>,
        entitlements: Arc<dyn EntitlementSource>,
    ) -> Self {
        Self::with_points(record.restore(), options, sink, entitlements)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        self.shared.lock().engine.state()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.shared.lock().engine.snapshot()
    }

    pub fn points(&self) -> Vec<TriggerPoint> {
        self.shared.lock().points.iter().cloned().collect()
    }

    pub fn point_set(&self) -> TriggerPointSet {
        self.shared.lock().points.clone()
    }

    pub fn tier(&self) -> Tier {
        Tier::current(self.entitlements.as_ref())
    }

    /// Snapshot stream, updated after every tick and command.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    /// The current snapshot as an event, for consumers of the event stream.
    pub fn snapshot_event(&self) -> Event {
        self.shared.lock().engine.snapshot_event()
    }

    pub fn to_record(&self, name: &str, color_tag: &str) -> TimerRecord {
        let state = self.shared.lock();
        TimerRecord::capture(name, color_tag, &state.points)
    }

    // ── Countdown commands ───────────────────────────────────────────

    /// Change the duration while idle. Returns points evicted by a shorter duration.
    pub fn configure(&self, duration_secs: u32) -> Result<Vec<TriggerPoint>, PreconditionViolation> {
        let mut state = self.shared.lock();
        let event = state.engine.configure(duration_secs)?;
        let evicted = state.points.set_duration(duration_secs);
        self.shared.publish(&state, event);
        Ok(evicted)
    }

    pub fn start(&self) -> Result<Event, PreconditionViolation> {
        let mut guard = self.shared.lock();
        let event = guard.engine.start(now())?;
        self.launch_ticker(&mut guard);
        self.shared.publish(&guard, event.clone());
        Ok(event)
    }

    /// Pause and stop ticking. Points crossed since the last tick still fire.
    pub fn pause(&self) -> Result<Event, PreconditionViolation> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let before = state.engine.remaining_secs();
        let event = state.engine.pause(now())?;
        halt_ticker(state);
        let after = state.engine.remaining_secs();
        self.shared.fire_due(state, before, after);
        self.shared.publish(state, event.clone());
        Ok(event)
    }

    pub fn resume(&self) -> Result<Event, PreconditionViolation> {
        let mut guard = self.shared.lock();
        let event = guard.engine.resume(now())?;
        self.launch_ticker(&mut guard);
        self.shared.publish(&guard, event.clone());
        Ok(event)
    }

    /// Back to idle from any state; no point fires after this returns.
    pub fn reset(&self) -> Event {
        let mut guard = self.shared.lock();
        let event = guard.engine.reset();
        halt_ticker(&mut guard);
        self.shared.publish(&guard, event.clone());
        event
    }

    // ── Point commands ───────────────────────────────────────────────

    /// Add a point near `at` seconds remaining. Capacity follows the current tier.
    pub fn add_point(&self, at: u32, pattern: HapticPattern) -> Result<TriggerPoint, PlacementError> {
        let capacity = self.tier().point_capacity();
        let mut state = self.shared.lock();
        state
            .points
            .add_with_pattern(at, pattern, capacity)
            .map_err(|e| rejected("add", e))
    }

    /// Add a point in any free slot.
    pub fn add_point_anywhere(&self, pattern: HapticPattern) -> Result<TriggerPoint, PlacementError> {
        let capacity = self.tier().point_capacity();
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        state
            .points
            .add_anywhere(pattern, capacity, &mut state.rng)
            .map_err(|e| rejected("add", e))
    }

    pub fn move_point(&self, id: Uuid, to: u32) -> Result<u32, PlacementError> {
        self.shared
            .lock()
            .points
            .move_point(id, to)
            .map_err(|e| rejected("move", e))
    }

    pub fn remove_point(&self, id: Uuid) -> Result<TriggerPoint, PlacementError> {
        self.shared
            .lock()
            .points
            .remove(id)
            .map_err(|e| rejected("remove", e))
    }

    pub fn set_point_pattern(&self, id: Uuid, pattern: HapticPattern) -> Result<(), PlacementError> {
        self.shared
            .lock()
            .points
            .set_pattern(id, pattern)
            .map_err(|e| rejected("set pattern of", e))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn launch_ticker(&self, state: &mut SessionState) {
        halt_ticker(state);
        let handle = tokio::spawn(tasks::tick_loop(Arc::clone(&self.shared), state.generation));
        state.ticker = Some(handle);
    }
}

impl Drop for TimerSession {
    fn drop(&mut self) {
        halt_ticker(&mut self.shared.lock());
    }
}

fn halt_ticker(state: &mut SessionState) {
    state.generation += 1;
    if let Some(handle) = state.ticker.take() {
        handle.abort();
    }
}

fn rejected(operation: &str, error: PlacementError) -> PlacementError {
    warn!(operation, "haptic point {operation} rejected: {error}");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::StaticEntitlement;
    use crate::haptics::ChannelSink;

    fn session(duration: u32) -> TimerSession {
        let (sink, _rx) = ChannelSink::new();
        TimerSession::new(
            duration,
            SessionOptions::default(),
            Arc::new(sink),
            Arc::new(StaticEntitlement(false)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn late_tick_after_pause_is_ignored() {
        let session = session(60);
        session.add_point(30, HapticPattern::Wave).unwrap();
        session.start().unwrap();
        let stale_generation = session.shared.lock().generation;

        tokio::time::sleep(Duration::from_millis(250)).await;
        session.pause().unwrap();
        let frozen = session.snapshot();

        let mut events = session.events();
        let step = session
            .shared
            .tick_once(stale_generation, now() + Duration::from_secs(120));
        assert_eq!(step, TickStep::Stale);
        assert_eq!(session.state(), CountdownState::Paused);
        assert_eq!(session.snapshot(), frozen);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn grace_timer_from_old_run_does_not_reset_new_run() {
        let session = session(30);
        session.start().unwrap();
        let old_generation = session.shared.lock().generation;
        session.reset();
        session.start().unwrap();
        session
            .shared
            .finish_grace(old_generation, now() + Duration::from_secs(5));
        assert_eq!(session.state(), CountdownState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_follows_entitlement() {
        let (sink, _rx) = ChannelSink::new();
        let premium = TimerSession::new(
            3600,
            SessionOptions::default(),
            Arc::new(sink),
            Arc::new(StaticEntitlement(true)),
        );
        for at in [300, 600, 900, 1200, 1500] {
            premium.add_point(at, HapticPattern::Pulse).unwrap();
        }
        assert!(matches!(
            premium.add_point(1800, HapticPattern::Pulse),
            Err(PlacementError::CapacityReached { capacity: 5 })
        ));

        let free = session(3600);
        for at in [300, 600, 900] {
            free.add_point(at, HapticPattern::Pulse).unwrap();
        }
        assert!(matches!(
            free.add_point_anywhere(HapticPattern::Pulse),
            Err(PlacementError::CapacityReached { capacity: 3 })
        ));
    }
}
