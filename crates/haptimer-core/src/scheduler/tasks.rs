//! Background tasks driving a [`TimerSession`](super::TimerSession).
//!
//! Two kinds of task run per session:
//!
//! - the **tick loop**, spawned on every start/resume and aborted on
//!   pause/reset; it ticks the engine at a fixed cadence and, once the
//!   countdown completes, sleeps through the grace delay and performs the
//!   delayed auto-reset;
//! - the **render loop**, one per session, which drains the cue queue and
//!   hands each cue to the sink on a blocking task without waiting for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use super::Shared;
use crate::haptics::{HapticCue, HapticSink};

/// What the tick loop should do after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TickStep {
    Continue,
    /// Countdown finished; wait `grace` and then auto-reset.
    Completed { grace: Duration },
    /// The run this loop belonged to was paused, reset or restarted.
    Stale,
}

pub(super) async fn tick_loop(shared: Arc<Shared>, generation: u64) {
    let mut interval = tokio::time::interval(shared.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the engine was just anchored.
    interval.tick().await;

    loop {
        interval.tick().await;
        match shared.tick_once(generation, super::now()) {
            TickStep::Continue => {}
            TickStep::Completed { grace } => {
                tokio::time::sleep(grace).await;
                shared.finish_grace(generation, super::now());
                return;
            }
            TickStep::Stale => {
                debug!(generation, "tick loop superseded");
                return;
            }
        }
    }
}

pub(super) async fn render_loop(sink: Arc<dyn HapticSink>, mut cues: mpsc::UnboundedReceiver<HapticCue>) {
    // Renders run concurrently; a slow sink never holds back the next cue.
    let mut renders = JoinSet::new();
    loop {
        tokio::select! {
            cue = cues.recv() => match cue {
                Some(cue) => {
                    let sink = Arc::clone(&sink);
                    renders.spawn_blocking(move || sink.render(&cue));
                }
                None => break,
            },
            Some(done) = renders.join_next() => log_render(done),
        }
    }
    while let Some(done) = renders.join_next().await {
        log_render(done);
    }
    debug!("render queue closed");
}

fn log_render(done: Result<(), JoinError>) {
    // A panicking sink only takes down its own blocking task.
    if let Err(e) = done {
        error!("haptic sink failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;

    use uuid::Uuid;

    use crate::haptics::HapticPattern;

    fn cue(pattern: HapticPattern, trigger_seconds: u32) -> HapticCue {
        HapticCue {
            point_id: Uuid::new_v4(),
            trigger_seconds,
            pattern,
            events: pattern.events(),
        }
    }

    /// Holds the `wave` render until another cue has been rendered.
    struct GateSink {
        release: Mutex<Option<std_mpsc::Sender<()>>>,
        wait: Mutex<Option<std_mpsc::Receiver<()>>>,
        rendered: mpsc::UnboundedSender<(HapticPattern, bool)>,
    }

    impl HapticSink for GateSink {
        fn render(&self, cue: &HapticCue) {
            if cue.pattern == HapticPattern::Wave {
                let waiter = self.wait.lock().unwrap().take();
                let released = waiter.is_some_and(|rx| rx.recv_timeout(Duration::from_secs(5)).is_ok());
                let _ = self.rendered.send((cue.pattern, released));
            } else {
                let _ = self.rendered.send((cue.pattern, true));
                if let Some(tx) = self.release.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }
        }
    }

    #[tokio::test]
    async fn slow_render_does_not_hold_back_later_cues() {
        let (release, wait) = std_mpsc::channel();
        let (rendered_tx, mut rendered) = mpsc::unbounded_channel();
        let sink = Arc::new(GateSink {
            release: Mutex::new(Some(release)),
            wait: Mutex::new(Some(wait)),
            rendered: rendered_tx,
        });
        let (cue_tx, cue_rx) = mpsc::unbounded_channel();
        let renderer = tokio::spawn(render_loop(sink, cue_rx));

        cue_tx.send(cue(HapticPattern::Wave, 60)).unwrap();
        cue_tx.send(cue(HapticPattern::Pulse, 0)).unwrap();
        drop(cue_tx);

        assert_eq!(rendered.recv().await, Some((HapticPattern::Pulse, true)));
        assert_eq!(rendered.recv().await, Some((HapticPattern::Wave, true)));
        renderer.await.unwrap();
    }
}
