//! Rendering sink seam.
//!
//! The timer core never talks to an actuator directly. When a trigger point
//! comes due, the scheduler resolves its pattern into a [`HapticCue`] and hands
//! it to an injected [`HapticSink`]. Rendering is fire-and-forget: the sink's
//! failures are its own concern.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::pattern::{HapticEvent, HapticPattern};

/// A due trigger point resolved against the pattern catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HapticCue {
    pub point_id: Uuid,
    pub trigger_seconds: u32,
    pub pattern: HapticPattern,
    pub events: Vec<HapticEvent>,
}

pub trait HapticSink: Send + Sync {
    /// Render `cue` now. Must not assume the caller waits for completion.
    fn render(&self, cue: &HapticCue);
}

/// Sink that only logs cues. Useful on hosts without an actuator.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl HapticSink for TracingSink {
    fn render(&self, cue: &HapticCue) {
        info!(
            pattern = %cue.pattern,
            trigger_seconds = cue.trigger_seconds,
            events = cue.events.len(),
            "rendering haptic cue"
        );
    }
}

/// Forwards cues to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<HapticCue>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HapticCue>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HapticSink for ChannelSink {
    fn render(&self, cue: &HapticCue) {
        if self.tx.send(cue.clone()).is_err() {
            warn!(pattern = %cue.pattern, "haptic cue receiver dropped");
        }
    }
}

impl<S: HapticSink + ?Sized> HapticSink for std::sync::Arc<S> {
    fn render(&self, cue: &HapticCue) {
        (**self).render(cue)
    }
}
