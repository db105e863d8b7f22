use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::haptics::HapticPattern;
use crate::timer::EngineSnapshot;

/// Every state change in a timer session produces an Event.
/// Front ends subscribe to them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerConfigured {
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    TimerStarted {
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    TimerCompleted {
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// Completed countdown fell back to idle after the grace delay.
    TimerAutoReset {
        at: DateTime<Utc>,
    },
    /// A trigger point came due and its cue was queued for rendering.
    PointFired {
        point_id: Uuid,
        trigger_seconds: u32,
        pattern: HapticPattern,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        #[serde(flatten)]
        snapshot: EngineSnapshot,
        at: DateTime<Utc>,
    },
}
