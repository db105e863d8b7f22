//! # Haptimer Core Library
//!
//! This library provides the core logic for the Haptimer haptic countdown
//! timer: a countdown that fires named vibration patterns at user-chosen
//! moments before it reaches zero. Front ends (the bundled CLI, or a GUI)
//! drive it through [`TimerSession`] and render the cues it emits.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: A monotonic-clock state machine. Every command takes
//!   the current instant explicitly, so it is fully deterministic under test
//! - **Trigger Points**: An editable set of positions (seconds remaining) with
//!   snapping, spacing and capacity rules, plus an immovable completion point
//! - **Pattern Catalog**: A closed set of named haptic patterns, each expanding
//!   to a sequence of transient/continuous events
//! - **Scheduler**: A tokio tick loop that advances the engine, resolves due
//!   points and hands cues to a [`HapticSink`] off the ticking path
//! - **Storage**: TOML configuration and JSON saved-timer records
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Core countdown state machine
//! - [`TriggerPointSet`]: Placement rules for haptic points
//! - [`TimerSession`]: Running session owning an engine and its points
//! - [`Config`]: Application configuration management

pub mod entitlement;
pub mod error;
pub mod events;
pub mod haptics;
pub mod scheduler;
pub mod storage;
pub mod timer;

pub use entitlement::{EntitlementSource, StaticEntitlement, Tier};
pub use error::{ConfigError, CoreError, PlacementError, PreconditionViolation, StorageError};
pub use events::Event;
pub use haptics::{ChannelSink, HapticCue, HapticEvent, HapticPattern, HapticSink, TracingSink};
pub use scheduler::{SessionOptions, TimerSession};
pub use storage::{Config, PointRecord, PresetStore, TimerRecord};
pub use timer::{CountdownEngine, CountdownState, EngineSnapshot, TriggerPoint, TriggerPointSet};
