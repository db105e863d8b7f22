mod display;
mod engine;
pub mod limits;
mod points;

pub use display::{format_clock, parse_duration, DurationParseError};
pub use engine::{CountdownEngine, CountdownState, EngineSnapshot, TickOutcome};
pub use points::{TriggerPoint, TriggerPointSet};
