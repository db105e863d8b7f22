mod pattern;
mod sink;

pub use pattern::{
    events_for, events_with_rng, HapticEvent, HapticEventKind, HapticPattern, UnknownPattern,
};
pub use sink::{ChannelSink, HapticCue, HapticSink, TracingSink};
