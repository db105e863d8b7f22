pub mod config;
pub mod pattern;
pub mod preset;
pub mod run;
pub mod simulate;

use std::str::FromStr;

use haptimer_core::error::Result;
use haptimer_core::timer::limits::{duration_in_range, MAX_DURATION_SECS, MIN_DURATION_SECS};
use haptimer_core::timer::parse_duration;
use haptimer_core::{HapticPattern, PreconditionViolation, TriggerPointSet};

/// `--point <time>[:<pattern>]`, e.g. `300`, `5m:wave`, `1:30:heartbeat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointSpec {
    pub at: u32,
    pub pattern: Option<HapticPattern>,
}

impl FromStr for PointSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // `10:00` is a time, `10m:wave` is a time plus a pattern.
        if let Some((time, suffix)) = s.rsplit_once(':') {
            if let Ok(pattern) = suffix.parse::<HapticPattern>() {
                let at = parse_duration(time).map_err(|e| e.to_string())?;
                return Ok(Self {
                    at,
                    pattern: Some(pattern),
                });
            }
        }
        let at = parse_duration(s).map_err(|e| e.to_string())?;
        Ok(Self { at, pattern: None })
    }
}

/// clap value parser for duration arguments.
pub fn duration_arg(s: &str) -> std::result::Result<u32, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// Reject durations the engine would refuse to start.
pub fn check_duration(duration_secs: u32) -> std::result::Result<u32, PreconditionViolation> {
    if duration_in_range(duration_secs) {
        Ok(duration_secs)
    } else {
        Err(PreconditionViolation::DurationOutOfRange {
            duration: duration_secs,
            min: MIN_DURATION_SECS,
            max: MAX_DURATION_SECS,
        })
    }
}

/// Build a point set from command-line specs, stopping at the first rejection.
pub fn build_points(
    duration_secs: u32,
    completion: HapticPattern,
    specs: &[PointSpec],
    default_pattern: HapticPattern,
    capacity: usize,
) -> Result<TriggerPointSet> {
    check_duration(duration_secs)?;
    let mut points = TriggerPointSet::with_completion_pattern(duration_secs, completion);
    for spec in specs {
        points.add_with_pattern(spec.at, spec.pattern.unwrap_or(default_pattern), capacity)?;
    }
    Ok(points)
}
