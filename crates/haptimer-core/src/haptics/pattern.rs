//! Named haptic patterns and their event recipes.
//!
//! The catalog is closed: every [`HapticPattern`] maps through an exhaustive
//! match to a generator producing a fixed sequence of [`HapticEvent`]s. Only
//! [`HapticPattern::Rolling`] draws random intensities, so callers must not
//! assume identical output across calls for that pattern.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticPattern {
    #[default]
    Pulse,
    Heartbeat,
    Wave,
    Staccato,
    Rolling,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticEventKind {
    /// Zero-length tap.
    Transient,
    /// Sustained buzz for `duration_secs`.
    Continuous,
}

/// One actuation instruction, relative to the start of the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HapticEvent {
    pub kind: HapticEventKind,
    pub offset_secs: f64,
    /// 0.0 ..= 1.0
    pub intensity: f64,
    /// 0.0 ..= 1.0
    pub sharpness: f64,
    pub duration_secs: f64,
}

impl HapticEvent {
    fn continuous(offset_secs: f64, intensity: f64, sharpness: f64, duration_secs: f64) -> Self {
        Self {
            kind: HapticEventKind::Continuous,
            offset_secs,
            intensity,
            sharpness,
            duration_secs,
        }
    }

    fn transient(offset_secs: f64, intensity: f64, sharpness: f64) -> Self {
        Self {
            kind: HapticEventKind::Transient,
            offset_secs,
            intensity,
            sharpness,
            duration_secs: 0.0,
        }
    }
}

const WAVE_STEPS: usize = 20;
const WAVE_DURATION_SECS: f64 = 2.0;
const ROLLING_SEGMENTS: usize = 5;
const ROLLING_DURATION_SECS: f64 = 2.5;
const ROLLING_INTENSITY_MIN: f64 = 0.6;
const ROLLING_INTENSITY_MAX: f64 = 0.8;

impl HapticPattern {
    pub const ALL: [HapticPattern; 6] = [
        HapticPattern::Pulse,
        HapticPattern::Heartbeat,
        HapticPattern::Wave,
        HapticPattern::Staccato,
        HapticPattern::Rolling,
        HapticPattern::Alert,
    ];

    /// Stable identifier used in persisted records.
    pub fn id(self) -> &'static str {
        match self {
            HapticPattern::Pulse => "pulse",
            HapticPattern::Heartbeat => "heartbeat",
            HapticPattern::Wave => "wave",
            HapticPattern::Staccato => "staccato",
            HapticPattern::Rolling => "rolling",
            HapticPattern::Alert => "alert",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HapticPattern::Pulse => "Pulse",
            HapticPattern::Heartbeat => "Heartbeat",
            HapticPattern::Wave => "Wave",
            HapticPattern::Staccato => "Staccato",
            HapticPattern::Rolling => "Rolling",
            HapticPattern::Alert => "Alert",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HapticPattern::Pulse => "One strong, smooth bump",
            HapticPattern::Heartbeat => "Two quick thumps (lub-dub)",
            HapticPattern::Wave => "Rising and falling intensity",
            HapticPattern::Staccato => "Four quick sharp taps",
            HapticPattern::Rolling => "Continuous rumble",
            HapticPattern::Alert => "Three medium pulses",
        }
    }

    /// Events for this pattern, using the thread RNG for `rolling`.
    pub fn events(self) -> Vec<HapticEvent> {
        events_for(self)
    }

    /// Time from the first event's start to the last event's end.
    pub fn total_duration_secs(self) -> f64 {
        // Rolling's jitter only touches intensity, so any RNG gives the same timing.
        let mut rng = rand::thread_rng();
        events_with_rng(self, &mut rng)
            .iter()
            .map(|e| e.offset_secs + e.duration_secs)
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for HapticPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown haptic pattern '{0}'")]
pub struct UnknownPattern(pub String);

impl FromStr for HapticPattern {
    type Err = UnknownPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        HapticPattern::ALL
            .into_iter()
            .find(|p| p.id() == needle)
            .ok_or_else(|| UnknownPattern(s.to_string()))
    }
}

/// Event sequence for `pattern` using the thread RNG.
pub fn events_for(pattern: HapticPattern) -> Vec<HapticEvent> {
    events_with_rng(pattern, &mut rand::thread_rng())
}

/// Event sequence for `pattern`, drawing any jitter from `rng`.
pub fn events_with_rng<R: Rng + ?Sized>(pattern: HapticPattern, rng: &mut R) -> Vec<HapticEvent> {
    match pattern {
        HapticPattern::Pulse => vec![HapticEvent::continuous(0.0, 1.0, 0.5, 0.5)],
        HapticPattern::Heartbeat => vec![
            HapticEvent::continuous(0.0, 0.8, 0.6, 0.15),
            HapticEvent::continuous(0.3, 1.0, 0.7, 0.2),
        ],
        HapticPattern::Wave => {
            let step = WAVE_DURATION_SECS / WAVE_STEPS as f64;
            (0..WAVE_STEPS)
                .map(|i| {
                    let progress = i as f64 / WAVE_STEPS as f64;
                    let intensity = (progress * PI).sin() * 0.7 + 0.3;
                    HapticEvent::continuous(i as f64 * step, intensity, 0.3, step)
                })
                .collect()
        }
        HapticPattern::Staccato => (0..4)
            .map(|i| HapticEvent::transient(i as f64 * 0.3, 0.8, 1.0))
            .collect(),
        HapticPattern::Rolling => {
            let segment = ROLLING_DURATION_SECS / ROLLING_SEGMENTS as f64;
            (0..ROLLING_SEGMENTS)
                .map(|i| {
                    let intensity = rng.gen_range(ROLLING_INTENSITY_MIN..=ROLLING_INTENSITY_MAX);
                    HapticEvent::continuous(i as f64 * segment, intensity, 0.3, segment)
                })
                .collect()
        }
        HapticPattern::Alert => (0..3)
            .map(|i| HapticEvent::continuous(i as f64 * 0.6, 0.7, 0.5, 0.3))
            .collect(),
    }
}
