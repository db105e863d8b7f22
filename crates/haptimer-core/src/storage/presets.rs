//! Saved timer configurations.
//!
//! A [`TimerRecord`] is the portable shape of a timer: duration, colour tag
//! and its trigger points. Records are kept in `<data_dir>/presets.json` by
//! [`PresetStore`]. Loading is forgiving: [`TimerRecord::restore`] repairs
//! whatever it can and drops what it cannot, so a hand-edited or outdated
//! file never produces an inconsistent point set.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::data_dir;
use crate::error::StorageError;
use crate::haptics::HapticPattern;
use crate::timer::limits::{MAX_DURATION_SECS, MIN_DURATION_SECS};
use crate::timer::TriggerPointSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    pub trigger_seconds: u32,
    pub pattern_id: String,
    #[serde(default)]
    pub is_mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub name: String,
    pub duration_seconds: u32,
    pub color_tag: String,
    pub points: Vec<PointRecord>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_used_at: DateTime<Utc>,
}

impl TimerRecord {
    /// Snapshot a point set under `name`. Points are stored in descending
    /// trigger order.
    pub fn capture(name: &str, color_tag: &str, points: &TriggerPointSet) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            duration_seconds: points.duration_secs(),
            color_tag: color_tag.to_string(),
            points: points
                .sorted_desc()
                .into_iter()
                .map(|p| PointRecord {
                    trigger_seconds: p.trigger_seconds,
                    pattern_id: p.pattern.id().to_string(),
                    is_mandatory: p.is_mandatory,
                })
                .collect(),
            created_at: now,
            last_used_at: now,
        }
    }

    /// Rebuild a consistent point set from this record.
    ///
    /// Out-of-range durations are clamped, a missing completion point is
    /// added with `pulse`, unknown patterns become `pulse`, and points that
    /// break placement rules are dropped. Tier capacity is not applied.
    pub fn restore(&self) -> TriggerPointSet {
        let name = self.name.as_str();
        let duration = self
            .duration_seconds
            .clamp(MIN_DURATION_SECS, MAX_DURATION_SECS);
        if duration != self.duration_seconds {
            warn!(timer = name, stored = self.duration_seconds, duration, "clamped saved timer duration");
        }

        let mut mandatory = self.points.iter().filter(|p| p.is_mandatory);
        let completion_pattern = match mandatory.next() {
            Some(point) => {
                if point.trigger_seconds != 0 {
                    warn!(timer = name, at = point.trigger_seconds, "moved completion point back to 0");
                }
                pattern_or_pulse(name, &point.pattern_id)
            }
            None => {
                warn!(timer = name, "saved timer had no completion point; added one");
                HapticPattern::Pulse
            }
        };
        let extra = mandatory.count();
        if extra > 0 {
            warn!(timer = name, extra, "dropped duplicate completion points");
        }

        let mut set = TriggerPointSet::with_completion_pattern(duration, completion_pattern);
        for point in self.points.iter().filter(|p| !p.is_mandatory) {
            let pattern = pattern_or_pulse(name, &point.pattern_id);
            if let Err(e) = set.add_with_pattern(point.trigger_seconds, pattern, usize::MAX) {
                warn!(timer = name, at = point.trigger_seconds, "dropped saved point: {e}");
            }
        }
        set
    }
}

fn pattern_or_pulse(name: &str, id: &str) -> HapticPattern {
    id.parse().unwrap_or_else(|_| {
        warn!(timer = name, pattern = id, "unknown pattern in saved timer; using pulse");
        HapticPattern::Pulse
    })
}

/// Named timer records in a single JSON file.
#[derive(Debug, Clone)]
pub struct PresetStore {
    path: PathBuf,
}

impl PresetStore {
    /// Store under `dir` (the file is created on first save).
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join("presets.json"),
        }
    }

    /// Store in the application data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|source| StorageError::Io {
            path: PathBuf::from("presets.json"),
            source,
        })?;
        Ok(Self::open(&dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the record with the same name.
    ///
    /// # Errors
    /// `SlotsExhausted` when `record` is new and `slots` records already
    /// exist; IO or JSON errors from the backing file.
    pub fn save(&self, record: TimerRecord, slots: usize) -> Result<(), StorageError> {
        let mut records = self.read_all()?;
        match records.iter_mut().find(|r| r.name == record.name) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = TimerRecord {
                    created_at,
                    ..record
                };
            }
            None => {
                if records.len() >= slots {
                    return Err(StorageError::SlotsExhausted { slots });
                }
                records.push(record);
            }
        }
        self.write_all(&records)
    }

    /// All records, most recently used first.
    pub fn list(&self) -> Result<Vec<TimerRecord>, StorageError> {
        let mut records = self.read_all()?;
        records.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(records)
    }

    pub fn get(&self, name: &str) -> Result<TimerRecord, StorageError> {
        self.read_all()?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    /// Mark a record as used now and return it.
    pub fn touch(&self, name: &str) -> Result<TimerRecord, StorageError> {
        let mut records = self.read_all()?;
        let record = records
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        record.last_used_at = Utc::now();
        let touched = record.clone();
        self.write_all(&records)?;
        Ok(touched)
    }

    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        let mut records = self.read_all()?;
        let before = records.len();
        records.retain(|r| r.name != name);
        if records.len() == before {
            return Err(StorageError::NotFound(name.to_string()));
        }
        self.write_all(&records)
    }

    fn read_all(&self) -> Result<Vec<TimerRecord>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, records: &[TimerRecord]) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(records).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), count = records.len(), "saved timer store written");
        Ok(())
    }
}
