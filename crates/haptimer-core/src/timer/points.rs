//! Editable set of trigger points for one timer session.
//!
//! Positions are expressed as seconds *remaining*. The completion point at 0
//! is always present and immovable. Every other point is snapped down to the
//! snap interval and must keep the minimum spacing from every other point
//! and from the end of the countdown.
//!
//! Mutations are atomic: a rejected call leaves the set untouched.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::limits::{
    snap_down, MIN_POINT_SPACING_SECS, RANDOM_PLACEMENT_ATTEMPTS, SNAP_INTERVAL_SECS,
};
use crate::error::PlacementError;
use crate::haptics::HapticPattern;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPoint {
    pub id: Uuid,
    /// Seconds remaining at which the point fires. 0 = completion.
    pub trigger_seconds: u32,
    pub pattern: HapticPattern,
    pub is_mandatory: bool,
}

impl TriggerPoint {
    fn custom(trigger_seconds: u32, pattern: HapticPattern) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger_seconds,
            pattern,
            is_mandatory: false,
        }
    }

    fn completion(pattern: HapticPattern) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger_seconds: 0,
            pattern,
            is_mandatory: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerPointSet {
    duration_secs: u32,
    completion: TriggerPoint,
    /// Custom points in insertion order.
    custom: Vec<TriggerPoint>,
}

impl TriggerPointSet {
    /// Empty set (completion point only) for a countdown of `duration_secs`.
    pub fn new(duration_secs: u32) -> Self {
        Self::with_completion_pattern(duration_secs, HapticPattern::default())
    }

    pub fn with_completion_pattern(duration_secs: u32, pattern: HapticPattern) -> Self {
        Self {
            duration_secs,
            completion: TriggerPoint::completion(pattern),
            custom: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Highest position a custom point may take.
    pub fn max_position(&self) -> u32 {
        self.duration_secs.saturating_sub(MIN_POINT_SPACING_SECS)
    }

    pub fn mandatory(&self) -> &TriggerPoint {
        &self.completion
    }

    /// All points, completion point first, then custom points in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TriggerPoint> {
        std::iter::once(&self.completion).chain(self.custom.iter())
    }

    pub fn len(&self) -> usize {
        self.custom.len() + 1
    }

    /// Never true: the completion point is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of non-mandatory points.
    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&TriggerPoint> {
        self.iter().find(|p| p.id == id)
    }

    /// Points ordered by decreasing `trigger_seconds`, ties in insertion order.
    pub fn sorted_desc(&self) -> Vec<&TriggerPoint> {
        let mut points: Vec<&TriggerPoint> = self.iter().collect();
        points.sort_by(|a, b| b.trigger_seconds.cmp(&a.trigger_seconds));
        points
    }

    /// Check every placement invariant. Capacity is the caller's concern.
    pub fn is_consistent(&self) -> bool {
        if !self.completion.is_mandatory || self.completion.trigger_seconds != 0 {
            return false;
        }
        let max = self.max_position();
        let custom_ok = self.custom.iter().all(|p| {
            !p.is_mandatory
                && p.trigger_seconds > 0
                && p.trigger_seconds <= max
                && p.trigger_seconds % SNAP_INTERVAL_SECS == 0
        });
        let all: Vec<&TriggerPoint> = self.iter().collect();
        let spaced = all.iter().enumerate().all(|(i, a)| {
            all[i + 1..]
                .iter()
                .all(|b| a.trigger_seconds.abs_diff(b.trigger_seconds) >= MIN_POINT_SPACING_SECS)
        });
        custom_ok && spaced
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Add a point near `at` seconds remaining with the default pattern.
    pub fn add(&mut self, at: u32, capacity: usize) -> Result<TriggerPoint, PlacementError> {
        self.add_with_pattern(at, HapticPattern::default(), capacity)
    }

    pub fn add_with_pattern(
        &mut self,
        at: u32,
        pattern: HapticPattern,
        capacity: usize,
    ) -> Result<TriggerPoint, PlacementError> {
        self.check_capacity(capacity)?;
        let snapped = self.validate_position(at, None)?;
        let point = TriggerPoint::custom(snapped, pattern);
        debug!(at, snapped, pattern = %pattern, "adding haptic point");
        self.custom.push(point.clone());
        debug_assert!(self.is_consistent());
        Ok(point)
    }

    /// Place a point in any free slot, trying a bounded number of random
    /// snap-aligned candidates.
    pub fn add_anywhere<R: Rng + ?Sized>(
        &mut self,
        pattern: HapticPattern,
        capacity: usize,
        rng: &mut R,
    ) -> Result<TriggerPoint, PlacementError> {
        self.check_capacity(capacity)?;

        let slots = self.duration_secs / SNAP_INTERVAL_SECS;
        if slots > 1 {
            for _ in 0..RANDOM_PLACEMENT_ATTEMPTS {
                let candidate = rng.gen_range(1..slots) * SNAP_INTERVAL_SECS;
                if self.validate_position(candidate, None).is_ok() {
                    let point = TriggerPoint::custom(candidate, pattern);
                    debug!(candidate, pattern = %pattern, "placed haptic point at random slot");
                    self.custom.push(point.clone());
                    debug_assert!(self.is_consistent());
                    return Ok(point);
                }
            }
        }

        Err(PlacementError::NoValidPositionFound {
            attempts: RANDOM_PLACEMENT_ATTEMPTS,
        })
    }

    /// Move a custom point to `to` seconds remaining.
    pub fn move_point(&mut self, id: Uuid, to: u32) -> Result<u32, PlacementError> {
        if self.completion.id == id {
            return Err(PlacementError::MutationOfMandatoryPoint);
        }
        let index = self.custom_index(id)?;
        let snapped = self.validate_position(to, Some(id))?;
        self.custom[index].trigger_seconds = snapped;
        debug_assert!(self.is_consistent());
        Ok(snapped)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<TriggerPoint, PlacementError> {
        if self.completion.id == id {
            return Err(PlacementError::MutationOfMandatoryPoint);
        }
        let index = self.custom_index(id)?;
        Ok(self.custom.remove(index))
    }

    /// Change a point's pattern. Allowed for the completion point too.
    pub fn set_pattern(&mut self, id: Uuid, pattern: HapticPattern) -> Result<(), PlacementError> {
        if self.completion.id == id {
            self.completion.pattern = pattern;
            return Ok(());
        }
        let index = self.custom_index(id)?;
        self.custom[index].pattern = pattern;
        Ok(())
    }

    /// Retarget the set to a new countdown length.
    ///
    /// Returns the custom points evicted because they no longer fit.
    pub fn set_duration(&mut self, duration_secs: u32) -> Vec<TriggerPoint> {
        self.duration_secs = duration_secs;
        let max = self.max_position();
        let (kept, evicted): (Vec<_>, Vec<_>) = std::mem::take(&mut self.custom)
            .into_iter()
            .partition(|p| p.trigger_seconds <= max);
        self.custom = kept;
        if !evicted.is_empty() {
            debug!(duration_secs, evicted = evicted.len(), "evicted haptic points past new end");
        }
        evicted
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn check_capacity(&self, capacity: usize) -> Result<(), PlacementError> {
        if self.custom.len() >= capacity {
            return Err(PlacementError::CapacityReached { capacity });
        }
        Ok(())
    }

    fn custom_index(&self, id: Uuid) -> Result<usize, PlacementError> {
        self.custom
            .iter()
            .position(|p| p.id == id)
            .ok_or(PlacementError::PointNotFound(id))
    }

    /// Range-check the requested position, snap it, then check spacing.
    fn validate_position(&self, at: u32, excluding: Option<Uuid>) -> Result<u32, PlacementError> {
        let max = self.max_position();
        if at == 0 || at > max {
            return Err(PlacementError::OutOfRange { at, max });
        }
        let snapped = snap_down(at);
        if snapped == 0 {
            return Err(PlacementError::OutOfRange { at, max });
        }
        if let Some(neighbour) = self
            .iter()
            .filter(|p| Some(p.id) != excluding)
            .find(|p| p.trigger_seconds.abs_diff(snapped) < MIN_POINT_SPACING_SECS)
        {
            return Err(PlacementError::TooClose {
                at: snapped,
                neighbour: neighbour.trigger_seconds,
                spacing: MIN_POINT_SPACING_SECS,
            });
        }
        Ok(snapped)
    }
}
