//! Fixed limits shared by the engine, the point set and the tiers.

use std::time::Duration;

pub const MIN_DURATION_SECS: u32 = 30;
/// 23:59:59
pub const MAX_DURATION_SECS: u32 = 86_399;

pub const MIN_POINT_SPACING_SECS: u32 = 30;
pub const SNAP_INTERVAL_SECS: u32 = 30;

pub const FREE_POINT_CAPACITY: usize = 3;
pub const PREMIUM_POINT_CAPACITY: usize = 5;
pub const PREMIUM_SAVED_TIMER_SLOTS: usize = 15;

/// Candidates tried by randomized placement before giving up.
pub const RANDOM_PLACEMENT_ATTEMPTS: usize = 10;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Time spent in `Completed` before the engine falls back to `Idle`.
pub const AUTO_RESET_GRACE: Duration = Duration::from_secs(1);

pub const DEFAULT_COLOR_TAG: &str = "FF8C42";

/// Round down to the nearest snap interval multiple.
pub fn snap_down(seconds: u32) -> u32 {
    seconds / SNAP_INTERVAL_SECS * SNAP_INTERVAL_SECS
}

pub fn duration_in_range(seconds: u32) -> bool {
    (MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&seconds)
}
