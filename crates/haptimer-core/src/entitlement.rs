//! Tier lookup seam.
//!
//! The core never decides who is premium. A session asks its injected
//! [`EntitlementSource`] at the moment a point is added and turns the answer
//! into a plain capacity number.

use serde::{Deserialize, Serialize};

use crate::timer::limits::{FREE_POINT_CAPACITY, PREMIUM_POINT_CAPACITY, PREMIUM_SAVED_TIMER_SLOTS};

pub trait EntitlementSource: Send + Sync {
    fn is_premium_tier(&self) -> bool;
}

/// Fixed answer, e.g. read once from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEntitlement(pub bool);

impl EntitlementSource for StaticEntitlement {
    fn is_premium_tier(&self) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn current(source: &dyn EntitlementSource) -> Self {
        if source.is_premium_tier() {
            Tier::Premium
        } else {
            Tier::Free
        }
    }

    /// Maximum number of custom (non-completion) points.
    pub fn point_capacity(self) -> usize {
        match self {
            Tier::Free => FREE_POINT_CAPACITY,
            Tier::Premium => PREMIUM_POINT_CAPACITY,
        }
    }

    /// Saved timers are a premium feature.
    pub fn saved_timer_slots(self) -> usize {
        match self {
            Tier::Free => 0,
            Tier::Premium => PREMIUM_SAVED_TIMER_SLOTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_follow_tier() {
        assert_eq!(Tier::current(&StaticEntitlement(false)).point_capacity(), 3);
        assert_eq!(Tier::current(&StaticEntitlement(true)).point_capacity(), 5);
        assert_eq!(Tier::Free.saved_timer_slots(), 0);
        assert_eq!(Tier::Premium.saved_timer_slots(), 15);
    }
}
