//! Break thresholds and the zero = unbreakable sentinel.
//!
//! Part configurations use `0` to mean "this joint never breaks". The
//! physics backend expresses the same thing as an infinite threshold, so
//! the sentinel substitution happens here, in exactly one place, and every
//! joint kind routes its thresholds through it.

use tether_types::LinkConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configured break force/torque thresholds for a joint.
///
/// Raw values keep the configuration convention (0 = unbreakable);
/// [`effective_force`](Self::effective_force) and
/// [`effective_torque`](Self::effective_torque) produce what the backend
/// actually consumes. The same substitution applies to the temporary
/// indestructible set used while the simulation is not actively stepping.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BreakageSpec {
    force: f64,
    torque: f64,
}

impl BreakageSpec {
    /// Create a spec from raw configured thresholds.
    ///
    /// Negative or non-finite inputs are treated as 0 (unbreakable).
    #[must_use]
    pub fn new(force: f64, torque: f64) -> Self {
        let sanitize = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            force: sanitize(force),
            torque: sanitize(torque),
        }
    }

    /// The unbreakable spec (both thresholds at the sentinel).
    #[must_use]
    pub fn unbreakable() -> Self {
        Self {
            force: 0.0,
            torque: 0.0,
        }
    }

    /// Read the thresholds out of a link configuration.
    #[must_use]
    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.break_force, config.break_torque)
    }

    /// Raw configured break force (0 = unbreakable).
    #[must_use]
    pub fn force(&self) -> f64 {
        self.force
    }

    /// Raw configured break torque (0 = unbreakable).
    #[must_use]
    pub fn torque(&self) -> f64 {
        self.torque
    }

    /// Break force as the backend consumes it: the sentinel becomes
    /// `f64::INFINITY`.
    #[must_use]
    pub fn effective_force(&self) -> f64 {
        if self.force <= 0.0 {
            f64::INFINITY
        } else {
            self.force
        }
    }

    /// Break torque as the backend consumes it: the sentinel becomes
    /// `f64::INFINITY`.
    #[must_use]
    pub fn effective_torque(&self) -> f64 {
        if self.torque <= 0.0 {
            f64::INFINITY
        } else {
            self.torque
        }
    }

    /// Check whether this spec can break at all.
    #[must_use]
    pub fn is_unbreakable(&self) -> bool {
        self.force <= 0.0 && self.torque <= 0.0
    }
}

impl Default for BreakageSpec {
    fn default() -> Self {
        Self::unbreakable()
    }
}
