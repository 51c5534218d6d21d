//! Link configuration: joint kind, geometric limits, break thresholds,
//! coupling policy.
//!
//! A [`LinkConfig`] lives on the source peer and governs the whole link.
//! Zero is the "disabled" sentinel throughout: a zero length or angle limit
//! means unchecked, and a zero break force/torque means unbreakable.

use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which constraint family a link builds once established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointKind {
    /// Zero-length, all-axes-locked constraint (struts, hard docking).
    #[default]
    Rigid,
    /// Distance-only constraint with a winchable maximum length.
    Cable,
    /// Two spherical pivots joined by a strut, each bounded by a cone.
    TwoEndsSphere,
    /// Spherical hitch at the source end of a rigid bar.
    TowBar,
}

impl std::fmt::Display for JointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rigid => write!(f, "rigid"),
            Self::Cable => write!(f, "cable"),
            Self::TwoEndsSphere => write!(f, "two-ends-sphere"),
            Self::TowBar => write!(f, "tow-bar"),
        }
    }
}

/// How an established link decides between hierarchy merge and a physical
/// joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CouplingPolicy {
    /// Always merge the two bodies into one rigid hierarchy.
    AlwaysCoupled,
    /// Never merge; always connect through a physical constraint.
    NeverCouple,
    /// Mode is chosen at runtime; starts uncoupled.
    #[default]
    SetViaGui,
}

impl std::fmt::Display for CouplingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlwaysCoupled => write!(f, "always-coupled"),
            Self::NeverCouple => write!(f, "never-couple"),
            Self::SetViaGui => write!(f, "set-via-gui"),
        }
    }
}

/// Runtime input for changing a cable's deployed length.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CableLengthCommand {
    /// Set the deployed length to this value, clamped to the configured
    /// maximum.
    Deployed(f64),
    /// Sentinel: deploy to the configured maximum length.
    ConfiguredMax,
    /// Sentinel: use the current real anchor distance, clamped to the
    /// currently deployed limit.
    RealDistance,
}

/// Static configuration of a link, owned by its source peer.
///
/// Two peers can link only if their `link_type` tags match. All geometric
/// limits are checked before a link is established; only some joint kinds
/// keep enforcing them continuously afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Type tag; source and target must carry the same tag to link.
    pub link_type: String,
    /// Constraint family built for this link.
    pub joint_kind: JointKind,
    /// Minimum anchor-to-anchor distance in meters (0 = unbounded).
    pub min_link_length: f64,
    /// Maximum anchor-to-anchor distance in meters (0 = unbounded).
    pub max_link_length: f64,
    /// Maximum angle at the source between node forward and the link
    /// vector, in degrees (0 = unchecked).
    pub source_angle_limit_deg: f64,
    /// Maximum angle at the target, in degrees (0 = unchecked).
    pub target_angle_limit_deg: f64,
    /// Break force threshold in Newtons (0 = unbreakable).
    pub break_force: f64,
    /// Break torque threshold in Newton-meters (0 = unbreakable).
    pub break_torque: f64,
    /// Hierarchy-merge policy for this link.
    pub coupling_policy: CouplingPolicy,
    /// Cable spring force toward the length limit (N/m).
    pub cable_spring: f64,
    /// Cable damper coefficient (N·s/m).
    pub cable_damper: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            link_type: String::new(),
            joint_kind: JointKind::default(),
            min_link_length: 0.0,
            max_link_length: 0.0,
            source_angle_limit_deg: 0.0,
            target_angle_limit_deg: 0.0,
            break_force: 0.0,
            break_torque: 0.0,
            coupling_policy: CouplingPolicy::default(),
            cable_spring: 1000.0, // stiff enough to read as a rope, not a bungee
            cable_damper: 100.0,
        }
    }
}

impl LinkConfig {
    /// Create a config for the given link type with everything else at
    /// defaults (no limits, unbreakable, uncoupled).
    #[must_use]
    pub fn new(link_type: impl Into<String>) -> Self {
        Self {
            link_type: link_type.into(),
            ..Self::default()
        }
    }

    /// Set the joint kind.
    #[must_use]
    pub fn with_joint_kind(mut self, kind: JointKind) -> Self {
        self.joint_kind = kind;
        self
    }

    /// Set the length limits. Negative inputs are clamped to 0 (disabled)
    /// with a warning.
    #[must_use]
    pub fn with_length_limits(mut self, min: f64, max: f64) -> Self {
        self.min_link_length = sanitize_limit("min_link_length", min);
        self.max_link_length = sanitize_limit("max_link_length", max);
        if self.max_link_length > 0.0 && self.min_link_length > self.max_link_length {
            warn!(
                min = self.min_link_length,
                max = self.max_link_length,
                "min_link_length exceeds max_link_length, swapping"
            );
            std::mem::swap(&mut self.min_link_length, &mut self.max_link_length);
        }
        self
    }

    /// Set the angle limits in degrees. Negative inputs are clamped to 0
    /// (unchecked) with a warning.
    #[must_use]
    pub fn with_angle_limits(mut self, source_deg: f64, target_deg: f64) -> Self {
        self.source_angle_limit_deg = sanitize_limit("source_angle_limit_deg", source_deg);
        self.target_angle_limit_deg = sanitize_limit("target_angle_limit_deg", target_deg);
        self
    }

    /// Set the break thresholds. Zero means unbreakable; negative inputs
    /// are clamped to 0 with a warning.
    #[must_use]
    pub fn with_breakage(mut self, force: f64, torque: f64) -> Self {
        self.break_force = sanitize_limit("break_force", force);
        self.break_torque = sanitize_limit("break_torque", torque);
        self
    }

    /// Set the coupling policy.
    #[must_use]
    pub fn with_coupling_policy(mut self, policy: CouplingPolicy) -> Self {
        self.coupling_policy = policy;
        self
    }

    /// Set the cable spring and damper coefficients.
    #[must_use]
    pub fn with_cable_spring(mut self, spring: f64, damper: f64) -> Self {
        self.cable_spring = spring.max(0.0);
        self.cable_damper = damper.max(0.0);
        self
    }

    /// Check whether a length passes the configured limits.
    ///
    /// Zero-valued bounds are disabled; `min == max == 0` accepts any
    /// length.
    #[must_use]
    pub fn length_in_limits(&self, length: f64) -> bool {
        (self.min_link_length <= 0.0 || length >= self.min_link_length)
            && (self.max_link_length <= 0.0 || length <= self.max_link_length)
    }

    /// Check whether this config ever wants hierarchy coupling.
    #[must_use]
    pub fn wants_coupling(&self) -> bool {
        !matches!(self.coupling_policy, CouplingPolicy::NeverCouple)
    }
}

/// Clamp a configured limit to be non-negative, warning on correction.
fn sanitize_limit(name: &str, value: f64) -> f64 {
    if value < 0.0 || !value.is_finite() {
        warn!(name, value, "invalid limit value, disabling (0)");
        0.0
    } else {
        value
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unlimited_and_unbreakable() {
        let config = LinkConfig::default();
        assert!(config.length_in_limits(0.0));
        assert!(config.length_in_limits(1e9));
        assert_eq!(config.break_force, 0.0);
        assert_eq!(config.break_torque, 0.0);
    }

    #[test]
    fn test_length_limits() {
        let config = LinkConfig::new("A").with_length_limits(1.0, 5.0);
        assert!(!config.length_in_limits(0.5));
        assert!(config.length_in_limits(1.0));
        assert!(config.length_in_limits(5.0));
        assert!(!config.length_in_limits(5.5));
    }

    #[test]
    fn test_zero_bounds_disable_each_side() {
        let min_only = LinkConfig::new("A").with_length_limits(2.0, 0.0);
        assert!(!min_only.length_in_limits(1.0));
        assert!(min_only.length_in_limits(1e6));

        let max_only = LinkConfig::new("A").with_length_limits(0.0, 2.0);
        assert!(max_only.length_in_limits(0.0));
        assert!(!max_only.length_in_limits(3.0));
    }

    #[test]
    fn test_negative_limits_are_disabled() {
        let config = LinkConfig::new("A")
            .with_length_limits(-1.0, -2.0)
            .with_angle_limits(-10.0, f64::NAN)
            .with_breakage(-5.0, -5.0);
        assert_eq!(config.min_link_length, 0.0);
        assert_eq!(config.max_link_length, 0.0);
        assert_eq!(config.source_angle_limit_deg, 0.0);
        assert_eq!(config.target_angle_limit_deg, 0.0);
        assert_eq!(config.break_force, 0.0);
        assert_eq!(config.break_torque, 0.0);
    }

    #[test]
    fn test_swapped_length_limits_are_corrected() {
        let config = LinkConfig::new("A").with_length_limits(5.0, 1.0);
        assert_eq!(config.min_link_length, 1.0);
        assert_eq!(config.max_link_length, 5.0);
    }

    #[test]
    fn test_wants_coupling() {
        assert!(LinkConfig::new("A")
            .with_coupling_policy(CouplingPolicy::AlwaysCoupled)
            .wants_coupling());
        assert!(LinkConfig::new("A")
            .with_coupling_policy(CouplingPolicy::SetViaGui)
            .wants_coupling());
        assert!(!LinkConfig::new("A")
            .with_coupling_policy(CouplingPolicy::NeverCouple)
            .wants_coupling());
    }
}
