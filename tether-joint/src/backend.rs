//! The constraint-primitive contract the host physics engine fulfills.
//!
//! The core never solves constraints; it only describes them. A
//! [`ConstraintSpec`] names the two bodies, the anchors in each body's
//! local frame, per-axis motion, optional limits, and effective break
//! thresholds. The backend owns the actual solver objects and reports
//! breakage through [`ConstraintBreakEvent`]s.
//!
//! Break events carry only the involved body, not which constraint broke.
//! The engine fires them for *any* constraint on that body, so a consumer
//! must re-check [`ConstraintBackend::exists`] before concluding its own
//! joint failed.

use nalgebra::Point3;
use tether_types::{BodyId, ConstraintId, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-axis motion of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AxisMotion {
    /// No relative motion on this axis.
    #[default]
    Locked,
    /// Motion bounded by the constraint's limit.
    Limited,
    /// Unconstrained motion.
    Free,
}

/// Linear limit parameters: a spring toward a maximum separation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearLimit {
    /// Maximum allowed separation in meters.
    pub max_distance: f64,
    /// Spring force toward the limit (N/m).
    pub spring: f64,
    /// Damper coefficient (N·s/m).
    pub damper: f64,
}

impl LinearLimit {
    /// Create a limit with the given maximum distance, spring, and damper.
    #[must_use]
    pub fn new(max_distance: f64, spring: f64, damper: f64) -> Self {
        Self {
            max_distance: max_distance.max(0.0),
            spring,
            damper,
        }
    }
}

/// Description of one constraint between two bodies.
///
/// Anchors are in each body's local frame. Break thresholds are *effective*
/// values (the unbreakable sentinel already substituted with infinity);
/// constructors take a raw force/torque pair and do not re-interpret it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintSpec {
    /// Body owning the constraint (the link source).
    pub owner: BodyId,
    /// The other constrained body (the link target).
    pub partner: BodyId,
    /// Anchor in the owner's local frame.
    pub owner_anchor: Point3<f64>,
    /// Anchor in the partner's local frame.
    pub partner_anchor: Point3<f64>,
    /// Linear motion per local axis (X, Y, Z).
    pub linear_motion: [AxisMotion; 3],
    /// Angular motion per local axis (X, Y, Z).
    pub angular_motion: [AxisMotion; 3],
    /// Limit applied to `Limited` linear axes.
    pub linear_limit: Option<LinearLimit>,
    /// Cone limit in degrees applied to `Limited` angular axes.
    pub angular_limit_deg: Option<f64>,
    /// Effective break force threshold (N).
    pub break_force: f64,
    /// Effective break torque threshold (N·m).
    pub break_torque: f64,
}

impl ConstraintSpec {
    /// An all-axes-locked constraint: the two anchors become rigidly bound.
    #[must_use]
    pub fn rigid(
        owner: BodyId,
        partner: BodyId,
        owner_anchor: Point3<f64>,
        partner_anchor: Point3<f64>,
        break_force: f64,
        break_torque: f64,
    ) -> Self {
        Self {
            owner,
            partner,
            owner_anchor,
            partner_anchor,
            linear_motion: [AxisMotion::Locked; 3],
            angular_motion: [AxisMotion::Locked; 3],
            linear_limit: None,
            angular_limit_deg: None,
            break_force,
            break_torque,
        }
    }

    /// A distance constraint: free motion up to a maximum separation.
    #[must_use]
    pub fn distance(
        owner: BodyId,
        partner: BodyId,
        owner_anchor: Point3<f64>,
        partner_anchor: Point3<f64>,
        limit: LinearLimit,
        break_force: f64,
    ) -> Self {
        Self {
            owner,
            partner,
            owner_anchor,
            partner_anchor,
            linear_motion: [AxisMotion::Limited; 3],
            angular_motion: [AxisMotion::Free; 3],
            linear_limit: Some(limit),
            angular_limit_deg: None,
            // A pure distance constraint transmits no torque, so only the
            // force threshold is meaningful.
            break_force,
            break_torque: f64::INFINITY,
        }
    }

    /// A spherical pivot: linear axes locked, rotation bounded by a cone.
    ///
    /// A `cone_limit_deg` of `None` leaves rotation fully free.
    #[must_use]
    pub fn spherical(
        owner: BodyId,
        partner: BodyId,
        owner_anchor: Point3<f64>,
        partner_anchor: Point3<f64>,
        cone_limit_deg: Option<f64>,
        break_force: f64,
        break_torque: f64,
    ) -> Self {
        let angular = if cone_limit_deg.is_some() {
            [AxisMotion::Limited; 3]
        } else {
            [AxisMotion::Free; 3]
        };
        Self {
            owner,
            partner,
            owner_anchor,
            partner_anchor,
            linear_motion: [AxisMotion::Locked; 3],
            angular_motion: angular,
            linear_limit: None,
            angular_limit_deg: cone_limit_deg,
            break_force,
            break_torque,
        }
    }
}

/// Breakage notification from the physics engine.
///
/// Names the body a constraint broke on, nothing more precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintBreakEvent {
    /// The body one of whose constraints broke.
    pub body: BodyId,
}

/// The physics-engine joint surface consumed by joint kinds.
///
/// Implementations own the actual constraint objects; ids handed out by
/// [`create`](Self::create) stay valid until [`destroy`](Self::destroy) or
/// a break removes them.
pub trait ConstraintBackend {
    /// Create a constraint from a spec, returning its id.
    fn create(&mut self, spec: ConstraintSpec) -> Result<ConstraintId>;

    /// Destroy a constraint. Destroying an id that no longer exists is an
    /// error; callers that may race a break should check `exists` first.
    fn destroy(&mut self, id: ConstraintId) -> Result<()>;

    /// Check whether a constraint object still exists.
    fn exists(&self, id: ConstraintId) -> bool;

    /// Replace the break thresholds of an existing constraint.
    fn set_break_thresholds(&mut self, id: ConstraintId, force: f64, torque: f64) -> Result<()>;

    /// Replace the linear limit of an existing constraint.
    fn set_linear_limit(&mut self, id: ConstraintId, limit: LinearLimit) -> Result<()>;

    /// Take all break events reported since the last call.
    fn drain_break_events(&mut self) -> Vec<ConstraintBreakEvent>;
}
