//! The closed set of joint kinds and their constraint formulations.
//!
//! Each kind knows how to express itself as one or two backend constraints
//! and how to tear them down again. Selection is by [`JointKind`] tag
//! through [`joint_for_config`]; there is no open-ended registry.

use nalgebra::Point3;
use tracing::{debug, warn};

use tether_types::{
    BodyId, CableLengthCommand, ConstraintId, JointKind, LinkConfig, LinkError, Result,
};

use crate::backend::{ConstraintBackend, ConstraintSpec, LinearLimit};
use crate::breakage::BreakageSpec;

/// Geometric context for constraint creation.
///
/// Anchors are in each body's local frame; `real_distance` is the current
/// world-frame anchor separation at creation time.
#[derive(Debug, Clone)]
pub struct JointContext<'a> {
    /// The body carrying the link source.
    pub source_body: BodyId,
    /// The body carrying the link target.
    pub target_body: BodyId,
    /// Source anchor in the source body's local frame.
    pub source_anchor: Point3<f64>,
    /// Target anchor in the target body's local frame.
    pub target_anchor: Point3<f64>,
    /// Current anchor-to-anchor distance in the world frame.
    pub real_distance: f64,
    /// The link configuration governing this joint.
    pub config: &'a LinkConfig,
}

/// One joint kind bound to (at most) a pair of backend constraints.
///
/// A joint is *created* while its constraints exist in the backend and
/// *dropped* otherwise; the same value can be created again after a drop,
/// which is how couple-mode switches rebuild physics without losing
/// configuration.
pub trait LinkJoint: std::fmt::Debug {
    /// The kind tag of this joint.
    fn kind(&self) -> JointKind;

    /// The configured break thresholds of this joint.
    fn breakage(&self) -> BreakageSpec;

    /// Ids of the live backend constraints (empty while dropped).
    fn constraint_ids(&self) -> &[ConstraintId];

    /// Check whether the backend constraints currently exist.
    fn is_created(&self) -> bool {
        !self.constraint_ids().is_empty()
    }

    /// Build the backend constraints for a freshly linked pair.
    ///
    /// Calling this on an already-created joint is refused.
    fn create(&mut self, backend: &mut dyn ConstraintBackend, ctx: &JointContext<'_>)
        -> Result<()>;

    /// Destroy the backend constraints.
    ///
    /// Constraints the backend already dropped (broken) are skipped, so
    /// this is safe to call while reacting to a break event.
    fn drop_joint(&mut self, backend: &mut dyn ConstraintBackend);

    /// Swap between the normal break thresholds and the temporarily
    /// indestructible set.
    ///
    /// The indestructible set is applied while the simulation is not
    /// actively stepping, so transient solver noise cannot break a joint.
    /// Both sets go through the unbreakable-sentinel substitution.
    fn set_indestructible(&mut self, backend: &mut dyn ConstraintBackend, on: bool) -> Result<()> {
        let spec = if on {
            BreakageSpec::unbreakable()
        } else {
            self.breakage()
        };
        for id in self.constraint_ids().to_vec() {
            backend.set_break_thresholds(id, spec.effective_force(), spec.effective_torque())?;
        }
        Ok(())
    }

    /// Currently deployed cable length, if this kind has one.
    fn deployed_length(&self) -> Option<f64> {
        None
    }

    /// Change the deployed cable length at runtime.
    ///
    /// Only meaningful for cable joints; other kinds refuse.
    fn set_cable_length(
        &mut self,
        _backend: &mut dyn ConstraintBackend,
        _command: CableLengthCommand,
        _real_distance: f64,
    ) -> Result<f64> {
        Err(LinkError::InvalidConfig {
            reason: format!("{} joint has no cable length", self.kind()),
        })
    }

    /// Reapply a previously captured deployed length after a rebuild.
    ///
    /// No-op for kinds without one; this is what makes couple-mode
    /// switches lossless.
    fn restore_deployed(
        &mut self,
        _backend: &mut dyn ConstraintBackend,
        _length: f64,
    ) -> Result<()> {
        Ok(())
    }
}

/// Build the joint value for a link configuration.
#[must_use]
pub fn joint_for_config(config: &LinkConfig) -> Box<dyn LinkJoint> {
    let breakage = BreakageSpec::from_config(config);
    match config.joint_kind {
        JointKind::Rigid => Box::new(RigidJoint::new(breakage)),
        JointKind::Cable => Box::new(CableJoint::new(
            breakage,
            config.max_link_length,
            config.cable_spring,
            config.cable_damper,
        )),
        JointKind::TwoEndsSphere => Box::new(TwoEndsSphereJoint::new(
            breakage,
            config.source_angle_limit_deg,
            config.target_angle_limit_deg,
        )),
        JointKind::TowBar => Box::new(TowBarJoint::new(breakage, config.source_angle_limit_deg)),
    }
}

fn cone(limit_deg: f64) -> Option<f64> {
    if limit_deg > 0.0 {
        Some(limit_deg)
    } else {
        None
    }
}

fn destroy_surviving(backend: &mut dyn ConstraintBackend, ids: &mut Vec<ConstraintId>) {
    for id in ids.drain(..) {
        if backend.exists(id) {
            // The id was handed out by this backend, so destroy only fails
            // on a stale id, which `exists` just excluded.
            if let Err(err) = backend.destroy(id) {
                warn!(%id, %err, "constraint vanished during teardown");
            }
        }
    }
}

// ============================================================================
// Rigid
// ============================================================================

/// Zero-length, all-axes-locked constraint.
///
/// While the link is coupled (hierarchy-merged) the host's native joint
/// already serves this purpose and the controller simply never creates
/// this constraint.
#[derive(Debug)]
pub struct RigidJoint {
    breakage: BreakageSpec,
    constraints: Vec<ConstraintId>,
}

impl RigidJoint {
    /// Create an unbuilt rigid joint.
    #[must_use]
    pub fn new(breakage: BreakageSpec) -> Self {
        Self {
            breakage,
            constraints: Vec::new(),
        }
    }
}

impl LinkJoint for RigidJoint {
    fn kind(&self) -> JointKind {
        JointKind::Rigid
    }

    fn breakage(&self) -> BreakageSpec {
        self.breakage
    }

    fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }

    fn create(
        &mut self,
        backend: &mut dyn ConstraintBackend,
        ctx: &JointContext<'_>,
    ) -> Result<()> {
        if self.is_created() {
            return Err(LinkError::InvalidConfig {
                reason: "rigid joint already created".to_owned(),
            });
        }
        let id = backend.create(ConstraintSpec::rigid(
            ctx.source_body,
            ctx.target_body,
            ctx.source_anchor,
            ctx.target_anchor,
            self.breakage.effective_force(),
            self.breakage.effective_torque(),
        ))?;
        debug!(%id, "rigid constraint created");
        self.constraints.push(id);
        Ok(())
    }

    fn drop_joint(&mut self, backend: &mut dyn ConstraintBackend) {
        destroy_surviving(backend, &mut self.constraints);
    }
}

// ============================================================================
// Cable
// ============================================================================

/// Distance-only constraint with a winchable deployed length.
///
/// The constraint is a spring toward a maximum separation; the bodies move
/// freely inside it. `deployed` tracks the current maximum and survives
/// drops, so a couple-mode switch reapplies it unchanged.
#[derive(Debug)]
pub struct CableJoint {
    breakage: BreakageSpec,
    /// Configured maximum cable length (0 = unbounded).
    max_length: f64,
    spring: f64,
    damper: f64,
    deployed: Option<f64>,
    constraints: Vec<ConstraintId>,
}

impl CableJoint {
    /// Create an unbuilt cable joint.
    #[must_use]
    pub fn new(breakage: BreakageSpec, max_length: f64, spring: f64, damper: f64) -> Self {
        Self {
            breakage,
            max_length: max_length.max(0.0),
            spring,
            damper,
            deployed: None,
            constraints: Vec::new(),
        }
    }

    /// Clamp a requested deployed length into the configured range.
    fn clamp_deployed(&self, length: f64) -> f64 {
        let length = length.max(0.0);
        if self.max_length > 0.0 {
            length.min(self.max_length)
        } else {
            length
        }
    }

    fn push_limit(&self, backend: &mut dyn ConstraintBackend, deployed: f64) -> Result<()> {
        if let Some(&id) = self.constraints.first() {
            backend.set_linear_limit(id, LinearLimit::new(deployed, self.spring, self.damper))?;
        }
        Ok(())
    }
}

impl LinkJoint for CableJoint {
    fn kind(&self) -> JointKind {
        JointKind::Cable
    }

    fn breakage(&self) -> BreakageSpec {
        self.breakage
    }

    fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }

    fn create(
        &mut self,
        backend: &mut dyn ConstraintBackend,
        ctx: &JointContext<'_>,
    ) -> Result<()> {
        if self.is_created() {
            return Err(LinkError::InvalidConfig {
                reason: "cable joint already created".to_owned(),
            });
        }
        // A fresh link deploys to the current real distance; a rebuilt one
        // keeps whatever was deployed before the drop.
        let deployed = self
            .deployed
            .unwrap_or_else(|| self.clamp_deployed(ctx.real_distance));
        let id = backend.create(ConstraintSpec::distance(
            ctx.source_body,
            ctx.target_body,
            ctx.source_anchor,
            ctx.target_anchor,
            LinearLimit::new(deployed, self.spring, self.damper),
            self.breakage.effective_force(),
        ))?;
        debug!(%id, deployed, "cable constraint created");
        self.constraints.push(id);
        self.deployed = Some(deployed);
        Ok(())
    }

    fn drop_joint(&mut self, backend: &mut dyn ConstraintBackend) {
        destroy_surviving(backend, &mut self.constraints);
    }

    fn deployed_length(&self) -> Option<f64> {
        self.deployed
    }

    fn set_cable_length(
        &mut self,
        backend: &mut dyn ConstraintBackend,
        command: CableLengthCommand,
        real_distance: f64,
    ) -> Result<f64> {
        let deployed = match command {
            CableLengthCommand::Deployed(length) => self.clamp_deployed(length),
            CableLengthCommand::ConfiguredMax => {
                if self.max_length > 0.0 {
                    self.max_length
                } else {
                    // Unbounded cable: "maximum" degenerates to where the
                    // ends currently are.
                    real_distance.max(0.0)
                }
            }
            CableLengthCommand::RealDistance => {
                let current = self.deployed.unwrap_or(f64::INFINITY);
                real_distance.max(0.0).min(current)
            }
        };
        self.push_limit(backend, deployed)?;
        self.deployed = Some(deployed);
        Ok(deployed)
    }

    fn restore_deployed(
        &mut self,
        backend: &mut dyn ConstraintBackend,
        length: f64,
    ) -> Result<()> {
        let deployed = self.clamp_deployed(length);
        self.push_limit(backend, deployed)?;
        self.deployed = Some(deployed);
        Ok(())
    }
}

// ============================================================================
// Two-ends-spherical-with-strut
// ============================================================================

/// Free-rotation pivots at both ends of a strut.
///
/// Each pivot's rotation is bounded by its configured cone limit; the strut
/// between them carries the load. Used where both ends need angular
/// freedom, e.g. flexible pipes.
#[derive(Debug)]
pub struct TwoEndsSphereJoint {
    breakage: BreakageSpec,
    source_cone_deg: f64,
    target_cone_deg: f64,
    constraints: Vec<ConstraintId>,
}

impl TwoEndsSphereJoint {
    /// Create an unbuilt two-ends-spherical joint.
    #[must_use]
    pub fn new(breakage: BreakageSpec, source_cone_deg: f64, target_cone_deg: f64) -> Self {
        Self {
            breakage,
            source_cone_deg: source_cone_deg.max(0.0),
            target_cone_deg: target_cone_deg.max(0.0),
            constraints: Vec::new(),
        }
    }
}

impl LinkJoint for TwoEndsSphereJoint {
    fn kind(&self) -> JointKind {
        JointKind::TwoEndsSphere
    }

    fn breakage(&self) -> BreakageSpec {
        self.breakage
    }

    fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }

    fn create(
        &mut self,
        backend: &mut dyn ConstraintBackend,
        ctx: &JointContext<'_>,
    ) -> Result<()> {
        if self.is_created() {
            return Err(LinkError::InvalidConfig {
                reason: "two-ends-sphere joint already created".to_owned(),
            });
        }
        let force = self.breakage.effective_force();
        let torque = self.breakage.effective_torque();
        let source_pivot = backend.create(ConstraintSpec::spherical(
            ctx.source_body,
            ctx.target_body,
            ctx.source_anchor,
            ctx.target_anchor,
            cone(self.source_cone_deg),
            force,
            torque,
        ))?;
        let target_pivot = match backend.create(ConstraintSpec::spherical(
            ctx.target_body,
            ctx.source_body,
            ctx.target_anchor,
            ctx.source_anchor,
            cone(self.target_cone_deg),
            force,
            torque,
        )) {
            Ok(id) => id,
            Err(err) => {
                // All-or-nothing: never leave half a joint behind.
                if backend.exists(source_pivot) {
                    let _ = backend.destroy(source_pivot);
                }
                return Err(err);
            }
        };
        debug!(%source_pivot, %target_pivot, "two-ends-sphere constraints created");
        self.constraints.push(source_pivot);
        self.constraints.push(target_pivot);
        Ok(())
    }

    fn drop_joint(&mut self, backend: &mut dyn ConstraintBackend) {
        destroy_surviving(backend, &mut self.constraints);
    }
}

// ============================================================================
// Tow bar
// ============================================================================

/// Spherical hitch at the source end of a rigid bar.
///
/// The towed body may pivot at the hitch (bounded by the source cone
/// limit); the bar itself is rigidly fixed to the target.
#[derive(Debug)]
pub struct TowBarJoint {
    breakage: BreakageSpec,
    hitch_cone_deg: f64,
    constraints: Vec<ConstraintId>,
}

impl TowBarJoint {
    /// Create an unbuilt tow-bar joint.
    #[must_use]
    pub fn new(breakage: BreakageSpec, hitch_cone_deg: f64) -> Self {
        Self {
            breakage,
            hitch_cone_deg: hitch_cone_deg.max(0.0),
            constraints: Vec::new(),
        }
    }
}

impl LinkJoint for TowBarJoint {
    fn kind(&self) -> JointKind {
        JointKind::TowBar
    }

    fn breakage(&self) -> BreakageSpec {
        self.breakage
    }

    fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }

    fn create(
        &mut self,
        backend: &mut dyn ConstraintBackend,
        ctx: &JointContext<'_>,
    ) -> Result<()> {
        if self.is_created() {
            return Err(LinkError::InvalidConfig {
                reason: "tow-bar joint already created".to_owned(),
            });
        }
        let force = self.breakage.effective_force();
        let torque = self.breakage.effective_torque();
        let hitch = backend.create(ConstraintSpec::spherical(
            ctx.source_body,
            ctx.target_body,
            ctx.source_anchor,
            ctx.target_anchor,
            cone(self.hitch_cone_deg),
            force,
            torque,
        ))?;
        let bar = match backend.create(ConstraintSpec::rigid(
            ctx.target_body,
            ctx.source_body,
            ctx.target_anchor,
            ctx.source_anchor,
            force,
            torque,
        )) {
            Ok(id) => id,
            Err(err) => {
                if backend.exists(hitch) {
                    let _ = backend.destroy(hitch);
                }
                return Err(err);
            }
        };
        debug!(%hitch, %bar, "tow-bar constraints created");
        self.constraints.push(hitch);
        self.constraints.push(bar);
        Ok(())
    }

    fn drop_joint(&mut self, backend: &mut dyn ConstraintBackend) {
        destroy_surviving(backend, &mut self.constraints);
    }
}
