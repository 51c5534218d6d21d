//! The host-world contract: bodies, attach nodes, hierarchy coupling.
//!
//! The link core never owns rigid bodies. Everything physical is reached
//! through [`BodyWorld`], the in-process surface the host engine fulfills:
//! pose lookup, named attach nodes, parent/child hierarchy merges, and the
//! collision probe used for obstruction checks.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion};
use tether_types::{AttachNodeId, BodyId, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named geometric attachment point on a body.
///
/// Position and orientation are in the body's local frame; the node's
/// local +Y is its forward direction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttachNode {
    /// Name of the node, stable across serialization.
    pub id: AttachNodeId,
    /// Node position in the body's local frame.
    pub local_position: Point3<f64>,
    /// Node orientation in the body's local frame.
    pub local_orientation: UnitQuaternion<f64>,
    /// Whether this node can anchor a hierarchy merge (coupling).
    pub allows_coupling: bool,
}

impl AttachNode {
    /// Create a coupling-capable node at a local position, facing the
    /// body's own forward.
    #[must_use]
    pub fn new(id: impl Into<AttachNodeId>, local_position: Point3<f64>) -> Self {
        Self {
            id: id.into(),
            local_position,
            local_orientation: UnitQuaternion::identity(),
            allows_coupling: true,
        }
    }

    /// Set the node orientation.
    #[must_use]
    pub fn with_orientation(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.local_orientation = orientation;
        self
    }

    /// Set whether the node supports coupling.
    #[must_use]
    pub fn with_coupling(mut self, allows: bool) -> Self {
        self.allows_coupling = allows;
        self
    }

    /// The node's pose in the body's local frame.
    #[must_use]
    pub fn local_pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.local_position.coords),
            self.local_orientation,
        )
    }
}

/// The body/vessel surface the host engine provides.
///
/// All mutation of the physical world flows through this trait; the link
/// core only decides *what* to do and leaves the doing to the host.
pub trait BodyWorld {
    /// World pose of a body.
    fn body_pose(&self, body: BodyId) -> Result<Isometry3<f64>>;

    /// Look up a named attach node on a body.
    fn attach_node(&self, body: BodyId, node: &AttachNodeId) -> Result<AttachNode>;

    /// Whether an external (non-link) attachment occupies a node.
    fn is_node_occupied(&self, body: BodyId, node: &AttachNodeId) -> bool;

    /// Merge `target` into `source`'s hierarchy at the given nodes.
    ///
    /// After a successful couple the two bodies move as one; the host's
    /// native joint takes over and no backend constraint is needed.
    fn couple(
        &mut self,
        source: BodyId,
        source_node: &AttachNodeId,
        target: BodyId,
        target_node: &AttachNodeId,
    ) -> Result<()>;

    /// Detach a body from its hierarchy parent.
    ///
    /// Decoupling a body that has no parent is a no-op.
    fn decouple(&mut self, body: BodyId) -> Result<()>;

    /// Whether two bodies currently share a parent/child hierarchy edge.
    fn are_coupled(&self, a: BodyId, b: BodyId) -> bool;

    /// Probe the straight path between two world points for third-party
    /// colliders, ignoring the given bodies.
    ///
    /// Returns the name of the first blocking collider, if any. This is
    /// the renderer-side collision probe; the core treats it as opaque.
    fn sweep_obstructed(
        &self,
        from: &Point3<f64>,
        to: &Point3<f64>,
        ignore: &[BodyId],
    ) -> Option<String>;
}

/// World pose of an attach node on a body.
pub fn node_world_pose(
    world: &dyn BodyWorld,
    body: BodyId,
    node: &AttachNodeId,
) -> Result<Isometry3<f64>> {
    let pose = world.body_pose(body)?;
    let node = world.attach_node(body, node)?;
    Ok(pose * node.local_pose())
}

/// World position of an attach node's anchor point.
pub fn node_world_anchor(
    world: &dyn BodyWorld,
    body: BodyId,
    node: &AttachNodeId,
) -> Result<Point3<f64>> {
    Ok(Point3::from(
        node_world_pose(world, body, node)?.translation.vector,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;
    use approx::assert_relative_eq;

    #[test]
    fn test_node_world_pose_composes_body_and_node() {
        let mut world = TestWorld::new();
        let body = world.add_body(Isometry3::translation(10.0, 0.0, 0.0));
        world.add_node(body, AttachNode::new("top", Point3::new(0.0, 2.0, 0.0)));

        let anchor = node_world_anchor(&world, body, &AttachNodeId::new("top")).unwrap();
        assert_relative_eq!(anchor.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(anchor.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_node_is_an_error() {
        let mut world = TestWorld::new();
        let body = world.add_body(Isometry3::identity());
        assert!(node_world_pose(&world, body, &AttachNodeId::new("nope")).is_err());
    }
}
