//! In-memory world for tests.
//!
//! [`TestWorld`] implements [`BodyWorld`] over plain maps: bodies with
//! poses and attach nodes, a single-parent hierarchy for coupling, and
//! sphere obstacles for the obstruction probe. It performs no physics;
//! poses only change when a test sets them.

use std::collections::{HashMap, HashSet};

use nalgebra::{Isometry3, Point3};

use tether_types::{AttachNodeId, BodyId, LinkError, Result};

use crate::world::{AttachNode, BodyWorld};

#[derive(Debug)]
struct TestBody {
    pose: Isometry3<f64>,
    nodes: HashMap<AttachNodeId, AttachNode>,
    occupied: HashSet<AttachNodeId>,
    parent: Option<BodyId>,
}

#[derive(Debug)]
struct Obstacle {
    name: String,
    center: Point3<f64>,
    radius: f64,
    body: Option<BodyId>,
}

/// Scriptable in-memory [`BodyWorld`].
#[derive(Debug, Default)]
pub struct TestWorld {
    bodies: HashMap<BodyId, TestBody>,
    obstacles: Vec<Obstacle>,
    next_id: u64,
}

impl TestWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body at a pose.
    pub fn add_body(&mut self, pose: Isometry3<f64>) -> BodyId {
        let id = BodyId::new(self.next_id);
        self.next_id += 1;
        self.bodies.insert(
            id,
            TestBody {
                pose,
                nodes: HashMap::new(),
                occupied: HashSet::new(),
                parent: None,
            },
        );
        id
    }

    /// Add an attach node to a body.
    ///
    /// # Panics
    ///
    /// Panics if the body does not exist; tests build worlds up front.
    pub fn add_node(&mut self, body: BodyId, node: AttachNode) {
        let entry = self
            .bodies
            .get_mut(&body)
            .unwrap_or_else(|| panic!("no body {body}"));
        entry.nodes.insert(node.id.clone(), node);
    }

    /// Move a body.
    pub fn set_body_pose(&mut self, body: BodyId, pose: Isometry3<f64>) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.pose = pose;
        }
    }

    /// Mark a node as occupied by an external attachment.
    pub fn occupy_node(&mut self, body: BodyId, node: &AttachNodeId) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.occupied.insert(node.clone());
        }
    }

    /// Clear an external attachment from a node.
    pub fn release_node(&mut self, body: BodyId, node: &AttachNodeId) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.occupied.remove(node);
        }
    }

    /// Place a sphere obstacle for the obstruction probe.
    pub fn add_obstacle(
        &mut self,
        name: impl Into<String>,
        center: Point3<f64>,
        radius: f64,
        body: Option<BodyId>,
    ) {
        self.obstacles.push(Obstacle {
            name: name.into(),
            center,
            radius,
            body,
        });
    }

    /// Remove every obstacle.
    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
    }

    /// The hierarchy parent of a body, if coupled.
    #[must_use]
    pub fn parent_of(&self, body: BodyId) -> Option<BodyId> {
        self.bodies.get(&body).and_then(|entry| entry.parent)
    }

    fn body(&self, id: BodyId) -> Result<&TestBody> {
        self.bodies.get(&id).ok_or(LinkError::BodyNotFound(id))
    }
}

/// Shortest distance from a point to a segment.
fn segment_distance(from: &Point3<f64>, to: &Point3<f64>, point: &Point3<f64>) -> f64 {
    let dir = to - from;
    let len_sq = dir.norm_squared();
    if len_sq <= f64::EPSILON {
        return (point - from).norm();
    }
    let t = ((point - from).dot(&dir) / len_sq).clamp(0.0, 1.0);
    let closest = from + dir * t;
    (point - closest).norm()
}

impl BodyWorld for TestWorld {
    fn body_pose(&self, body: BodyId) -> Result<Isometry3<f64>> {
        Ok(self.body(body)?.pose)
    }

    fn attach_node(&self, body: BodyId, node: &AttachNodeId) -> Result<AttachNode> {
        self.body(body)?
            .nodes
            .get(node)
            .cloned()
            .ok_or_else(|| LinkError::AttachNodeNotFound {
                body,
                node: node.to_string(),
            })
    }

    fn is_node_occupied(&self, body: BodyId, node: &AttachNodeId) -> bool {
        self.bodies
            .get(&body)
            .is_some_and(|entry| entry.occupied.contains(node))
    }

    fn couple(
        &mut self,
        source: BodyId,
        source_node: &AttachNodeId,
        target: BodyId,
        target_node: &AttachNodeId,
    ) -> Result<()> {
        // Validate both ends the way the host would.
        let source_attach = self.attach_node(source, source_node)?;
        let target_attach = self.attach_node(target, target_node)?;
        if !source_attach.allows_coupling || !target_attach.allows_coupling {
            return Err(LinkError::InvalidConfig {
                reason: format!("node {source_node} or {target_node} cannot couple"),
            });
        }
        let entry = self
            .bodies
            .get_mut(&target)
            .ok_or(LinkError::BodyNotFound(target))?;
        entry.parent = Some(source);
        Ok(())
    }

    fn decouple(&mut self, body: BodyId) -> Result<()> {
        let entry = self
            .bodies
            .get_mut(&body)
            .ok_or(LinkError::BodyNotFound(body))?;
        entry.parent = None;
        Ok(())
    }

    fn are_coupled(&self, a: BodyId, b: BodyId) -> bool {
        let parent_of = |id: BodyId| self.bodies.get(&id).and_then(|entry| entry.parent);
        parent_of(a) == Some(b) || parent_of(b) == Some(a)
    }

    fn sweep_obstructed(
        &self,
        from: &Point3<f64>,
        to: &Point3<f64>,
        ignore: &[BodyId],
    ) -> Option<String> {
        self.obstacles
            .iter()
            .find(|obstacle| {
                if let Some(body) = obstacle.body {
                    if ignore.contains(&body) {
                        return false;
                    }
                }
                segment_distance(from, to, &obstacle.center) < obstacle.radius
            })
            .map(|obstacle| obstacle.name.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_couple_and_decouple() {
        let mut world = TestWorld::new();
        let a = world.add_body(Isometry3::identity());
        let b = world.add_body(Isometry3::identity());
        world.add_node(a, AttachNode::new("n", Point3::origin()));
        world.add_node(b, AttachNode::new("n", Point3::origin()));

        assert!(!world.are_coupled(a, b));
        world
            .couple(a, &AttachNodeId::new("n"), b, &AttachNodeId::new("n"))
            .unwrap();
        assert!(world.are_coupled(a, b));
        assert_eq!(world.parent_of(b), Some(a));

        world.decouple(b).unwrap();
        assert!(!world.are_coupled(a, b));
    }

    #[test]
    fn test_couple_refuses_non_coupling_node() {
        let mut world = TestWorld::new();
        let a = world.add_body(Isometry3::identity());
        let b = world.add_body(Isometry3::identity());
        world.add_node(a, AttachNode::new("n", Point3::origin()));
        world.add_node(b, AttachNode::new("n", Point3::origin()).with_coupling(false));

        assert!(world
            .couple(a, &AttachNodeId::new("n"), b, &AttachNodeId::new("n"))
            .is_err());
        assert!(!world.are_coupled(a, b));
    }

    #[test]
    fn test_segment_distance() {
        let from = Point3::new(0.0, 0.0, 0.0);
        let to = Point3::new(10.0, 0.0, 0.0);
        assert_relative_eq!(
            segment_distance(&from, &to, &Point3::new(5.0, 3.0, 0.0)),
            3.0,
            epsilon = 1e-12
        );
        // Beyond the segment end, distance is to the endpoint.
        assert_relative_eq!(
            segment_distance(&from, &to, &Point3::new(14.0, 3.0, 0.0)),
            5.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_obstruction_probe() {
        let mut world = TestWorld::new();
        let a = world.add_body(Isometry3::identity());
        world.add_obstacle("girder", Point3::new(5.0, 0.0, 0.0), 1.0, None);
        world.add_obstacle("own-hull", Point3::new(2.0, 0.0, 0.0), 1.0, Some(a));

        let from = Point3::new(0.0, 0.0, 0.0);
        let to = Point3::new(10.0, 0.0, 0.0);
        // Ignoring body `a` skips its collider but not the free girder.
        assert_eq!(
            world.sweep_obstructed(&from, &to, &[a]),
            Some("girder".to_owned())
        );

        world.clear_obstacles();
        assert_eq!(world.sweep_obstructed(&from, &to, &[]), None);
    }
}
