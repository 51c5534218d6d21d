//! In-memory constraint backend for tests.
//!
//! [`MockBackend`] records every constraint spec and threshold update so
//! tests can assert on exactly what a joint kind asked the physics engine
//! to do, and can inject break events the way a real engine would.

use std::collections::HashMap;

use tether_types::{BodyId, ConstraintId, LinkError, Result};

use crate::backend::{ConstraintBackend, ConstraintBreakEvent, ConstraintSpec, LinearLimit};

/// Recording, non-solving constraint backend.
#[derive(Debug, Default)]
pub struct MockBackend {
    constraints: HashMap<ConstraintId, ConstraintSpec>,
    next_id: u64,
    pending_breaks: Vec<ConstraintBreakEvent>,
    created_total: u64,
}

impl MockBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The spec of a live constraint, with all updates applied.
    #[must_use]
    pub fn spec(&self, id: ConstraintId) -> Option<&ConstraintSpec> {
        self.constraints.get(&id)
    }

    /// Number of live constraints.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.constraints.len()
    }

    /// Total constraints ever created (live + destroyed).
    #[must_use]
    pub fn created_total(&self) -> u64 {
        self.created_total
    }

    /// Ids of the live constraints, in creation order.
    #[must_use]
    pub fn spec_ids(&self) -> Vec<ConstraintId> {
        let mut ids: Vec<ConstraintId> = self.constraints.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Simulate the engine breaking a constraint: the object disappears and
    /// break events fire for both involved bodies.
    pub fn break_constraint(&mut self, id: ConstraintId) {
        if let Some(spec) = self.constraints.remove(&id) {
            self.pending_breaks
                .push(ConstraintBreakEvent { body: spec.owner });
            self.pending_breaks
                .push(ConstraintBreakEvent { body: spec.partner });
        }
    }

    /// Inject a break event for a body without touching any constraint, the
    /// way an unrelated joint elsewhere on the body would.
    pub fn inject_break_event(&mut self, body: BodyId) {
        self.pending_breaks.push(ConstraintBreakEvent { body });
    }
}

impl ConstraintBackend for MockBackend {
    fn create(&mut self, spec: ConstraintSpec) -> Result<ConstraintId> {
        let id = ConstraintId::new(self.next_id);
        self.next_id += 1;
        self.created_total += 1;
        self.constraints.insert(id, spec);
        Ok(id)
    }

    fn destroy(&mut self, id: ConstraintId) -> Result<()> {
        self.constraints
            .remove(&id)
            .map(|_| ())
            .ok_or(LinkError::ConstraintNotFound(id))
    }

    fn exists(&self, id: ConstraintId) -> bool {
        self.constraints.contains_key(&id)
    }

    fn set_break_thresholds(&mut self, id: ConstraintId, force: f64, torque: f64) -> Result<()> {
        let spec = self
            .constraints
            .get_mut(&id)
            .ok_or(LinkError::ConstraintNotFound(id))?;
        spec.break_force = force;
        spec.break_torque = torque;
        Ok(())
    }

    fn set_linear_limit(&mut self, id: ConstraintId, limit: LinearLimit) -> Result<()> {
        let spec = self
            .constraints
            .get_mut(&id)
            .ok_or(LinkError::ConstraintNotFound(id))?;
        spec.linear_limit = Some(limit);
        Ok(())
    }

    fn drain_break_events(&mut self) -> Vec<ConstraintBreakEvent> {
        std::mem::take(&mut self.pending_breaks)
    }
}
