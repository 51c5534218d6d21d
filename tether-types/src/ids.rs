//! Stable identifiers for bodies, peers, constraints, and listeners.
//!
//! All identifiers survive serialization; none of them are in-memory
//! references. Cross-references between peers are expressed through these
//! ids so that persisted state can be restored into a fresh process.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a physical body ("part") in the host world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Unique identifier for a link endpoint (source or target) on a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerId(pub u64);

impl PeerId {
    /// Create a new peer ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}

/// Unique identifier for an established link between two peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkId(pub u64);

impl LinkId {
    /// Create a new link ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for LinkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Link({})", self.0)
    }
}

/// Unique identifier for a constraint object inside the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintId(pub u64);

impl ConstraintId {
    /// Create a new constraint ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConstraintId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constraint({})", self.0)
    }
}

/// Unique identifier for a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ListenerId(pub u64);

impl ListenerId {
    /// Create a new listener ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener({})", self.0)
    }
}

/// Name of a geometric attachment point on a body.
///
/// Attach node names are stable across serialization and are the key the
/// host uses for node lookup and occupancy tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttachNodeId(String);

impl AttachNodeId {
    /// Create a new attach node ID from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the node name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttachNodeId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for AttachNodeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for AttachNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = BodyId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(BodyId::from(42), id);
        assert_eq!(id.to_string(), "Body(42)");
    }

    #[test]
    fn test_attach_node_id() {
        let node = AttachNodeId::new("top");
        assert_eq!(node.as_str(), "top");
        assert_eq!(AttachNodeId::from("top"), node);
        assert_eq!(node.to_string(), "top");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Hash/Eq within one type only; ordering is by raw value.
        let a = PeerId::new(1);
        let b = PeerId::new(2);
        assert!(a < b);
    }
}
