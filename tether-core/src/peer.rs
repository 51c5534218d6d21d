//! One endpoint of a potential link.
//!
//! A [`LinkPeer`] ties together the identity of an attach node on a body,
//! the link configuration, the endpoint's state machine, and, while
//! linked, the id of the peer at the other end. Source peers own the full
//! configuration; a target peer's configuration contributes its type tag
//! and coupling capability.

use tracing::warn;

use tether_types::{
    AttachNodeId, BodyId, CouplingPolicy, LinkConfig, LinkRole, LinkState, PeerId, Result,
};

use crate::machine::LinkStateMachine;

/// One link endpoint on a body.
#[derive(Debug)]
pub struct LinkPeer {
    id: PeerId,
    body: BodyId,
    node: AttachNodeId,
    config: LinkConfig,
    machine: LinkStateMachine,
    other: Option<PeerId>,
}

impl LinkPeer {
    /// Create a peer, auto-correcting contradictory coupling configuration.
    ///
    /// A peer whose policy demands coupling on a node that cannot couple
    /// would violate the coupling invariant the first time it linked, so
    /// the policy is forced to `NeverCouple` here, loudly, rather than
    /// persisting the contradiction.
    #[must_use]
    pub(crate) fn new(
        id: PeerId,
        body: BodyId,
        role: LinkRole,
        node: AttachNodeId,
        mut config: LinkConfig,
        node_allows_coupling: bool,
    ) -> Self {
        if matches!(config.coupling_policy, CouplingPolicy::AlwaysCoupled) && !node_allows_coupling
        {
            warn!(
                %id, %body, node = %node,
                "coupling requested on a node that cannot couple, forcing never-couple"
            );
            config.coupling_policy = CouplingPolicy::NeverCouple;
        }
        Self {
            id,
            body,
            node,
            config,
            machine: LinkStateMachine::new(role),
            other: None,
        }
    }

    /// This peer's id.
    #[must_use]
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// The body this peer lives on.
    #[must_use]
    pub fn body(&self) -> BodyId {
        self.body
    }

    /// The attach node this peer anchors to.
    #[must_use]
    pub fn node(&self) -> &AttachNodeId {
        &self.node
    }

    /// Source or target.
    #[must_use]
    pub fn role(&self) -> LinkRole {
        self.machine.role()
    }

    /// The link configuration.
    #[must_use]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// This peer's type tag.
    #[must_use]
    pub fn link_type(&self) -> &str {
        &self.config.link_type
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.machine.state()
    }

    /// The peer at the other end, set only while linked.
    #[must_use]
    pub fn other_peer(&self) -> Option<PeerId> {
        self.other
    }

    /// Check the symmetric-link invariant from this side.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.state().is_linked()
    }

    /// Mutable access to the state machine, for hook registration.
    pub fn machine_mut(&mut self) -> &mut LinkStateMachine {
        &mut self.machine
    }

    pub(crate) fn transition(&mut self, to: LinkState) -> Result<()> {
        self.machine.transition(to)
    }

    pub(crate) fn set_other(&mut self, other: Option<PeerId>) {
        self.other = other;
    }

    pub(crate) fn restore(&mut self, state: LinkState, other: Option<PeerId>) {
        self.machine.restore_state(state);
        self.other = other;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn peer(role: LinkRole, config: LinkConfig, can_couple: bool) -> LinkPeer {
        LinkPeer::new(
            PeerId::new(7),
            BodyId::new(1),
            role,
            AttachNodeId::new("top"),
            config,
            can_couple,
        )
    }

    #[test]
    fn test_new_peer_is_available() {
        let p = peer(LinkRole::Source, LinkConfig::new("A"), true);
        assert_eq!(p.state(), LinkState::Available);
        assert_eq!(p.other_peer(), None);
        assert!(!p.is_linked());
    }

    #[test]
    fn test_coupling_contradiction_is_corrected() {
        let config = LinkConfig::new("A").with_coupling_policy(CouplingPolicy::AlwaysCoupled);

        let capable = peer(LinkRole::Source, config.clone(), true);
        assert_eq!(capable.config().coupling_policy, CouplingPolicy::AlwaysCoupled);

        let incapable = peer(LinkRole::Source, config, false);
        assert_eq!(incapable.config().coupling_policy, CouplingPolicy::NeverCouple);
    }

    #[test]
    fn test_set_via_gui_is_left_alone_without_coupling_node() {
        // Only the hard contradiction is corrected at construction; the
        // runtime mode switch re-checks capability itself.
        let config = LinkConfig::new("A").with_coupling_policy(CouplingPolicy::SetViaGui);
        let p = peer(LinkRole::Target, config, false);
        assert_eq!(p.config().coupling_policy, CouplingPolicy::SetViaGui);
    }

    #[test]
    fn test_transitions_respect_role() {
        let mut p = peer(LinkRole::Target, LinkConfig::new("A"), true);
        assert!(p.transition(LinkState::Linking).is_err());
        p.transition(LinkState::AcceptingLinks).unwrap();
        assert_eq!(p.state(), LinkState::AcceptingLinks);
    }
}
