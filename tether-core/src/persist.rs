//! Persistence snapshots keyed by stable identifiers.
//!
//! Snapshots carry ids, configuration, and joint state, never in-memory
//! references, so a manager can be rebuilt in a fresh process against a
//! reloaded world. Restore re-validates everything it reads: a peer that
//! claims `Linked` without a symmetric partner is corrected to `Available`
//! with a loud warning, session states are not persisted-through, and
//! already-coupled bodies are refreshed rather than re-coupled.

use tracing::warn;

use tether_joint::{joint_for_config, ConstraintBackend};
use tether_types::{
    AttachNodeId, BodyId, LinkConfig, LinkId, LinkRole, LinkState, PeerId, Result,
};

use crate::link::{build_joint_context, ActiveLink, LinkManager};
use crate::peer::LinkPeer;
use crate::world::BodyWorld;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Persisted state of one peer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerSnapshot {
    /// Peer id.
    pub peer: PeerId,
    /// Body the peer lives on.
    pub body: BodyId,
    /// Attach node the peer anchors to.
    pub node: AttachNodeId,
    /// Endpoint role.
    pub role: LinkRole,
    /// Link configuration.
    pub config: LinkConfig,
    /// State at snapshot time.
    pub state: LinkState,
    /// Cross-reference to the linked peer, if linked.
    pub other_peer: Option<PeerId>,
}

/// Persisted state of one established link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkSnapshot {
    /// Link id.
    pub link: LinkId,
    /// Source endpoint.
    pub source: PeerId,
    /// Target endpoint.
    pub target: PeerId,
    /// Whether the bodies were hierarchy-merged.
    pub coupled: bool,
    /// Deployed cable length, for cable joints.
    pub deployed_length: Option<f64>,
    /// Sibling targets parked in `Locked` by this link.
    pub locked_siblings: Vec<PeerId>,
}

/// Persisted state of a whole manager.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ManagerSnapshot {
    /// All registered peers.
    pub peers: Vec<PeerSnapshot>,
    /// All established links.
    pub links: Vec<LinkSnapshot>,
}

impl LinkManager {
    /// Capture every peer and link into a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ManagerSnapshot {
        let mut peers: Vec<PeerSnapshot> = self
            .peers
            .values()
            .map(|peer| PeerSnapshot {
                peer: peer.id(),
                body: peer.body(),
                node: peer.node().clone(),
                role: peer.role(),
                config: peer.config().clone(),
                state: peer.state(),
                other_peer: peer.other_peer(),
            })
            .collect();
        peers.sort_by_key(|snapshot| snapshot.peer);

        let mut links: Vec<LinkSnapshot> = self
            .links
            .values()
            .map(|link| LinkSnapshot {
                link: link.id,
                source: link.source,
                target: link.target,
                coupled: link.coupled,
                deployed_length: link.joint.deployed_length(),
                locked_siblings: link.locked_siblings.clone(),
            })
            .collect();
        links.sort_by_key(|snapshot| snapshot.link);

        ManagerSnapshot { peers, links }
    }

    /// Rebuild a manager from a snapshot against a reloaded world.
    ///
    /// Inconsistent entries are auto-corrected with a warning rather than
    /// restored: peers on missing bodies/nodes are dropped, session states
    /// revert to `Available`, and a `Linked` claim without a symmetric
    /// partner link is reset. Attached links rebuild their constraints;
    /// coupled links refresh the (already merged) hierarchy.
    pub fn restore(
        snapshot: &ManagerSnapshot,
        world: &mut dyn BodyWorld,
        backend: &mut dyn ConstraintBackend,
    ) -> Result<Self> {
        let mut manager = Self::new();

        for entry in &snapshot.peers {
            let attach = match world.attach_node(entry.body, &entry.node) {
                Ok(attach) => attach,
                Err(err) => {
                    warn!(peer = %entry.peer, %err, "dropping peer with missing body/node");
                    continue;
                }
            };
            let mut peer = LinkPeer::new(
                entry.peer,
                entry.body,
                entry.role,
                entry.node.clone(),
                entry.config.clone(),
                attach.allows_coupling,
            );
            let state = if entry.state.in_session() {
                warn!(peer = %entry.peer, state = %entry.state, "session state not restored");
                LinkState::Available
            } else {
                entry.state
            };
            let other = if state == LinkState::Linked {
                entry.other_peer
            } else {
                None
            };
            peer.restore(state, other);
            manager.next_peer_id = manager.next_peer_id.max(entry.peer.raw() + 1);
            manager.peers.insert(entry.peer, peer);
        }

        for entry in &snapshot.links {
            if let Err(err) = restore_link(&mut manager, entry, world, backend) {
                warn!(link = %entry.link, %err, "dropping unrestorable link");
                reset_peer(&mut manager, entry.source);
                reset_peer(&mut manager, entry.target);
            }
        }

        // Any linked/locked leftovers whose link did not survive.
        let restored: Vec<PeerId> = manager
            .links
            .values()
            .flat_map(|link| {
                let mut ids = vec![link.source, link.target];
                ids.extend(link.locked_siblings.iter().copied());
                ids
            })
            .collect();
        let stale: Vec<PeerId> = manager
            .peers
            .values()
            .filter(|peer| {
                matches!(peer.state(), LinkState::Linked | LinkState::Locked)
                    && !restored.contains(&peer.id())
            })
            .map(LinkPeer::id)
            .collect();
        for id in stale {
            warn!(peer = %id, "linked peer without a link, resetting to available");
            reset_peer(&mut manager, id);
        }

        Ok(manager)
    }
}

/// Reset a peer to `Available` with no cross-reference.
fn reset_peer(manager: &mut LinkManager, id: PeerId) {
    if let Some(peer) = manager.peers.get_mut(&id) {
        peer.restore(LinkState::Available, None);
    }
}

fn restore_link(
    manager: &mut LinkManager,
    entry: &LinkSnapshot,
    world: &mut dyn BodyWorld,
    backend: &mut dyn ConstraintBackend,
) -> Result<()> {
    use tether_types::LinkError;

    let source = manager
        .peers
        .get(&entry.source)
        .ok_or(LinkError::PeerNotFound(entry.source))?;
    let target = manager
        .peers
        .get(&entry.target)
        .ok_or(LinkError::PeerNotFound(entry.target))?;

    // The symmetric-link invariant must hold in the snapshot itself.
    let symmetric = source.state() == LinkState::Linked
        && target.state() == LinkState::Linked
        && source.other_peer() == Some(entry.target)
        && target.other_peer() == Some(entry.source);
    if !symmetric {
        return Err(LinkError::NotLinked(entry.source));
    }

    let config = source.config().clone();
    let source_body = source.body();
    let target_body = target.body();
    let source_node = source.node().clone();
    let target_node = target.node().clone();

    let mut joint = joint_for_config(&config);
    if entry.coupled {
        // Loaded saves usually come back already merged; couple only if not.
        if !world.are_coupled(source_body, target_body) {
            world.couple(source_body, &source_node, target_body, &target_node)?;
        }
    } else {
        let ctx = build_joint_context(
            world,
            source_body,
            &source_node,
            target_body,
            &target_node,
            &config,
        )?;
        joint.create(backend, &ctx)?;
    }
    if let Some(length) = entry.deployed_length {
        joint.restore_deployed(backend, length)?;
    }

    // Keep only siblings that really are parked in Locked.
    let locked_siblings: Vec<PeerId> = entry
        .locked_siblings
        .iter()
        .copied()
        .filter(|id| {
            manager
                .peers
                .get(id)
                .is_some_and(|peer| peer.state() == LinkState::Locked)
        })
        .collect();

    manager.next_link_id = manager.next_link_id.max(entry.link.raw() + 1);
    manager.links.insert(
        entry.link,
        ActiveLink {
            id: entry.link,
            source: entry.source,
            target: entry.target,
            source_body,
            target_body,
            source_node,
            target_node,
            coupled: entry.coupled,
            joint,
            locked_siblings,
        },
    );
    Ok(())
}
