//! The link establishment/break protocol and joint lifecycle control.
//!
//! [`LinkManager`] owns every peer and every active link. It validates
//! link requests in three passes (state, geometry, obstruction), applies
//! them all-or-nothing, reacts to constraint breakage with deferred
//! re-validation, and notifies listeners of every lifecycle change.
//!
//! The manager never touches physics directly: the host's [`BodyWorld`]
//! and [`ConstraintBackend`] are passed into each operation, which keeps
//! the manager serializable and the host free to swap implementations.

use std::collections::HashMap;

use tracing::{debug, warn};

use tether_joint::geometry;
use tether_joint::{joint_for_config, ConstraintBackend, JointContext, LinkJoint};
use tether_types::{
    AttachNodeId, BodyId, CableLengthCommand, CouplingPolicy, JointKind, LinkConfig, LinkError,
    LinkId, LinkRole, LinkState, ListenerId, PeerId, Result, ValidationError,
};

use crate::couple;
use crate::events::{EventBroadcaster, LinkEvent};
use crate::peer::LinkPeer;
use crate::scheduler::{FramePhase, FrameScheduler};
use crate::world::{node_world_anchor, node_world_pose, BodyWorld};

/// An established link and its joint.
#[derive(Debug)]
pub(crate) struct ActiveLink {
    pub(crate) id: LinkId,
    pub(crate) source: PeerId,
    pub(crate) target: PeerId,
    pub(crate) source_body: BodyId,
    pub(crate) target_body: BodyId,
    pub(crate) source_node: AttachNodeId,
    pub(crate) target_node: AttachNodeId,
    /// Hierarchy-merged (`true`) vs. constraint-attached (`false`).
    pub(crate) coupled: bool,
    pub(crate) joint: Box<dyn LinkJoint>,
    /// Sibling targets on the target body parked in `Locked`.
    pub(crate) locked_siblings: Vec<PeerId>,
}

/// Read-only view of an active link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkInfo {
    /// Link id.
    pub id: LinkId,
    /// Source endpoint.
    pub source: PeerId,
    /// Target endpoint.
    pub target: PeerId,
    /// Whether the bodies are hierarchy-merged.
    pub coupled: bool,
    /// Joint kind of this link.
    pub joint_kind: JointKind,
    /// Deployed cable length, for cable joints.
    pub deployed_length: Option<f64>,
}

/// Deferred continuations, re-validated when they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// A break event touched one of the link's bodies; check whether the
    /// link's own constraints actually went away.
    RecheckBreak { link: LinkId },
    /// Physics resumed; restore the normal break thresholds.
    RestoreBreakage { link: LinkId },
}

/// Fixed steps joints stay indestructible after physics resumes, letting
/// transient solver error settle before anything may break.
const BREAKAGE_GRACE_STEPS: u32 = 3;

/// Owner of all peers, links, and the link protocol.
#[derive(Debug, Default)]
pub struct LinkManager {
    pub(crate) peers: HashMap<PeerId, LinkPeer>,
    pub(crate) links: HashMap<LinkId, ActiveLink>,
    pub(crate) next_peer_id: u64,
    pub(crate) next_link_id: u64,
    /// The single linking session in progress, if any.
    session: Option<PeerId>,
    scheduler: FrameScheduler<Deferred>,
    broadcaster: EventBroadcaster,
    physics_paused: bool,
}

impl LinkManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Register a lifecycle listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&LinkEvent) + 'static) -> ListenerId {
        self.broadcaster.subscribe(listener)
    }

    /// Remove a lifecycle listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Peer management
    // ------------------------------------------------------------------

    /// Register a link endpoint on a body's attach node.
    ///
    /// The node must exist in the world. A node currently occupied by an
    /// external attachment starts the peer in `NodeIsBlocked`.
    pub fn add_peer(
        &mut self,
        world: &dyn BodyWorld,
        body: BodyId,
        node: AttachNodeId,
        role: LinkRole,
        config: LinkConfig,
    ) -> Result<PeerId> {
        let attach = world.attach_node(body, &node)?;
        let id = PeerId::new(self.next_peer_id);
        self.next_peer_id += 1;

        let mut peer = LinkPeer::new(id, body, role, node.clone(), config, attach.allows_coupling);
        if world.is_node_occupied(body, &node) {
            // Legal from Available for both roles, so this cannot fail.
            let _ = peer.transition(LinkState::NodeIsBlocked);
        }
        self.peers.insert(id, peer);
        debug!(peer = %id, %body, node = %node, %role, "peer registered");
        Ok(id)
    }

    /// Remove a peer, breaking its link first if it has one.
    pub fn remove_peer(
        &mut self,
        id: PeerId,
        world: &mut dyn BodyWorld,
        backend: &mut dyn ConstraintBackend,
    ) -> Result<()> {
        if !self.peers.contains_key(&id) {
            return Err(LinkError::PeerNotFound(id));
        }
        if let Some(link) = self.link_of_peer(id) {
            self.break_link(link, world, backend)?;
        }
        if self.session == Some(id) {
            let _ = self.stop_linking(id);
        }
        self.peers.remove(&id);
        Ok(())
    }

    /// Look up a peer.
    #[must_use]
    pub fn peer(&self, id: PeerId) -> Option<&LinkPeer> {
        self.peers.get(&id)
    }

    /// Iterate all peers.
    pub fn peers(&self) -> impl Iterator<Item = &LinkPeer> {
        self.peers.values()
    }

    fn peer_ref(&self, id: PeerId) -> Result<&LinkPeer> {
        self.peers.get(&id).ok_or(LinkError::PeerNotFound(id))
    }

    // ------------------------------------------------------------------
    // Linking session
    // ------------------------------------------------------------------

    /// Open a linking session from a source peer.
    ///
    /// The source moves to `Linking`; every available target moves to
    /// `AcceptingLinks` if its type matches (and it lives on another
    /// body), `RejectingLinks` otherwise.
    pub fn start_linking(&mut self, source: PeerId) -> Result<()> {
        if let Some(active) = self.session {
            return Err(LinkError::SessionActive(active));
        }
        let (link_type, source_body) = {
            let peer = self.peer_ref(source)?;
            (peer.link_type().to_owned(), peer.body())
        };
        self.peers
            .get_mut(&source)
            .ok_or(LinkError::PeerNotFound(source))?
            .transition(LinkState::Linking)?;
        self.session = Some(source);

        for peer in self.peers.values_mut() {
            if peer.role() != LinkRole::Target || peer.state() != LinkState::Available {
                continue;
            }
            let compatible = peer.link_type() == link_type && peer.body() != source_body;
            let to = if compatible {
                LinkState::AcceptingLinks
            } else {
                LinkState::RejectingLinks
            };
            if let Err(err) = peer.transition(to) {
                warn!(peer = %peer.id(), %err, "target did not join linking session");
            }
        }
        self.broadcaster
            .broadcast(&LinkEvent::LinkingStarted { source });
        Ok(())
    }

    /// Cancel a linking session without establishing a link.
    ///
    /// Fails with an illegal-transition error if the peer is not
    /// currently linking.
    pub fn stop_linking(&mut self, source: PeerId) -> Result<()> {
        self.peers
            .get_mut(&source)
            .ok_or(LinkError::PeerNotFound(source))?
            .transition(LinkState::Available)?;
        if self.session == Some(source) {
            self.end_session();
        }
        self.broadcaster
            .broadcast(&LinkEvent::LinkingStopped { source });
        Ok(())
    }

    /// Release every target still parked in a session state.
    fn end_session(&mut self) {
        self.session = None;
        for peer in self.peers.values_mut() {
            if matches!(
                peer.state(),
                LinkState::AcceptingLinks | LinkState::RejectingLinks
            ) {
                if let Err(err) = peer.transition(LinkState::Available) {
                    warn!(peer = %peer.id(), %err, "target stuck leaving session");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Run the three validation passes without mutating anything.
    ///
    /// Safe to call speculatively every frame while aiming a link; an
    /// empty list means the pair may link right now.
    pub fn check_can_link(
        &self,
        source: PeerId,
        target: PeerId,
        world: &dyn BodyWorld,
    ) -> Result<Vec<ValidationError>> {
        let source_peer = self.peer_ref(source)?;
        let target_peer = self.peer_ref(target)?;
        let mut errors = Vec::new();

        // Pass 1: types and states.
        if source_peer.link_type() != target_peer.link_type() {
            errors.push(ValidationError::TypeMismatch {
                source_type: source_peer.link_type().to_owned(),
                target_type: target_peer.link_type().to_owned(),
            });
        }
        if source_peer.state() != LinkState::Linking {
            errors.push(ValidationError::SourceStateMismatch {
                state: source_peer.state(),
            });
        }
        if target_peer.state() != LinkState::AcceptingLinks {
            errors.push(ValidationError::TargetStateMismatch {
                state: target_peer.state(),
            });
        }
        for peer in [source_peer, target_peer] {
            if world.is_node_occupied(peer.body(), peer.node()) {
                errors.push(ValidationError::NodeOccupied {
                    node: peer.node().to_string(),
                });
            }
        }

        // Pass 2: geometry. Limits come from the source configuration.
        let config = source_peer.config();
        let source_pose = node_world_pose(world, source_peer.body(), source_peer.node())?;
        let target_pose = node_world_pose(world, target_peer.body(), target_peer.node())?;
        let source_anchor = source_pose.translation.vector.into();
        let target_anchor = target_pose.translation.vector.into();
        let link_vec = geometry::link_vector(&source_anchor, &target_anchor);
        let distance = link_vec.norm();

        if let Some(err) = geometry::check_length_limit(
            distance,
            config.min_link_length,
            config.max_link_length,
        ) {
            errors.push(err);
        }
        if let Some(err) = geometry::check_angle_limit(
            &source_pose,
            &link_vec,
            config.source_angle_limit_deg,
            LinkRole::Source,
        ) {
            errors.push(err);
        }
        if let Some(err) = geometry::check_angle_limit(
            &target_pose,
            &(-link_vec),
            config.target_angle_limit_deg,
            LinkRole::Target,
        ) {
            errors.push(err);
        }

        // Pass 3: obstruction.
        if let Some(collider) = world.sweep_obstructed(
            &source_anchor,
            &target_anchor,
            &[source_peer.body(), target_peer.body()],
        ) {
            errors.push(ValidationError::Obstructed { collider });
        }

        Ok(errors)
    }

    // ------------------------------------------------------------------
    // Establish / break
    // ------------------------------------------------------------------

    /// Establish a link between a linking source and an accepting target.
    ///
    /// All validation must pass; on any failure both peers keep their
    /// states and nothing physical is created. On success the coupling
    /// decision runs first, then the joint is built, then listeners hear
    /// `LinkCreated`.
    pub fn establish_link(
        &mut self,
        source: PeerId,
        target: PeerId,
        world: &mut dyn BodyWorld,
        backend: &mut dyn ConstraintBackend,
    ) -> Result<LinkId> {
        let errors = self.check_can_link(source, target, world)?;
        if !errors.is_empty() {
            return Err(LinkError::Validation(errors));
        }

        let (source_body, source_node, config) = {
            let peer = self.peer_ref(source)?;
            (peer.body(), peer.node().clone(), peer.config().clone())
        };
        let (target_body, target_node) = {
            let peer = self.peer_ref(target)?;
            (peer.body(), peer.node().clone())
        };

        // Coupling decision, with the capability invariant enforced.
        let source_attach = world.attach_node(source_body, &source_node)?;
        let target_attach = world.attach_node(target_body, &target_node)?;
        let mut coupled = couple::initial_mode(config.coupling_policy);
        if coupled && !(source_attach.allows_coupling && target_attach.allows_coupling) {
            warn!(
                %source, %target,
                "coupling requested but a node cannot couple, attaching instead"
            );
            coupled = false;
        }

        // Physical phase, fallible, before any peer state moves.
        let mut joint = joint_for_config(&config);
        let mut did_couple = false;
        if coupled {
            if world.are_coupled(source_body, target_body) {
                debug!(%source, %target, "bodies already coupled, refreshing");
            } else {
                world.couple(source_body, &source_node, target_body, &target_node)?;
                did_couple = true;
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

        // State phase. Validation guaranteed these transitions; treat a
        // refusal as a bug and roll the physical phase back.
        if let Err(err) = self.apply_linked_states(source, target) {
            joint.drop_joint(backend);
            if did_couple {
                if let Err(undo) = world.decouple(target_body) {
                    warn!(%undo, "failed to undo couple after state rollback");
                }
            }
            return Err(err);
        }

        let locked_siblings = self.lock_siblings(target, target_body);
        self.end_session();

        let id = LinkId::new(self.next_link_id);
        self.next_link_id += 1;
        self.links.insert(
            id,
            ActiveLink {
                id,
                source,
                target,
                source_body,
                target_body,
                source_node,
                target_node,
                coupled,
                joint,
                locked_siblings,
            },
        );
        self.broadcaster.broadcast(&LinkEvent::LinkCreated {
            link: id,
            source,
            target,
        });
        Ok(id)
    }

    /// Move both peers to `Linked` and cross-reference them.
    fn apply_linked_states(&mut self, source: PeerId, target: PeerId) -> Result<()> {
        self.peers
            .get_mut(&source)
            .ok_or(LinkError::PeerNotFound(source))?
            .transition(LinkState::Linked)?;
        if let Err(err) = self
            .peers
            .get_mut(&target)
            .ok_or(LinkError::PeerNotFound(target))?
            .transition(LinkState::Linked)
        {
            // Put the source back; validation says this can't happen.
            if let Some(peer) = self.peers.get_mut(&source) {
                let _ = peer.transition(LinkState::Available);
            }
            return Err(err);
        }
        if let Some(peer) = self.peers.get_mut(&source) {
            peer.set_other(Some(target));
        }
        if let Some(peer) = self.peers.get_mut(&target) {
            peer.set_other(Some(source));
        }
        Ok(())
    }

    /// Park accepting siblings on the linked target's body in `Locked`.
    fn lock_siblings(&mut self, target: PeerId, target_body: BodyId) -> Vec<PeerId> {
        let mut locked = Vec::new();
        for peer in self.peers.values_mut() {
            if peer.id() != target
                && peer.body() == target_body
                && peer.state() == LinkState::AcceptingLinks
            {
                match peer.transition(LinkState::Locked) {
                    Ok(()) => locked.push(peer.id()),
                    Err(err) => warn!(peer = %peer.id(), %err, "sibling failed to lock"),
                }
            }
        }
        locked
    }

    /// Break an established link.
    ///
    /// Destroys the joint, decouples if coupled, resets both peers to
    /// `Available`, releases locked siblings, then broadcasts.
    pub fn break_link(
        &mut self,
        id: LinkId,
        world: &mut dyn BodyWorld,
        backend: &mut dyn ConstraintBackend,
    ) -> Result<()> {
        let mut link = self.links.remove(&id).ok_or(LinkError::LinkNotFound(id))?;

        link.joint.drop_joint(backend);
        if link.coupled {
            if let Err(err) = world.decouple(link.target_body) {
                warn!(%err, "decouple failed while breaking link");
            }
        }

        for peer_id in [link.source, link.target] {
            if let Some(peer) = self.peers.get_mut(&peer_id) {
                peer.set_other(None);
                if let Err(err) = peer.transition(LinkState::Available) {
                    warn!(peer = %peer_id, %err, "peer stuck leaving link");
                }
            }
        }
        for sibling in link.locked_siblings.drain(..) {
            if let Some(peer) = self.peers.get_mut(&sibling) {
                if peer.state() == LinkState::Locked {
                    let _ = peer.transition(LinkState::Available);
                }
            }
        }

        self.broadcaster.broadcast(&LinkEvent::LinkBroken {
            link: id,
            source: link.source,
            target: link.target,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Link queries
    // ------------------------------------------------------------------

    /// The link a peer participates in, if any.
    #[must_use]
    pub fn link_of_peer(&self, peer: PeerId) -> Option<LinkId> {
        self.links
            .values()
            .find(|link| link.source == peer || link.target == peer)
            .map(|link| link.id)
    }

    /// Read-only view of a link.
    #[must_use]
    pub fn link_info(&self, id: LinkId) -> Option<LinkInfo> {
        self.links.get(&id).map(|link| LinkInfo {
            id: link.id,
            source: link.source,
            target: link.target,
            coupled: link.coupled,
            joint_kind: link.joint.kind(),
            deployed_length: link.joint.deployed_length(),
        })
    }

    /// Iterate read-only views of every active link.
    pub fn links(&self) -> impl Iterator<Item = LinkInfo> + '_ {
        self.links.keys().filter_map(|id| self.link_info(*id))
    }

    // ------------------------------------------------------------------
    // Coupling and cable control
    // ------------------------------------------------------------------

    /// Switch an established link between coupled and attached mode.
    ///
    /// Returns `false` without changing anything if the link is unknown,
    /// the policy forbids the requested mode, or a peer cannot couple.
    /// Setting the current mode again is a successful no-op. The switch
    /// is lossless: a cable's deployed length survives it.
    pub fn set_couple_on_link_mode(
        &mut self,
        id: LinkId,
        coupled: bool,
        world: &mut dyn BodyWorld,
        backend: &mut dyn ConstraintBackend,
    ) -> bool {
        let (current, source_peer) = match self.links.get(&id) {
            Some(link) => (link.coupled, link.source),
            None => {
                warn!(%id, "couple mode change for unknown link");
                return false;
            }
        };
        if current == coupled {
            return true;
        }
        let Some(config) = self.peers.get(&source_peer).map(|p| p.config().clone()) else {
            warn!(%id, "link source peer missing");
            return false;
        };
        match (config.coupling_policy, coupled) {
            (CouplingPolicy::AlwaysCoupled, false) => {
                warn!(%id, "policy is always-coupled, refusing to uncouple");
                return false;
            }
            (CouplingPolicy::NeverCouple, true) => {
                warn!(%id, "policy is never-couple, refusing to couple");
                return false;
            }
            _ => {}
        }

        let Some(link) = self.links.get_mut(&id) else {
            return false;
        };
        if coupled && !couple::can_couple(world, link) {
            warn!(%id, "a peer cannot couple, mode unchanged");
            return false;
        }
        match couple::switch_mode(link, &config, world, backend, coupled) {
            Ok(()) => {
                self.broadcaster
                    .broadcast(&LinkEvent::CoupleModeChanged { link: id, coupled });
                true
            }
            Err(err) => {
                warn!(%id, %err, "couple mode switch failed, mode unchanged");
                false
            }
        }
    }

    /// Change a cable link's deployed length.
    ///
    /// Returns the new deployed length. Sentinel commands resolve against
    /// the configured maximum and the current real anchor distance.
    pub fn set_cable_length(
        &mut self,
        id: LinkId,
        command: CableLengthCommand,
        world: &dyn BodyWorld,
        backend: &mut dyn ConstraintBackend,
    ) -> Result<f64> {
        let link = self.links.get_mut(&id).ok_or(LinkError::LinkNotFound(id))?;
        let source_anchor = node_world_anchor(world, link.source_body, &link.source_node)?;
        let target_anchor = node_world_anchor(world, link.target_body, &link.target_node)?;
        let real_distance = geometry::link_length(&source_anchor, &target_anchor);
        link.joint.set_cable_length(backend, command, real_distance)
    }

    // ------------------------------------------------------------------
    // Node blocking
    // ------------------------------------------------------------------

    /// An external attachment occupied a node; park its peers.
    pub fn block_node(&mut self, body: BodyId, node: &AttachNodeId) {
        let mut any = false;
        for peer in self.peers.values_mut() {
            if peer.body() == body && peer.node() == node && peer.state() == LinkState::Available {
                any |= peer.transition(LinkState::NodeIsBlocked).is_ok();
            }
        }
        if any {
            self.broadcaster.broadcast(&LinkEvent::NodeBlocked {
                body,
                node: node.clone(),
            });
        }
    }

    /// The blocking attachment went away; release the node's peers.
    pub fn unblock_node(&mut self, body: BodyId, node: &AttachNodeId) {
        let mut any = false;
        for peer in self.peers.values_mut() {
            if peer.body() == body
                && peer.node() == node
                && peer.state() == LinkState::NodeIsBlocked
            {
                any |= peer.transition(LinkState::Available).is_ok();
            }
        }
        if any {
            self.broadcaster.broadcast(&LinkEvent::NodeUnblocked {
                body,
                node: node.clone(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Frame callbacks
    // ------------------------------------------------------------------

    /// Host fixed-physics-step callback.
    ///
    /// Runs deferred continuations that came due, then converts backend
    /// break events into deferred re-checks for the next step. A break
    /// event names a body, not a constraint; the re-check concludes the
    /// link failed only if one of its own constraints is actually gone.
    pub fn fixed_step(&mut self, world: &mut dyn BodyWorld, backend: &mut dyn ConstraintBackend) {
        for task in self.scheduler.drain_fixed_step() {
            self.run_deferred(task, world, backend);
        }
        for event in backend.drain_break_events() {
            self.on_constraint_break(event.body);
        }
    }

    /// Host end-of-frame callback.
    pub fn end_of_frame(&mut self, world: &mut dyn BodyWorld, backend: &mut dyn ConstraintBackend) {
        for task in self.scheduler.drain_end_of_frame() {
            self.run_deferred(task, world, backend);
        }
    }

    /// Queue break re-checks for every attached link touching a body.
    fn on_constraint_break(&mut self, body: BodyId) {
        let affected: Vec<LinkId> = self
            .links
            .values()
            .filter(|link| {
                !link.coupled && (link.source_body == body || link.target_body == body)
            })
            .map(|link| link.id)
            .collect();
        for id in affected {
            debug!(link = %id, %body, "break event near link, deferring re-check");
            self.scheduler
                .schedule(FramePhase::AfterSteps(1), Deferred::RecheckBreak { link: id });
        }
    }

    fn run_deferred(
        &mut self,
        task: Deferred,
        world: &mut dyn BodyWorld,
        backend: &mut dyn ConstraintBackend,
    ) {
        match task {
            Deferred::RecheckBreak { link } => {
                // The link may be gone, rebuilt, or coupled by now.
                let Some(active) = self.links.get(&link) else {
                    return;
                };
                if active.coupled {
                    return;
                }
                let gone = active
                    .joint
                    .constraint_ids()
                    .iter()
                    .any(|id| !backend.exists(*id));
                if gone {
                    debug!(%link, "constraint confirmed gone, breaking link");
                    if let Err(err) = self.break_link(link, world, backend) {
                        warn!(%link, %err, "failed to break link after constraint loss");
                    }
                }
            }
            Deferred::RestoreBreakage { link } => {
                if self.physics_paused {
                    return;
                }
                if let Some(active) = self.links.get_mut(&link) {
                    if let Err(err) = active.joint.set_indestructible(backend, false) {
                        warn!(%link, %err, "failed to restore break thresholds");
                    }
                }
            }
        }
    }

    /// The simulation stopped actively stepping; make every joint
    /// temporarily indestructible so numerical noise cannot break links.
    pub fn pause_physics(&mut self, backend: &mut dyn ConstraintBackend) {
        self.physics_paused = true;
        for link in self.links.values_mut() {
            if let Err(err) = link.joint.set_indestructible(backend, true) {
                warn!(link = %link.id, %err, "failed to make joint indestructible");
            }
        }
    }

    /// The simulation resumed; normal thresholds come back after a few
    /// settling steps.
    pub fn resume_physics(&mut self) {
        self.physics_paused = false;
        let ids: Vec<LinkId> = self.links.keys().copied().collect();
        for id in ids {
            self.scheduler.schedule(
                FramePhase::AfterSteps(BREAKAGE_GRACE_STEPS),
                Deferred::RestoreBreakage { link: id },
            );
        }
    }
}

/// Gather the geometric creation context for a joint.
pub(crate) fn build_joint_context<'a>(
    world: &dyn BodyWorld,
    source_body: BodyId,
    source_node: &AttachNodeId,
    target_body: BodyId,
    target_node: &AttachNodeId,
    config: &'a LinkConfig,
) -> Result<JointContext<'a>> {
    let source_attach = world.attach_node(source_body, source_node)?;
    let target_attach = world.attach_node(target_body, target_node)?;
    let source_anchor = node_world_anchor(world, source_body, source_node)?;
    let target_anchor = node_world_anchor(world, target_body, target_node)?;
    Ok(JointContext {
        source_body,
        target_body,
        source_anchor: source_attach.local_position,
        target_anchor: target_attach.local_position,
        real_distance: geometry::link_length(&source_anchor, &target_anchor),
        config,
    })
}
