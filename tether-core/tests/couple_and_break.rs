//! Coupling mode switches and constraint-break handling.
//!
//! Covers the couple coordinator's idempotence, capability checks, and
//! lossless mode switches, plus the deferred break re-validation that
//! guards against break events from unrelated joints.

use nalgebra::{Isometry3, Point3};

use tether_core::testing::TestWorld;
use tether_core::{AttachNode, BodyWorld, LinkManager};
use tether_joint::testing::MockBackend;
use tether_types::{
    AttachNodeId, BodyId, CableLengthCommand, CouplingPolicy, JointKind, LinkConfig, LinkId,
    LinkRole, LinkState, PeerId,
};

struct Rig {
    world: TestWorld,
    backend: MockBackend,
    manager: LinkManager,
    source: PeerId,
    target: PeerId,
    source_body: BodyId,
    target_body: BodyId,
    link: LinkId,
}

/// A linked pair `distance` apart, built from the given source config.
fn linked_rig(distance: f64, config: LinkConfig, target_can_couple: bool) -> Rig {
    let mut world = TestWorld::new();
    let source_body = world.add_body(Isometry3::identity());
    let target_body = world.add_body(Isometry3::translation(0.0, distance, 0.0));
    world.add_node(source_body, AttachNode::new("plug", Point3::origin()));
    world.add_node(
        target_body,
        AttachNode::new("socket", Point3::origin()).with_coupling(target_can_couple),
    );

    let mut backend = MockBackend::new();
    let mut manager = LinkManager::new();
    let target_config = LinkConfig::new(config.link_type.clone());
    let source = manager
        .add_peer(
            &world,
            source_body,
            AttachNodeId::new("plug"),
            LinkRole::Source,
            config,
        )
        .unwrap();
    let target = manager
        .add_peer(
            &world,
            target_body,
            AttachNodeId::new("socket"),
            LinkRole::Target,
            target_config,
        )
        .unwrap();

    manager.start_linking(source).unwrap();
    let link = manager
        .establish_link(source, target, &mut world, &mut backend)
        .unwrap();

    Rig {
        world,
        backend,
        manager,
        source,
        target,
        source_body,
        target_body,
        link,
    }
}

#[test]
fn couple_mode_switch_round_trip() {
    let mut rig = linked_rig(
        2.0,
        LinkConfig::new("A").with_coupling_policy(CouplingPolicy::SetViaGui),
        true,
    );
    assert!(!rig.manager.link_info(rig.link).unwrap().coupled);
    assert_eq!(rig.backend.live_count(), 1);

    // Couple: the constraint goes away, the hierarchy merges.
    assert!(rig
        .manager
        .set_couple_on_link_mode(rig.link, true, &mut rig.world, &mut rig.backend));
    assert!(rig.manager.link_info(rig.link).unwrap().coupled);
    assert!(rig.world.are_coupled(rig.source_body, rig.target_body));
    assert_eq!(rig.backend.live_count(), 0);

    // Uncouple: the hierarchy splits, the constraint comes back.
    assert!(rig
        .manager
        .set_couple_on_link_mode(rig.link, false, &mut rig.world, &mut rig.backend));
    assert!(!rig.manager.link_info(rig.link).unwrap().coupled);
    assert!(!rig.world.are_coupled(rig.source_body, rig.target_body));
    assert_eq!(rig.backend.live_count(), 1);

    // Both peers stayed linked throughout.
    assert_eq!(
        rig.manager.peer(rig.source).unwrap().state(),
        LinkState::Linked
    );
    assert_eq!(
        rig.manager.peer(rig.target).unwrap().state(),
        LinkState::Linked
    );
}

#[test]
fn setting_current_mode_is_a_noop() {
    let mut rig = linked_rig(
        2.0,
        LinkConfig::new("A").with_coupling_policy(CouplingPolicy::SetViaGui),
        true,
    );
    let before = rig.backend.created_total();

    assert!(rig
        .manager
        .set_couple_on_link_mode(rig.link, false, &mut rig.world, &mut rig.backend));

    // No constraint was rebuilt and no state churned.
    assert_eq!(rig.backend.created_total(), before);
    assert!(!rig.manager.link_info(rig.link).unwrap().coupled);
}

#[test]
fn coupling_refused_when_target_node_cannot_couple() {
    let mut rig = linked_rig(
        2.0,
        LinkConfig::new("A").with_coupling_policy(CouplingPolicy::SetViaGui),
        false,
    );

    assert!(!rig
        .manager
        .set_couple_on_link_mode(rig.link, true, &mut rig.world, &mut rig.backend));

    // Mode unchanged, constraint untouched, hierarchy untouched.
    assert!(!rig.manager.link_info(rig.link).unwrap().coupled);
    assert!(!rig.world.are_coupled(rig.source_body, rig.target_body));
    assert_eq!(rig.backend.live_count(), 1);
}

#[test]
fn always_coupled_policy_establishes_merged() {
    let rig = linked_rig(
        2.0,
        LinkConfig::new("A").with_coupling_policy(CouplingPolicy::AlwaysCoupled),
        true,
    );
    assert!(rig.manager.link_info(rig.link).unwrap().coupled);
    assert!(rig.world.are_coupled(rig.source_body, rig.target_body));
    // Coupled links need no backend constraint.
    assert_eq!(rig.backend.live_count(), 0);
}

#[test]
fn policy_forbids_contrary_mode() {
    let mut rig = linked_rig(
        2.0,
        LinkConfig::new("A").with_coupling_policy(CouplingPolicy::AlwaysCoupled),
        true,
    );
    assert!(!rig
        .manager
        .set_couple_on_link_mode(rig.link, false, &mut rig.world, &mut rig.backend));
    assert!(rig.manager.link_info(rig.link).unwrap().coupled);

    let mut rig = linked_rig(
        2.0,
        LinkConfig::new("A").with_coupling_policy(CouplingPolicy::NeverCouple),
        true,
    );
    assert!(!rig
        .manager
        .set_couple_on_link_mode(rig.link, true, &mut rig.world, &mut rig.backend));
    assert!(!rig.manager.link_info(rig.link).unwrap().coupled);
}

#[test]
fn coupling_requested_on_incapable_node_downgrades_at_link_time() {
    // AlwaysCoupled against a non-coupling target node: the peer keeps
    // its policy (the node capability lives on the other body), but the
    // link comes up attached instead of partially coupled.
    let rig = linked_rig(
        2.0,
        LinkConfig::new("A").with_coupling_policy(CouplingPolicy::AlwaysCoupled),
        false,
    );
    assert!(!rig.manager.link_info(rig.link).unwrap().coupled);
    assert!(!rig.world.are_coupled(rig.source_body, rig.target_body));
    assert_eq!(rig.backend.live_count(), 1);
}

#[test]
fn cable_deployed_length_survives_mode_switch() {
    let mut rig = linked_rig(
        3.0,
        LinkConfig::new("w")
            .with_joint_kind(JointKind::Cable)
            .with_length_limits(0.0, 10.0)
            .with_coupling_policy(CouplingPolicy::SetViaGui),
        true,
    );

    rig.manager
        .set_cable_length(
            rig.link,
            CableLengthCommand::Deployed(4.0),
            &rig.world,
            &mut rig.backend,
        )
        .unwrap();
    assert_eq!(rig.manager.link_info(rig.link).unwrap().deployed_length, Some(4.0));

    assert!(rig
        .manager
        .set_couple_on_link_mode(rig.link, true, &mut rig.world, &mut rig.backend));
    assert!(rig
        .manager
        .set_couple_on_link_mode(rig.link, false, &mut rig.world, &mut rig.backend));

    // The rebuilt constraint carries the captured length, not the
    // current anchor distance.
    let info = rig.manager.link_info(rig.link).unwrap();
    assert_eq!(info.deployed_length, Some(4.0));
    let id = rig.backend.spec_ids()[0];
    let limit = rig.backend.spec(id).unwrap().linear_limit.unwrap();
    assert_eq!(limit.max_distance, 4.0);
}

#[test]
fn winch_commands_resolve_sentinels() {
    let mut rig = linked_rig(
        3.0,
        LinkConfig::new("w")
            .with_joint_kind(JointKind::Cable)
            .with_length_limits(0.0, 10.0),
        true,
    );

    // Fresh cable deploys to the real distance.
    assert_eq!(rig.manager.link_info(rig.link).unwrap().deployed_length, Some(3.0));

    // Winch all the way out.
    let got = rig
        .manager
        .set_cable_length(
            rig.link,
            CableLengthCommand::ConfiguredMax,
            &rig.world,
            &mut rig.backend,
        )
        .unwrap();
    assert_eq!(got, 10.0);

    // Real-distance sentinel clamps to the deployed limit.
    rig.manager
        .set_cable_length(
            rig.link,
            CableLengthCommand::Deployed(2.0),
            &rig.world,
            &mut rig.backend,
        )
        .unwrap();
    let got = rig
        .manager
        .set_cable_length(
            rig.link,
            CableLengthCommand::RealDistance,
            &rig.world,
            &mut rig.backend,
        )
        .unwrap();
    assert_eq!(got, 2.0);
}

#[test]
fn unrelated_break_event_does_not_break_the_link() {
    let mut rig = linked_rig(2.0, LinkConfig::new("A"), true);

    // Another joint on the same body broke; ours is intact.
    rig.backend.inject_break_event(rig.source_body);
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);

    assert!(rig.manager.link_info(rig.link).is_some());
    assert_eq!(
        rig.manager.peer(rig.source).unwrap().state(),
        LinkState::Linked
    );
    assert_eq!(rig.backend.live_count(), 1);
}

#[test]
fn real_constraint_loss_breaks_the_link_one_step_later() {
    let mut rig = linked_rig(2.0, LinkConfig::new("A"), true);
    assert!(!rig.manager.link_info(rig.link).unwrap().coupled);

    // The engine destroys the link's only constraint and reports
    // per-body events.
    let id = rig.backend.spec_ids()[0];
    rig.backend.break_constraint(id);

    // Step 1: events convert into a deferred re-check.
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);
    assert!(rig.manager.link_info(rig.link).is_some());

    // Step 2: the re-check confirms the constraint is gone.
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);
    assert!(rig.manager.link_info(rig.link).is_none());
    assert_eq!(
        rig.manager.peer(rig.source).unwrap().state(),
        LinkState::Available
    );
    assert_eq!(
        rig.manager.peer(rig.target).unwrap().state(),
        LinkState::Available
    );
}

#[test]
fn paused_physics_makes_joints_indestructible() {
    let mut rig = linked_rig(2.0, LinkConfig::new("A").with_breakage(500.0, 250.0), true);
    let id = rig.backend.spec_ids()[0];
    assert_eq!(rig.backend.spec(id).unwrap().break_force, 500.0);

    rig.manager.pause_physics(&mut rig.backend);
    assert_eq!(rig.backend.spec(id).unwrap().break_force, f64::INFINITY);
    assert_eq!(rig.backend.spec(id).unwrap().break_torque, f64::INFINITY);

    // Thresholds come back a few settling steps after resume.
    rig.manager.resume_physics();
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);
    assert_eq!(rig.backend.spec(id).unwrap().break_force, f64::INFINITY);
    rig.manager.fixed_step(&mut rig.world, &mut rig.backend);
    assert_eq!(rig.backend.spec(id).unwrap().break_force, 500.0);
    assert_eq!(rig.backend.spec(id).unwrap().break_torque, 250.0);
}

#[test]
fn removing_a_linked_peer_breaks_its_link() {
    let mut rig = linked_rig(2.0, LinkConfig::new("A"), true);
    rig.manager
        .remove_peer(rig.source, &mut rig.world, &mut rig.backend)
        .unwrap();

    assert!(rig.manager.link_info(rig.link).is_none());
    assert!(rig.manager.peer(rig.source).is_none());
    assert_eq!(
        rig.manager.peer(rig.target).unwrap().state(),
        LinkState::Available
    );
    assert_eq!(rig.backend.live_count(), 0);
}
