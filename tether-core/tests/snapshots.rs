//! Persistence round trips and restore-time auto-correction.

use nalgebra::{Isometry3, Point3};

use tether_core::testing::TestWorld;
use tether_core::{AttachNode, BodyWorld, LinkManager, LinkSnapshot, PeerSnapshot};
use tether_joint::testing::MockBackend;
use tether_types::{
    AttachNodeId, BodyId, CableLengthCommand, CouplingPolicy, JointKind, LinkConfig, LinkId,
    LinkRole, LinkState, PeerId,
};

/// Two bodies with forward-facing nodes, 3 m apart.
fn two_body_world() -> (TestWorld, BodyId, BodyId) {
    let mut world = TestWorld::new();
    let a = world.add_body(Isometry3::identity());
    let b = world.add_body(Isometry3::translation(0.0, 3.0, 0.0));
    world.add_node(a, AttachNode::new("plug", Point3::origin()));
    world.add_node(b, AttachNode::new("socket", Point3::origin()));
    (world, a, b)
}

fn cable_config() -> LinkConfig {
    LinkConfig::new("w")
        .with_joint_kind(JointKind::Cable)
        .with_length_limits(0.0, 10.0)
        .with_coupling_policy(CouplingPolicy::SetViaGui)
}

#[test]
fn snapshot_round_trip_restores_links_and_joints() {
    let (mut world, a, b) = two_body_world();
    let mut backend = MockBackend::new();
    let mut manager = LinkManager::new();

    let source = manager
        .add_peer(&world, a, "plug".into(), LinkRole::Source, cable_config())
        .unwrap();
    let target = manager
        .add_peer(&world, b, "socket".into(), LinkRole::Target, LinkConfig::new("w"))
        .unwrap();
    manager.start_linking(source).unwrap();
    let link = manager
        .establish_link(source, target, &mut world, &mut backend)
        .unwrap();
    manager
        .set_cable_length(link, CableLengthCommand::Deployed(6.5), &world, &mut backend)
        .unwrap();

    let snapshot = manager.snapshot();

    // A fresh process: new backend, reloaded world.
    let (mut world2, _, _) = world_like(&snapshot);
    let mut backend2 = MockBackend::new();
    let restored = LinkManager::restore(&snapshot, &mut world2, &mut backend2).unwrap();

    let info = restored.link_info(link).unwrap();
    assert_eq!(info.source, source);
    assert_eq!(info.target, target);
    assert!(!info.coupled);
    assert_eq!(info.deployed_length, Some(6.5));
    assert_eq!(restored.peer(source).unwrap().state(), LinkState::Linked);
    assert_eq!(restored.peer(source).unwrap().other_peer(), Some(target));
    assert_eq!(restored.peer(target).unwrap().other_peer(), Some(source));
    // The constraint was rebuilt in the new backend.
    assert_eq!(backend2.live_count(), 1);
    let id = backend2.spec_ids()[0];
    assert_eq!(
        backend2.spec(id).unwrap().linear_limit.unwrap().max_distance,
        6.5
    );
}

/// The reloaded world has the same bodies/nodes as the one snapshotted.
fn world_like(_snapshot: &tether_core::ManagerSnapshot) -> (TestWorld, BodyId, BodyId) {
    two_body_world()
}

#[test]
fn restored_coupled_link_refreshes_instead_of_recoupling() {
    let (mut world, a, b) = two_body_world();
    let mut backend = MockBackend::new();
    let mut manager = LinkManager::new();

    let source = manager
        .add_peer(
            &world,
            a,
            "plug".into(),
            LinkRole::Source,
            LinkConfig::new("A").with_coupling_policy(CouplingPolicy::AlwaysCoupled),
        )
        .unwrap();
    let target = manager
        .add_peer(&world, b, "socket".into(), LinkRole::Target, LinkConfig::new("A"))
        .unwrap();
    manager.start_linking(source).unwrap();
    let link = manager
        .establish_link(source, target, &mut world, &mut backend)
        .unwrap();
    assert!(manager.link_info(link).unwrap().coupled);

    let snapshot = manager.snapshot();

    // The host restores vessels already merged, as saves do.
    let (mut world2, a2, b2) = two_body_world();
    world2
        .couple(
            a2,
            &AttachNodeId::new("plug"),
            b2,
            &AttachNodeId::new("socket"),
        )
        .unwrap();
    let mut backend2 = MockBackend::new();
    let restored = LinkManager::restore(&snapshot, &mut world2, &mut backend2).unwrap();

    assert!(restored.link_info(link).unwrap().coupled);
    assert!(world2.are_coupled(a2, b2));
    // No constraint for a coupled link.
    assert_eq!(backend2.created_total(), 0);
}

#[test]
fn asymmetric_linked_claim_is_corrected() {
    let (mut world, a, b) = two_body_world();
    let mut backend = MockBackend::new();

    // Hand-build a corrupt snapshot: the source claims a link, the
    // target knows nothing about it.
    let snapshot = tether_core::ManagerSnapshot {
        peers: vec![
            PeerSnapshot {
                peer: PeerId::new(0),
                body: a,
                node: AttachNodeId::new("plug"),
                role: LinkRole::Source,
                config: LinkConfig::new("A"),
                state: LinkState::Linked,
                other_peer: Some(PeerId::new(1)),
            },
            PeerSnapshot {
                peer: PeerId::new(1),
                body: b,
                node: AttachNodeId::new("socket"),
                role: LinkRole::Target,
                config: LinkConfig::new("A"),
                state: LinkState::Available,
                other_peer: None,
            },
        ],
        links: vec![LinkSnapshot {
            link: LinkId::new(0),
            source: PeerId::new(0),
            target: PeerId::new(1),
            coupled: false,
            deployed_length: None,
            locked_siblings: Vec::new(),
        }],
    };

    let restored = LinkManager::restore(&snapshot, &mut world, &mut backend).unwrap();

    // The contradiction was resolved to "no link", not restored.
    assert!(restored.links().next().is_none());
    assert_eq!(
        restored.peer(PeerId::new(0)).unwrap().state(),
        LinkState::Available
    );
    assert_eq!(restored.peer(PeerId::new(0)).unwrap().other_peer(), None);
    assert_eq!(backend.created_total(), 0);
}

#[test]
fn session_states_are_not_persisted_through() {
    let (mut world, a, b) = two_body_world();
    let mut backend = MockBackend::new();
    let mut manager = LinkManager::new();

    let source = manager
        .add_peer(&world, a, "plug".into(), LinkRole::Source, LinkConfig::new("A"))
        .unwrap();
    let target = manager
        .add_peer(&world, b, "socket".into(), LinkRole::Target, LinkConfig::new("A"))
        .unwrap();
    manager.start_linking(source).unwrap();

    // Snapshot mid-session.
    let snapshot = manager.snapshot();
    let restored = LinkManager::restore(&snapshot, &mut world, &mut backend).unwrap();

    assert_eq!(restored.peer(source).unwrap().state(), LinkState::Available);
    assert_eq!(restored.peer(target).unwrap().state(), LinkState::Available);
}

#[test]
fn peer_on_missing_body_is_dropped() {
    let (mut world, a, _) = two_body_world();
    let mut backend = MockBackend::new();

    let snapshot = tether_core::ManagerSnapshot {
        peers: vec![
            PeerSnapshot {
                peer: PeerId::new(0),
                body: a,
                node: AttachNodeId::new("plug"),
                role: LinkRole::Source,
                config: LinkConfig::new("A"),
                state: LinkState::Available,
                other_peer: None,
            },
            PeerSnapshot {
                peer: PeerId::new(1),
                body: BodyId::new(99),
                node: AttachNodeId::new("gone"),
                role: LinkRole::Target,
                config: LinkConfig::new("A"),
                state: LinkState::Available,
                other_peer: None,
            },
        ],
        links: Vec::new(),
    };

    let restored = LinkManager::restore(&snapshot, &mut world, &mut backend).unwrap();
    assert!(restored.peer(PeerId::new(0)).is_some());
    assert!(restored.peer(PeerId::new(1)).is_none());
}

#[test]
fn restored_manager_continues_the_id_sequence() {
    let (mut world, a, b) = two_body_world();
    let mut backend = MockBackend::new();
    let mut manager = LinkManager::new();

    let source = manager
        .add_peer(&world, a, "plug".into(), LinkRole::Source, LinkConfig::new("A"))
        .unwrap();
    let _target = manager
        .add_peer(&world, b, "socket".into(), LinkRole::Target, LinkConfig::new("A"))
        .unwrap();

    let snapshot = manager.snapshot();
    let mut restored = LinkManager::restore(&snapshot, &mut world, &mut backend).unwrap();

    // New peers never collide with restored ids.
    let fresh = restored
        .add_peer(&world, a, "plug".into(), LinkRole::Source, LinkConfig::new("A"))
        .unwrap();
    assert_ne!(fresh, source);
    assert!(restored.peer(source).is_some());
    assert!(restored.peer(fresh).is_some());
}
