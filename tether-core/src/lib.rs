//! Link state machine and joint lifecycle control for runtime part
//! linking.
//!
//! This crate is the orchestrating layer: it owns the peers, runs the
//! establishment/break protocol, decides coupling, and reacts to events
//! from the host physics engine.
//!
//! - [`LinkManager`] - Owns peers and links, drives the whole protocol
//! - [`LinkPeer`] / [`LinkStateMachine`] - Per-endpoint strict state
//! - [`BodyWorld`] - The host surface: poses, attach nodes, hierarchy
//! - [`FrameScheduler`] - Deferred continuations keyed by callback phase
//! - [`EventBroadcaster`] / [`LinkEvent`] - Explicit observer list
//! - [`ManagerSnapshot`] - Persistence keyed by stable ids
//!
//! # Control Flow
//!
//! A source opens a session with [`LinkManager::start_linking`];
//! compatible targets start accepting. [`LinkManager::check_can_link`]
//! validates state, geometry, and obstruction without mutating anything,
//! and [`LinkManager::establish_link`] applies the link all-or-nothing:
//! coupling decision first, then joint construction, then notification.
//! Breaking reverses it. The host calls [`LinkManager::fixed_step`] and
//! [`LinkManager::end_of_frame`] from its loop; constraint-break events
//! are re-validated one step later before a link is declared dead,
//! because the engine reports breaks per body, not per constraint.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Isometry3, Point3};
//! use tether_core::testing::TestWorld;
//! use tether_core::{AttachNode, LinkManager};
//! use tether_joint::testing::MockBackend;
//! use tether_types::{LinkConfig, LinkRole};
//!
//! let mut world = TestWorld::new();
//! let winch = world.add_body(Isometry3::identity());
//! let anchor = world.add_body(Isometry3::translation(0.0, 3.0, 0.0));
//! world.add_node(winch, AttachNode::new("cable", Point3::origin()));
//! world.add_node(anchor, AttachNode::new("hook", Point3::origin()));
//!
//! let mut backend = MockBackend::new();
//! let mut manager = LinkManager::new();
//! let source = manager
//!     .add_peer(&world, winch, "cable".into(), LinkRole::Source, LinkConfig::new("cable"))
//!     .unwrap();
//! let target = manager
//!     .add_peer(&world, anchor, "hook".into(), LinkRole::Target, LinkConfig::new("cable"))
//!     .unwrap();
//!
//! manager.start_linking(source).unwrap();
//! let link = manager.establish_link(source, target, &mut world, &mut backend).unwrap();
//! assert!(manager.peer(source).unwrap().is_linked());
//! assert_eq!(manager.link_info(link).unwrap().target, target);
//! ```

#![doc(html_root_url = "https://docs.rs/tether-core/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc, // Error docs added where non-obvious
)]

mod couple;
mod events;
mod link;
mod machine;
mod peer;
mod persist;
mod scheduler;
pub mod testing;
mod world;

pub use events::{EventBroadcaster, LinkEvent};
pub use link::{LinkInfo, LinkManager};
pub use machine::{LinkStateMachine, TransitionRequests};
pub use peer::LinkPeer;
pub use persist::{LinkSnapshot, ManagerSnapshot, PeerSnapshot};
pub use scheduler::{FramePhase, FrameScheduler};
pub use world::{node_world_anchor, node_world_pose, AttachNode, BodyWorld};
