//! Core types for runtime part linking.
//!
//! This crate provides the foundational types for joining independent
//! physical bodies at runtime:
//!
//! - [`LinkState`] - The per-endpoint state machine vocabulary
//! - [`LinkRole`] - Whether an endpoint initiates or accepts links
//! - [`LinkConfig`] - Geometric limits, break thresholds, coupling policy
//! - [`LinkError`] / [`ValidationError`] - Failure taxonomy
//! - [`BodyId`], [`PeerId`], [`AttachNodeId`] - Stable identifiers
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no physics, no host callbacks,
//! no joint lifecycle. They're the common language between:
//!
//! - The link protocol layer (tether-core)
//! - Joint construction against a physics backend (tether-joint)
//! - Persistence snapshots (serialized peer and link state)
//! - GUI/logging layers rendering validation messages
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! An attach node's local Y axis is its "forward" direction, the one angle
//! limits are measured against.
//!
//! # Example
//!
//! ```
//! use tether_types::{LinkConfig, LinkState, LinkRole};
//!
//! let config = LinkConfig::new("tow-bar")
//!     .with_length_limits(0.1, 8.0)
//!     .with_angle_limits(30.0, 0.0);
//!
//! assert_eq!(config.max_link_length, 8.0);
//! assert!(LinkState::Available.can_transition(LinkRole::Source, LinkState::Linking));
//! assert!(!LinkState::Linked.can_transition(LinkRole::Source, LinkState::Linking));
//! ```

#![doc(html_root_url = "https://docs.rs/tether-types/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn, // Many methods can't be const due to String fields
    clippy::missing_errors_doc,   // Error docs added where non-obvious
)]

mod config;
mod error;
mod ids;
mod state;

pub use config::{CableLengthCommand, CouplingPolicy, JointKind, LinkConfig};
pub use error::{LinkError, ValidationError};
pub use ids::{AttachNodeId, BodyId, ConstraintId, LinkId, ListenerId, PeerId};
pub use state::{LinkRole, LinkState};

/// Result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;
