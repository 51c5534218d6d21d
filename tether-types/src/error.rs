//! Error types for link operations.
//!
//! Two families: [`ValidationError`] is the user-facing message list the
//! establishment protocol returns (never a panic, never partial mutation),
//! and [`LinkError`] covers programming/configuration errors such as
//! illegal state transitions. The host keeps running either way.

use thiserror::Error;

use crate::ids::{BodyId, ConstraintId, LinkId, PeerId};
use crate::state::{LinkRole, LinkState};

/// A single user-facing validation failure from the link establishment
/// protocol.
///
/// The `Display` strings are what a GUI overlay or log line shows next to
/// the action origin, so they carry the offending numbers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Source and target carry different link type tags.
    #[error("link types do not match: {source_type} vs {target_type}")]
    TypeMismatch {
        /// Type tag of the source peer.
        source_type: String,
        /// Type tag of the target peer.
        target_type: String,
    },

    /// The source peer is not in a state that can link.
    #[error("source cannot link while {state}")]
    SourceStateMismatch {
        /// Current state of the source peer.
        state: LinkState,
    },

    /// The target peer is not in a state that can accept a link.
    #[error("target cannot link while {state}")]
    TargetStateMismatch {
        /// Current state of the target peer.
        state: LinkState,
    },

    /// Anchor distance below the configured minimum.
    #[error("link is too short: {distance} < {min}")]
    TooShort {
        /// Measured anchor-to-anchor distance.
        distance: f64,
        /// Configured minimum length.
        min: f64,
    },

    /// Anchor distance above the configured maximum.
    #[error("link is too long: {distance} > {max}")]
    TooLong {
        /// Measured anchor-to-anchor distance.
        distance: f64,
        /// Configured maximum length.
        max: f64,
    },

    /// Angle at the source node exceeds its configured limit.
    #[error("source angle limit reached: {angle} > {limit}")]
    SourceAngleLimit {
        /// Measured angle in degrees.
        angle: f64,
        /// Configured limit in degrees.
        limit: f64,
    },

    /// Angle at the target node exceeds its configured limit.
    #[error("target angle limit reached: {angle} > {limit}")]
    TargetAngleLimit {
        /// Measured angle in degrees.
        angle: f64,
        /// Configured limit in degrees.
        limit: f64,
    },

    /// A third-party collider intersects the path between the anchors.
    #[error("link path is obstructed by {collider}")]
    Obstructed {
        /// Name of the blocking collider.
        collider: String,
    },

    /// The attach node is occupied by an external attachment.
    #[error("attach node {node} is already occupied")]
    NodeOccupied {
        /// Name of the occupied node.
        node: String,
    },
}

/// Errors from link operations.
///
/// These are refused operations, not host-fatal conditions; every variant
/// leaves the system in its previous valid state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinkError {
    /// A state transition outside the legal table was requested.
    #[error("illegal {role} transition: {from} -> {to}")]
    IllegalTransition {
        /// Role of the peer whose machine refused.
        role: LinkRole,
        /// State the machine was in.
        from: LinkState,
        /// State that was requested.
        to: LinkState,
    },

    /// No peer registered under this id.
    #[error("unknown peer: {0}")]
    PeerNotFound(PeerId),

    /// No body known to the host world under this id.
    #[error("unknown body: {0}")]
    BodyNotFound(BodyId),

    /// No attach node with this name on the body.
    #[error("unknown attach node {node} on {body}")]
    AttachNodeNotFound {
        /// Body that was queried.
        body: BodyId,
        /// Node name that was not found.
        node: String,
    },

    /// No constraint object under this id in the physics backend.
    #[error("unknown constraint: {0}")]
    ConstraintNotFound(ConstraintId),

    /// No active link under this id.
    #[error("unknown link: {0}")]
    LinkNotFound(LinkId),

    /// The peer has no active link.
    #[error("peer {0} is not linked")]
    NotLinked(PeerId),

    /// The peer already has an active link.
    #[error("peer {0} is already linked")]
    AlreadyLinked(PeerId),

    /// A linking session is already in progress from another source.
    #[error("a linking session is already active from {0}")]
    SessionActive(PeerId),

    /// Contradictory or unusable configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// The establishment protocol validation produced a non-empty list.
    #[error("link validation failed: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),
}

/// Concatenate validation messages for a single log/GUI line.
fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_message() {
        let err = ValidationError::TooShort {
            distance: 0.5,
            min: 1.0,
        };
        assert_eq!(err.to_string(), "link is too short: 0.5 < 1");
    }

    #[test]
    fn test_angle_limit_message() {
        let err = ValidationError::SourceAngleLimit {
            angle: 10.0,
            limit: 5.0,
        };
        assert_eq!(err.to_string(), "source angle limit reached: 10 > 5");
    }

    #[test]
    fn test_illegal_transition_message() {
        let err = LinkError::IllegalTransition {
            role: LinkRole::Source,
            from: LinkState::Linked,
            to: LinkState::Linking,
        };
        assert_eq!(err.to_string(), "illegal source transition: linked -> linking");
    }

    #[test]
    fn test_validation_list_is_concatenated() {
        let err = LinkError::Validation(vec![
            ValidationError::TooShort {
                distance: 0.5,
                min: 1.0,
            },
            ValidationError::Obstructed {
                collider: "girder".to_owned(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("too short"));
        assert!(msg.contains("girder"));
        assert!(msg.contains("; "));
    }
}
