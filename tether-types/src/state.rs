//! Link endpoint states and the legal transition table.
//!
//! Every endpoint of a potential link runs the same strict state machine.
//! The table here is the single source of truth for which transitions are
//! legal; the dispatcher in the core crate refuses anything else. Illegal
//! transitions must fail loudly, never silently clamp.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a link endpoint initiates links or accepts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinkRole {
    /// The endpoint that starts a linking session and owns the joint.
    Source,
    /// The endpoint that accepts (or rejects) an incoming link.
    Target,
}

impl std::fmt::Display for LinkRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// State of a link endpoint.
///
/// The full lifecycle of a source is `Available → Linking → Linked →
/// Available`. A target moves `Available → AcceptingLinks → Linked` when it
/// is chosen, or back to `Available` when the session ends without it.
/// `Locked` marks a sibling target on a body that already got a link;
/// `NodeIsBlocked` marks a node occupied by an external (non-link) attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinkState {
    /// Idle; may start or accept a link.
    #[default]
    Available,
    /// Source only: a linking session is in progress from this peer.
    Linking,
    /// Target only: a compatible source is linking and this peer accepts.
    AcceptingLinks,
    /// Target only: a source is linking but this peer is not compatible.
    RejectingLinks,
    /// An active link runs through this peer.
    Linked,
    /// Another peer on the same body got linked instead.
    Locked,
    /// An external attachment occupies this peer's attach node.
    NodeIsBlocked,
}

impl LinkState {
    /// Check whether a transition from this state to `to` is legal for the
    /// given role.
    ///
    /// Self-transitions are illegal; the machine never re-enters a state it
    /// is already in.
    #[must_use]
    pub const fn can_transition(self, role: LinkRole, to: Self) -> bool {
        match (self, to) {
            (Self::Available, Self::Linking) => matches!(role, LinkRole::Source),
            (Self::Available, Self::AcceptingLinks | Self::RejectingLinks) => {
                matches!(role, LinkRole::Target)
            }
            (Self::Available, Self::NodeIsBlocked) => true,
            (Self::NodeIsBlocked, Self::Available) => true,
            (Self::Linking, Self::Available | Self::Linked) => matches!(role, LinkRole::Source),
            (Self::AcceptingLinks, Self::Available | Self::Linked | Self::Locked) => {
                matches!(role, LinkRole::Target)
            }
            (Self::RejectingLinks, Self::Available) => matches!(role, LinkRole::Target),
            (Self::Linked, Self::Available) => true,
            (Self::Locked, Self::Available) => true,
            _ => false,
        }
    }

    /// States a peer may be in while no link or session involves it.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Available | Self::NodeIsBlocked)
    }

    /// Check whether an active link runs through a peer in this state.
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(self, Self::Linked)
    }

    /// Check whether the peer participates in an ongoing linking session.
    #[must_use]
    pub const fn in_session(self) -> bool {
        matches!(
            self,
            Self::Linking | Self::AcceptingLinks | Self::RejectingLinks
        )
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Linking => write!(f, "linking"),
            Self::AcceptingLinks => write!(f, "accepting-links"),
            Self::RejectingLinks => write!(f, "rejecting-links"),
            Self::Linked => write!(f, "linked"),
            Self::Locked => write!(f, "locked"),
            Self::NodeIsBlocked => write!(f, "node-is-blocked"),
        }
    }
}
