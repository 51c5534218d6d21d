//! Link lifecycle notifications for sibling modules.
//!
//! Instead of an engine-wide ambient event bus, the broadcaster is an
//! explicit observer list owned by the link manager: listeners register
//! and unregister with deterministic ids, and delivery order is
//! registration order. Listeners receive events by reference and cannot
//! reach back into the broadcaster during dispatch (the exclusive borrow
//! rules that out), so there is no re-entrancy to guard against.

use tether_types::{AttachNodeId, BodyId, LinkId, ListenerId, PeerId};

/// A link lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A source peer opened a linking session.
    LinkingStarted {
        /// The source that started linking.
        source: PeerId,
    },
    /// A linking session ended without a new link.
    LinkingStopped {
        /// The source that was linking.
        source: PeerId,
    },
    /// A link was established.
    LinkCreated {
        /// The new link.
        link: LinkId,
        /// Source endpoint.
        source: PeerId,
        /// Target endpoint.
        target: PeerId,
    },
    /// A link was broken (by request or by the physics engine).
    LinkBroken {
        /// The former link.
        link: LinkId,
        /// Source endpoint.
        source: PeerId,
        /// Target endpoint.
        target: PeerId,
    },
    /// An established link switched between coupled and attached mode.
    CoupleModeChanged {
        /// The link whose mode changed.
        link: LinkId,
        /// New mode: `true` means hierarchy-merged.
        coupled: bool,
    },
    /// An external attachment occupied a peer's attach node.
    NodeBlocked {
        /// Body carrying the node.
        body: BodyId,
        /// The occupied node.
        node: AttachNodeId,
    },
    /// A blocking external attachment went away.
    NodeUnblocked {
        /// Body carrying the node.
        body: BodyId,
        /// The freed node.
        node: AttachNodeId,
    },
}

type Listener = Box<dyn FnMut(&LinkEvent)>;

/// Explicit observer list with deterministic lifecycle.
#[derive(Default)]
pub struct EventBroadcaster {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBroadcaster {
    /// Create a broadcaster with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays subscribed until unsubscribed.
    pub fn subscribe(&mut self, listener: impl FnMut(&LinkEvent) + 'static) -> ListenerId {
        let id = ListenerId::new(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver an event to every listener in registration order.
    pub fn broadcast(&mut self, event: &LinkEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}
