//! The strict transition dispatcher for link endpoint states.
//!
//! [`LinkStateMachine`] wraps the legal-transition table from
//! `tether-types` with ordered side effects: leave hooks of the old state
//! run first, then the state changes, then enter hooks of the new state,
//! then the after-transition hooks. Hooks never get a reference to the
//! machine, so they cannot dispatch recursively; a hook that wants a
//! follow-up transition requests it through [`TransitionRequests`] and the
//! dispatcher runs it after the current transition completes.
//!
//! Illegal transitions are refused loudly and leave the state unchanged.

use std::collections::VecDeque;

use tracing::{debug, warn};

use tether_types::{LinkError, LinkRole, LinkState, Result};

/// Follow-up transitions requested by hooks.
///
/// Requests are dispatched in order after the current transition finishes;
/// an illegal request is logged and dropped, never partially applied.
#[derive(Debug, Default)]
pub struct TransitionRequests {
    queued: VecDeque<LinkState>,
}

impl TransitionRequests {
    /// Queue a follow-up transition.
    pub fn request(&mut self, to: LinkState) {
        self.queued.push_back(to);
    }
}

type Hook = Box<dyn FnMut(LinkState, LinkState, &mut TransitionRequests)>;

/// Chained-transition cap; a hook cascade longer than this is a bug.
const MAX_CHAIN: usize = 16;

/// State machine for one link endpoint.
pub struct LinkStateMachine {
    role: LinkRole,
    state: LinkState,
    on_leave: Vec<(LinkState, Hook)>,
    on_enter: Vec<(LinkState, Hook)>,
    after: Vec<Hook>,
}

impl std::fmt::Debug for LinkStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStateMachine")
            .field("role", &self.role)
            .field("state", &self.state)
            .finish()
    }
}

impl LinkStateMachine {
    /// Create a machine in `Available` for the given role.
    #[must_use]
    pub fn new(role: LinkRole) -> Self {
        Self {
            role,
            state: LinkState::Available,
            on_leave: Vec::new(),
            on_enter: Vec::new(),
            after: Vec::new(),
        }
    }

    /// The endpoint role this machine validates against.
    #[must_use]
    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Run a hook whenever the given state is left.
    pub fn on_leave(
        &mut self,
        state: LinkState,
        hook: impl FnMut(LinkState, LinkState, &mut TransitionRequests) + 'static,
    ) {
        self.on_leave.push((state, Box::new(hook)));
    }

    /// Run a hook whenever the given state is entered.
    pub fn on_enter(
        &mut self,
        state: LinkState,
        hook: impl FnMut(LinkState, LinkState, &mut TransitionRequests) + 'static,
    ) {
        self.on_enter.push((state, Box::new(hook)));
    }

    /// Run a hook after every completed transition (logging/GUI refresh).
    pub fn on_after_transition(
        &mut self,
        hook: impl FnMut(LinkState, LinkState, &mut TransitionRequests) + 'static,
    ) {
        self.after.push(Box::new(hook));
    }

    /// Dispatch a transition, then any follow-ups hooks requested.
    ///
    /// The first transition's legality is the caller's contract: an
    /// illegal request returns [`LinkError::IllegalTransition`] with the
    /// state unchanged. Illegal *follow-up* requests from hooks have no
    /// caller to answer to, so they are logged and dropped.
    pub fn transition(&mut self, to: LinkState) -> Result<()> {
        let mut requests = TransitionRequests::default();
        self.dispatch(to, &mut requests)?;

        let mut chain = 0;
        while let Some(next) = requests.queued.pop_front() {
            chain += 1;
            if chain > MAX_CHAIN {
                warn!(
                    role = %self.role,
                    state = %self.state,
                    "transition hook cascade exceeded {MAX_CHAIN} steps, dropping the rest"
                );
                break;
            }
            if let Err(err) = self.dispatch(next, &mut requests) {
                warn!(%err, "queued transition refused");
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, to: LinkState, requests: &mut TransitionRequests) -> Result<()> {
        let from = self.state;
        if !from.can_transition(self.role, to) {
            warn!(role = %self.role, %from, %to, "illegal transition refused");
            return Err(LinkError::IllegalTransition {
                role: self.role,
                from,
                to,
            });
        }

        for (state, hook) in &mut self.on_leave {
            if *state == from {
                hook(from, to, requests);
            }
        }
        self.state = to;
        for (state, hook) in &mut self.on_enter {
            if *state == to {
                hook(from, to, requests);
            }
        }
        for hook in &mut self.after {
            hook(from, to, requests);
        }
        debug!(role = %self.role, %from, %to, "link state transition");
        Ok(())
    }

    /// Set the state directly, bypassing the table and all hooks.
    ///
    /// Only for restoring persisted state; the snapshot was validated
    /// against the same table when it was taken.
    pub(crate) fn restore_state(&mut self, state: LinkState) {
        self.state = state;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_legal_transition_changes_state() {
        let mut machine = LinkStateMachine::new(LinkRole::Source);
        machine.transition(LinkState::Linking).unwrap();
        assert_eq!(machine.state(), LinkState::Linking);
    }

    #[test]
    fn test_illegal_transition_leaves_state_unchanged() {
        let mut machine = LinkStateMachine::new(LinkRole::Source);
        let err = machine.transition(LinkState::Linked);
        assert_eq!(
            err,
            Err(LinkError::IllegalTransition {
                role: LinkRole::Source,
                from: LinkState::Available,
                to: LinkState::Linked,
            })
        );
        assert_eq!(machine.state(), LinkState::Available);
    }

    #[test]
    fn test_hook_ordering_leave_enter_after() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut machine = LinkStateMachine::new(LinkRole::Source);

        let log = Rc::clone(&order);
        machine.on_leave(LinkState::Available, move |_, _, _| {
            log.borrow_mut().push("leave")
        });
        let log = Rc::clone(&order);
        machine.on_enter(LinkState::Linking, move |_, _, _| {
            log.borrow_mut().push("enter")
        });
        let log = Rc::clone(&order);
        machine.on_after_transition(move |_, _, _| log.borrow_mut().push("after"));

        machine.transition(LinkState::Linking).unwrap();
        assert_eq!(*order.borrow(), vec!["leave", "enter", "after"]);
    }

    #[test]
    fn test_hooks_only_fire_for_their_state() {
        let count = Rc::new(RefCell::new(0));
        let mut machine = LinkStateMachine::new(LinkRole::Target);

        let counter = Rc::clone(&count);
        machine.on_enter(LinkState::Locked, move |_, _, _| {
            *counter.borrow_mut() += 1
        });

        machine.transition(LinkState::AcceptingLinks).unwrap();
        machine.transition(LinkState::Available).unwrap();
        assert_eq!(*count.borrow(), 0);

        machine.transition(LinkState::AcceptingLinks).unwrap();
        machine.transition(LinkState::Locked).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_requested_transition_runs_after_current_one() {
        let states_seen = Rc::new(RefCell::new(Vec::new()));
        let mut machine = LinkStateMachine::new(LinkRole::Source);

        // A hook that cancels the session as soon as it starts.
        machine.on_enter(LinkState::Linking, |_, _, requests| {
            requests.request(LinkState::Available);
        });
        let log = Rc::clone(&states_seen);
        machine.on_after_transition(move |_, to, _| log.borrow_mut().push(to));

        machine.transition(LinkState::Linking).unwrap();
        // Both transitions completed, in order, with no recursion.
        assert_eq!(
            *states_seen.borrow(),
            vec![LinkState::Linking, LinkState::Available]
        );
        assert_eq!(machine.state(), LinkState::Available);
    }

    #[test]
    fn test_illegal_queued_request_is_dropped() {
        let mut machine = LinkStateMachine::new(LinkRole::Source);
        machine.on_enter(LinkState::Linking, |_, _, requests| {
            requests.request(LinkState::Locked); // not legal for a source
        });
        machine.transition(LinkState::Linking).unwrap();
        assert_eq!(machine.state(), LinkState::Linking);
    }

    #[test]
    fn test_runaway_hook_cascade_is_capped() {
        let mut machine = LinkStateMachine::new(LinkRole::Source);
        // Ping-pong forever between Linking and Available.
        machine.on_enter(LinkState::Linking, |_, _, requests| {
            requests.request(LinkState::Available);
        });
        machine.on_enter(LinkState::Available, |_, _, requests| {
            requests.request(LinkState::Linking);
        });
        // Terminates thanks to the chain cap.
        machine.transition(LinkState::Linking).unwrap();
    }
}
