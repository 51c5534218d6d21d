//! Deferred work keyed by host callback phase.
//!
//! The host drives the plugin on a single-threaded frame-stepped loop, so
//! "wait until the physics settles" is not a blocking wait but a task
//! parked for a later callback. The scheduler is a plain queue per phase;
//! tasks are data describing what to do, and the consumer re-validates the
//! task's precondition when it drains, because anything may have changed
//! in between.
//!
//! Tasks scheduled while a drain is in progress land in the queue for the
//! *next* occurrence of their phase; a drain never observes its own
//! additions.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Host callback phase a deferred task waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FramePhase {
    /// End of the current render frame.
    EndOfFrame,
    /// The next fixed-rate physics step.
    FixedStep,
    /// After this many further fixed steps (0 behaves like `FixedStep`).
    AfterSteps(u32),
}

/// Per-phase queues of deferred tasks.
///
/// `T` is whatever the consumer uses to describe a continuation; draining
/// hands the due tasks back for execution with full access to the owning
/// state, which keeps the borrow story trivial.
#[derive(Debug)]
pub struct FrameScheduler<T> {
    end_of_frame: Vec<T>,
    fixed_step: Vec<T>,
    multi_step: Vec<(u32, T)>,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameScheduler<T> {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            end_of_frame: Vec::new(),
            fixed_step: Vec::new(),
            multi_step: Vec::new(),
        }
    }

    /// Park a task until the given phase comes around.
    pub fn schedule(&mut self, phase: FramePhase, task: T) {
        match phase {
            FramePhase::EndOfFrame => self.end_of_frame.push(task),
            FramePhase::FixedStep | FramePhase::AfterSteps(0) => self.fixed_step.push(task),
            FramePhase::AfterSteps(steps) => self.multi_step.push((steps, task)),
        }
    }

    /// Take everything due at the end of the current frame.
    #[must_use]
    pub fn drain_end_of_frame(&mut self) -> Vec<T> {
        std::mem::take(&mut self.end_of_frame)
    }

    /// Take everything due at this fixed step, aging multi-step tasks.
    #[must_use]
    pub fn drain_fixed_step(&mut self) -> Vec<T> {
        let mut due = std::mem::take(&mut self.fixed_step);
        let mut waiting = Vec::with_capacity(self.multi_step.len());
        for (steps, task) in self.multi_step.drain(..) {
            if steps <= 1 {
                due.push(task);
            } else {
                waiting.push((steps - 1, task));
            }
        }
        self.multi_step = waiting;
        due
    }

    /// Number of parked tasks across all phases.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.end_of_frame.len() + self.fixed_step.len() + self.multi_step.len()
    }

    /// Check whether nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Drop every parked task.
    pub fn clear(&mut self) {
        self.end_of_frame.clear();
        self.fixed_step.clear();
        self.multi_step.clear();
    }
}
