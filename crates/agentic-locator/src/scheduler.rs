//! Search pacing: deadline, cancellation and host yield points.
//!
//! The search engine only knows how to run a bounded batch of dequeues. A
//! [`Scheduler`] decides, between batches, whether to stop and how to hand
//! control back to its host. [`ClockScheduler`] stops on a [`SearchClock`];
//! [`crate::SearchEngine::run`] drives it in a tight loop and
//! [`crate::SearchEngine::run_yielding`] awaits a host yield after every
//! checkpoint.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Dequeues between two checkpoints.
pub const DEFAULT_YIELD_EVERY: usize = 100;

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The exploration queue emptied.
    Exhausted,
    /// The time budget ran out.
    Deadline,
    /// The request was cancelled.
    Cancelled,
}

/// Wall-clock deadline plus a cancellation token.
#[derive(Debug, Clone)]
pub struct SearchClock {
    started: Instant,
    deadline: Instant,
    cancel: CancellationToken,
}

impl SearchClock {
    pub fn new(budget: Duration, cancel: CancellationToken) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + budget,
            cancel,
        }
    }

    /// A clock that is only stopped by its deadline.
    pub fn with_budget(budget: Duration) -> Self {
        Self::new(budget, CancellationToken::new())
    }

    /// `Some` when the search must stop now.
    pub fn check(&self) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            Some(StopReason::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(StopReason::Deadline)
        } else {
            None
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Host integration for the search loop.
pub trait Scheduler {
    /// Dequeues to run between two checkpoints.
    fn yield_every(&self) -> usize {
        DEFAULT_YIELD_EVERY
    }

    /// Called between batches. Return a reason to stop; otherwise yield to the
    /// host (if it has anything to run) and return `None`.
    fn checkpoint(&mut self) -> Option<StopReason>;
}

/// Checks only the clock between batches.
#[derive(Debug, Clone)]
pub struct ClockScheduler {
    clock: SearchClock,
    yield_every: usize,
}

impl ClockScheduler {
    pub fn new(clock: SearchClock) -> Self {
        Self {
            clock,
            yield_every: DEFAULT_YIELD_EVERY,
        }
    }

    pub fn with_yield_every(mut self, dequeues: usize) -> Self {
        self.yield_every = dequeues.max(1);
        self
    }

    pub fn clock(&self) -> &SearchClock {
        &self.clock
    }
}

impl Scheduler for ClockScheduler {
    fn yield_every(&self) -> usize {
        self.yield_every
    }

    fn checkpoint(&mut self) -> Option<StopReason> {
        self.clock.check()
    }
}
