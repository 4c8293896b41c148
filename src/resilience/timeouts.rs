//! Deadline enforcement for one logical dispatch.
//!
//! # Responsibilities
//! - Bound the total wall time of a dispatch (attempts plus backoff sleeps)
//! - Race each suspension point against the same deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A missing deadline means unbounded; the future is awaited as-is
//! - Dropping the surrounding future cancels whatever is in flight

use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Marker returned when the deadline fired before the future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineElapsed;

/// Absolute deadline for a dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    budget: Option<Duration>,
}

impl Deadline {
    /// Start a deadline of `budget` from now, or an unbounded one.
    pub fn starting_now(budget: Option<Duration>) -> Self {
        Self {
            at: budget.map(|b| Instant::now() + b),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self { at: None, budget: None }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Await `fut`, giving up when the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineElapsed> {
        match self.at {
            Some(at) => timeout_at(at, fut).await.map_err(|_| DeadlineElapsed),
            None => Ok(fut.await),
        }
    }
}
