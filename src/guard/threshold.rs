//! Sliding-window threshold lockout
//!
//! Counts recent failures per identifier and derives the lockout
//! state. The state is recomputed from the event log on every check;
//! nothing is cached between requests, so there is no stale-window
//! state to invalidate.

use std::sync::Arc;

use crate::models::BlockState;
use crate::persistence::{EventStore, PersistenceError};

/// Deterministic block/unblock decision over a trailing failure window.
pub struct ThresholdBlocker {
    store: Arc<dyn EventStore>,
    /// Window duration W in seconds.
    window_seconds: i64,
    /// Failure count T that triggers a lockout.
    failure_threshold: usize,
}

impl ThresholdBlocker {
    pub fn new(store: Arc<dyn EventStore>, window_seconds: i64, failure_threshold: usize) -> Self {
        ThresholdBlocker {
            store,
            window_seconds,
            failure_threshold,
        }
    }

    /// Compute the lockout state for an identifier at time `now`.
    ///
    /// The window `[now - W, now]` is closed at both ends: a failure
    /// exactly at `now - W` still counts. With failures `f_1 <= ... <= f_n`
    /// in the window and `n >= T`, the remaining lockout is the time
    /// until the Tth-most-recent failure leaves the window:
    /// `W - (now - f_{n-T+1})`, floored at zero.
    ///
    /// Read-only with respect to the store; a blocked identifier's
    /// attempt is never appended as an event.
    pub fn check(&self, identifier: &str, now: i64) -> Result<BlockState, PersistenceError> {
        let window_start = now - self.window_seconds;
        let history = self.store.query(identifier, Some(window_start))?;

        let failures: Vec<i64> = history
            .iter()
            .filter(|e| e.outcome.is_failure() && e.timestamp <= now)
            .map(|e| e.timestamp)
            .collect();

        if failures.len() < self.failure_threshold {
            return Ok(BlockState::Free);
        }

        let anchor = failures[failures.len() - self.failure_threshold];
        let remaining = (self.window_seconds - (now - anchor)).max(0);

        Ok(BlockState::Blocked {
            remaining_seconds: remaining,
        })
    }
}
