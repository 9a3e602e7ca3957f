//! Persistence module for the login event log
//!
//! This module defines the storage contract the guard depends on.
//! The guard core never touches a concrete storage engine directly;
//! everything goes through the `EventStore` trait.

pub mod sqlite_store;

pub use sqlite_store::SqliteEventStore;

use crate::models::{LoginEvent, RejectionRecord};
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),
}

/// Trait for login event log backends
///
/// Implementations must serialize concurrent appends so that `query`
/// never observes a partial write. Appends for different identifiers
/// are independent; serializing all appends satisfies the contract.
pub trait EventStore: Send + Sync {
    // =====================
    // Login Event Log
    // =====================

    /// Durably record one login event. Must not fail silently; the
    /// orchestrator treats a failed append as fatal for the request.
    fn append(&self, event: &LoginEvent) -> Result<(), PersistenceError>;

    /// Attempt history for an identifier, ordered by timestamp
    /// ascending with ties broken by insertion order.
    ///
    /// `since` is a closed lower bound (`timestamp >= since`). An
    /// unknown identifier yields an empty history, never an error.
    fn query(&self, identifier: &str, since: Option<i64>) -> Result<Vec<LoginEvent>, PersistenceError>;

    /// Count of failure events for an identifier at or after `since`.
    fn failure_count_since(&self, identifier: &str, since: i64) -> Result<usize, PersistenceError> {
        Ok(self
            .query(identifier, Some(since))?
            .iter()
            .filter(|e| e.outcome.is_failure())
            .count())
    }

    // =====================
    // Rejection Audit Log
    // =====================

    /// Record an attempt the guard rejected without credential
    /// evaluation. Rejections live in their own table and never count
    /// toward the failure window.
    fn record_rejection(&self, record: &RejectionRecord) -> Result<(), PersistenceError>;

    /// Most recent rejections, newest first.
    fn recent_rejections(&self, limit: usize) -> Result<Vec<RejectionRecord>, PersistenceError>;

    // =====================
    // Maintenance
    // =====================

    /// Remove events and rejections older than the given timestamp.
    ///
    /// Retention policy is external to the guard; this is only the
    /// mechanism.
    fn prune_before(&self, before_timestamp: i64) -> Result<usize, PersistenceError>;

    /// Clear all data (useful for testing)
    fn clear_all(&self) -> Result<(), PersistenceError>;
}
