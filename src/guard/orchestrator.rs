//! Guard orchestrator
//!
//! Combines the threshold blocker and the classifier into one verdict
//! per inbound attempt, and records credential-evaluated outcomes back
//! into the event log. The caller performs the actual credential
//! comparison only when the verdict is `Proceed`, and must report the
//! result via `record_outcome`.

use std::net::IpAddr;
use std::sync::Arc;

use crate::config::GuardConfig;
use crate::features::FeatureExtractor;
use crate::guard::{ClassifierGuard, ClassifierModel, ThresholdBlocker};
use crate::models::{BlockState, LoginEvent, Outcome, RejectionRecord, Verdict};
use crate::persistence::{EventStore, PersistenceError};

/// Per-attempt decision pipeline: threshold first, classifier second.
pub struct Guard {
    store: Arc<dyn EventStore>,
    blocker: ThresholdBlocker,
    classifier: ClassifierGuard,
}

impl Guard {
    pub fn new(
        config: &GuardConfig,
        store: Arc<dyn EventStore>,
        model: Arc<dyn ClassifierModel>,
    ) -> Self {
        let extractor = FeatureExtractor::new(config.feature_policy, config.failure_threshold);
        let blocker = ThresholdBlocker::new(
            Arc::clone(&store),
            config.window_seconds,
            config.failure_threshold,
        );
        let classifier = ClassifierGuard::new(Arc::clone(&store), model, extractor);

        Guard {
            store,
            blocker,
            classifier,
        }
    }

    /// Decide whether the attempt may proceed to credential evaluation.
    ///
    /// Short-circuits in order: an active lockout wins over the
    /// classifier. Neither rejection appends a login event; rejected
    /// attempts are written to the separate audit log, best-effort.
    /// A store failure during the threshold check is fatal for the
    /// request (fail-closed); classifier failures are not.
    pub fn evaluate(
        &self,
        identifier: &str,
        now: i64,
        source_address: Option<IpAddr>,
    ) -> Result<Verdict, PersistenceError> {
        if let BlockState::Blocked { remaining_seconds } = self.blocker.check(identifier, now)? {
            log::warn!(
                "Rejected attempt for '{}': locked out for {} more second(s)",
                identifier,
                remaining_seconds
            );
            self.audit(RejectionRecord::blocked(
                identifier,
                remaining_seconds,
                now,
                source_address,
            ));
            return Ok(Verdict::RejectBlocked { remaining_seconds });
        }

        if self.classifier.is_anomalous(identifier) {
            log::warn!("Rejected attempt for '{}': attempt pattern flagged as attack-like", identifier);
            self.audit(RejectionRecord::anomalous(identifier, now, source_address));
            return Ok(Verdict::RejectAnomalous);
        }

        Ok(Verdict::Proceed)
    }

    /// Record the credential-evaluated outcome of a proceeded attempt.
    ///
    /// Appends exactly one login event. On append failure the error
    /// propagates and the caller must treat the attempt as
    /// indeterminate, never reporting success on an unrecorded event.
    pub fn record_outcome(
        &self,
        identifier: &str,
        success: bool,
        now: i64,
        source_address: Option<IpAddr>,
    ) -> Result<(), PersistenceError> {
        let outcome = if success { Outcome::Success } else { Outcome::Failure };
        self.store
            .append(&LoginEvent::new(identifier, outcome, now, source_address))
    }

    /// Best-effort rejection audit; failure to audit never fails the request.
    fn audit(&self, record: RejectionRecord) {
        if let Err(e) = self.store.record_rejection(&record) {
            log::warn!("Failed to audit rejection for '{}': {}", record.identifier, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeaturePolicy;
    use crate::guard::LinearModel;
    use crate::persistence::SqliteEventStore;

    fn config(window_seconds: i64, failure_threshold: usize) -> GuardConfig {
        GuardConfig {
            window_seconds,
            failure_threshold,
            feature_policy: FeaturePolicy::AllEvents,
        }
    }

    fn guard_with_store(window_seconds: i64, failure_threshold: usize) -> (Guard, Arc<SqliteEventStore>) {
        let store = Arc::new(SqliteEventStore::in_memory().unwrap());
        let guard = Guard::new(
            &config(window_seconds, failure_threshold),
            Arc::clone(&store) as Arc<dyn EventStore>,
            Arc::new(LinearModel::default()),
        );
        (guard, store)
    }

    #[test]
    fn test_unknown_identifier_proceeds() {
        let (guard, _store) = guard_with_store(60, 3);
        assert_eq!(guard.evaluate("bob", 100, None).unwrap(), Verdict::Proceed);
    }

    #[test]
    fn test_lockout_scenario() {
        let (guard, _store) = guard_with_store(60, 3);

        for t in [0, 10, 20] {
            assert_eq!(guard.evaluate("alice", t, None).unwrap(), Verdict::Proceed);
            guard.record_outcome("alice", false, t, None).unwrap();
        }

        assert_eq!(
            guard.evaluate("alice", 25, None).unwrap(),
            Verdict::RejectBlocked { remaining_seconds: 35 }
        );

        // Free again once the oldest of the three failures has left
        // the window
        assert_eq!(guard.evaluate("alice", 81, None).unwrap(), Verdict::Proceed);
    }

    #[test]
    fn test_rejection_appends_no_event() {
        let (guard, store) = guard_with_store(60, 3);

        for t in [0, 10, 20] {
            guard.record_outcome("alice", false, t, None).unwrap();
        }
        assert_eq!(store.query("alice", None).unwrap().len(), 3);

        // Rejected-while-blocked attempts must not extend the window
        for now in 25..30 {
            assert!(matches!(
                guard.evaluate("alice", now, None).unwrap(),
                Verdict::RejectBlocked { .. }
            ));
        }
        assert_eq!(store.query("alice", None).unwrap().len(), 3);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let (guard, _store) = guard_with_store(60, 3);
        for t in [0, 10, 20] {
            guard.record_outcome("alice", false, t, None).unwrap();
        }

        let first = guard.evaluate("alice", 25, None).unwrap();
        let second = guard.evaluate("alice", 25, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_anomalous_pattern_rejected_without_event() {
        // Threshold too high to trigger, so the classifier decides:
        // ten failures in nine seconds is a burst
        let (guard, store) = guard_with_store(60, 100);
        for t in 0..10 {
            guard.record_outcome("mallory", false, t, None).unwrap();
        }

        assert_eq!(guard.evaluate("mallory", 15, None).unwrap(), Verdict::RejectAnomalous);
        assert_eq!(store.query("mallory", None).unwrap().len(), 10);
    }

    #[test]
    fn test_rejections_are_audited() {
        let (guard, store) = guard_with_store(60, 3);
        for t in [0, 10, 20] {
            guard.record_outcome("alice", false, t, None).unwrap();
        }

        guard.evaluate("alice", 25, "10.0.0.9".parse().ok()).unwrap();

        let rejections = store.recent_rejections(10).unwrap();
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].identifier, "alice");
        assert_eq!(rejections[0].reason, "blocked");
        assert_eq!(rejections[0].source_address, "10.0.0.9");
    }

    #[test]
    fn test_record_outcome_appends_exactly_one_event() {
        let (guard, store) = guard_with_store(60, 3);

        assert_eq!(guard.evaluate("alice", 100, None).unwrap(), Verdict::Proceed);
        guard.record_outcome("alice", true, 100, None).unwrap();

        let history = store.query("alice", None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, Outcome::Success);
    }

    #[test]
    fn test_record_outcome_propagates_append_failure() {
        struct FailingStore;

        impl EventStore for FailingStore {
            fn append(&self, _event: &LoginEvent) -> Result<(), PersistenceError> {
                Err(PersistenceError::InvalidData("disk full".to_string()))
            }

            fn query(&self, _identifier: &str, _since: Option<i64>) -> Result<Vec<LoginEvent>, PersistenceError> {
                Ok(Vec::new())
            }

            fn record_rejection(&self, _record: &RejectionRecord) -> Result<(), PersistenceError> {
                Ok(())
            }

            fn recent_rejections(&self, _limit: usize) -> Result<Vec<RejectionRecord>, PersistenceError> {
                Ok(Vec::new())
            }

            fn prune_before(&self, _before_timestamp: i64) -> Result<usize, PersistenceError> {
                Ok(0)
            }

            fn clear_all(&self) -> Result<(), PersistenceError> {
                Ok(())
            }
        }

        let guard = Guard::new(
            &config(60, 3),
            Arc::new(FailingStore),
            Arc::new(LinearModel::default()),
        );

        assert!(guard.record_outcome("alice", true, 100, None).is_err());
    }

    #[test]
    fn test_concurrent_outcomes_all_recorded() {
        let (guard, store) = guard_with_store(60, 3);
        let guard = Arc::new(guard);

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let guard = Arc::clone(&guard);
                std::thread::spawn(move || {
                    guard.record_outcome("carol", false, 1000 + i, None).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.query("carol", None).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
