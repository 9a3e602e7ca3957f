//! Feature extraction for the attempt-pattern classifier
//!
//! Turns an identifier's attempt history into the fixed-arity
//! `FeatureVector` the classifier consumes. Extraction is a pure
//! function of the history slice; it never touches the store.

use serde::{Deserialize, Serialize};

use crate::models::{FeatureVector, LoginEvent};

/// Which slice of the history feeds the feature vector.
///
/// The source variants disagreed on this, so it is an explicit
/// configuration choice rather than a baked-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeaturePolicy {
    /// Every recorded event for the identifier.
    AllEvents,
    /// Failure events only.
    FailuresOnly,
    /// The most recent N failures (N = failure threshold).
    LastNFailures,
}

/// Derives feature vectors from attempt histories under a fixed policy.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    policy: FeaturePolicy,
    /// N for `LastNFailures`; ignored by the other policies.
    last_n: usize,
}

impl FeatureExtractor {
    pub fn new(policy: FeaturePolicy, last_n: usize) -> Self {
        FeatureExtractor { policy, last_n }
    }

    pub fn policy(&self) -> FeaturePolicy {
        self.policy
    }

    /// Extract features from a history ordered by timestamp ascending.
    ///
    /// Empty considered slice yields (0, 0); a single event yields
    /// (1, 0). The span is `latest - earliest` in whole seconds.
    pub fn extract(&self, history: &[LoginEvent]) -> FeatureVector {
        let timestamps: Vec<i64> = match self.policy {
            FeaturePolicy::AllEvents => history.iter().map(|e| e.timestamp).collect(),
            FeaturePolicy::FailuresOnly => history
                .iter()
                .filter(|e| e.outcome.is_failure())
                .map(|e| e.timestamp)
                .collect(),
            FeaturePolicy::LastNFailures => {
                let failures: Vec<i64> = history
                    .iter()
                    .filter(|e| e.outcome.is_failure())
                    .map(|e| e.timestamp)
                    .collect();
                let skip = failures.len().saturating_sub(self.last_n);
                failures[skip..].to_vec()
            }
        };

        match (timestamps.first(), timestamps.last()) {
            (Some(&earliest), Some(&latest)) => FeatureVector {
                attempt_count: timestamps.len() as u64,
                time_span_seconds: (latest - earliest).max(0) as u64,
            },
            _ => FeatureVector::EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;

    fn event(outcome: Outcome, timestamp: i64) -> LoginEvent {
        LoginEvent::new("alice", outcome, timestamp, None)
    }

    #[test]
    fn test_empty_history_yields_zeroes() {
        let extractor = FeatureExtractor::new(FeaturePolicy::AllEvents, 3);
        assert_eq!(extractor.extract(&[]), FeatureVector::EMPTY);
    }

    #[test]
    fn test_single_event_has_zero_span() {
        let extractor = FeatureExtractor::new(FeaturePolicy::AllEvents, 3);
        let fv = extractor.extract(&[event(Outcome::Failure, 1000)]);
        assert_eq!(fv.attempt_count, 1);
        assert_eq!(fv.time_span_seconds, 0);
    }

    #[test]
    fn test_all_events_policy_counts_successes() {
        let extractor = FeatureExtractor::new(FeaturePolicy::AllEvents, 3);
        let history = [
            event(Outcome::Failure, 100),
            event(Outcome::Success, 130),
            event(Outcome::Failure, 160),
        ];
        let fv = extractor.extract(&history);
        assert_eq!(fv.attempt_count, 3);
        assert_eq!(fv.time_span_seconds, 60);
    }

    #[test]
    fn test_failures_only_policy_skips_successes() {
        let extractor = FeatureExtractor::new(FeaturePolicy::FailuresOnly, 3);
        let history = [
            event(Outcome::Failure, 100),
            event(Outcome::Success, 130),
            event(Outcome::Failure, 160),
        ];
        let fv = extractor.extract(&history);
        assert_eq!(fv.attempt_count, 2);
        assert_eq!(fv.time_span_seconds, 60);
    }

    #[test]
    fn test_failures_only_with_no_failures_is_empty() {
        let extractor = FeatureExtractor::new(FeaturePolicy::FailuresOnly, 3);
        let fv = extractor.extract(&[event(Outcome::Success, 100)]);
        assert_eq!(fv, FeatureVector::EMPTY);
    }

    #[test]
    fn test_last_n_failures_keeps_most_recent() {
        let extractor = FeatureExtractor::new(FeaturePolicy::LastNFailures, 2);
        let history = [
            event(Outcome::Failure, 100),
            event(Outcome::Failure, 200),
            event(Outcome::Failure, 290),
        ];
        let fv = extractor.extract(&history);
        assert_eq!(fv.attempt_count, 2);
        assert_eq!(fv.time_span_seconds, 90);
    }

    #[test]
    fn test_last_n_larger_than_history_takes_everything() {
        let extractor = FeatureExtractor::new(FeaturePolicy::LastNFailures, 10);
        let history = [event(Outcome::Failure, 100), event(Outcome::Failure, 150)];
        let fv = extractor.extract(&history);
        assert_eq!(fv.attempt_count, 2);
        assert_eq!(fv.time_span_seconds, 50);
    }
}
