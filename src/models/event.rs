use std::net::IpAddr;
use serde::{Deserialize, Serialize};

/// Result of a credential evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure)
    }

    /// Database encoding (1 = success, 0 = failure).
    pub fn as_i64(&self) -> i64 {
        match self {
            Outcome::Success => 1,
            Outcome::Failure => 0,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Outcome::Success),
            0 => Some(Outcome::Failure),
            _ => None,
        }
    }
}

/// One credential-evaluated login attempt. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub identifier: String,
    pub outcome: Outcome,
    /// UTC unix seconds.
    pub timestamp: i64,
    pub source_address: Option<IpAddr>,
}

impl LoginEvent {
    pub fn new(
        identifier: impl Into<String>,
        outcome: Outcome,
        timestamp: i64,
        source_address: Option<IpAddr>,
    ) -> Self {
        LoginEvent {
            identifier: identifier.into(),
            outcome,
            timestamp,
            source_address,
        }
    }
}

/// Lockout state for an identifier, recomputed from history on every
/// decision and never cached across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Blocked { remaining_seconds: i64 },
}

/// Guard decision for one inbound attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Attempt may proceed to credential evaluation.
    Proceed,
    /// Identifier is inside an active lockout window.
    RejectBlocked { remaining_seconds: i64 },
    /// The classifier flagged the attempt pattern as attack-like.
    RejectAnomalous,
}

/// Numeric summary of an identifier's attempt history.
///
/// `time_span_seconds` is zero whenever fewer than two events were
/// considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureVector {
    pub attempt_count: u64,
    pub time_span_seconds: u64,
}

impl FeatureVector {
    pub const EMPTY: FeatureVector = FeatureVector {
        attempt_count: 0,
        time_span_seconds: 0,
    };

    /// Model input representation.
    pub fn as_f64(&self) -> [f64; 2] {
        [self.attempt_count as f64, self.time_span_seconds as f64]
    }
}

/// Audit record for an attempt the guard rejected without evaluating
/// credentials. Kept separate from login events so rejections never
/// feed back into the failure count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub identifier: String,
    pub reason: String,
    pub source_address: String,
    pub timestamp: i64,
    pub detail: String,
}

impl RejectionRecord {
    pub fn blocked(
        identifier: &str,
        remaining_seconds: i64,
        timestamp: i64,
        source_address: Option<IpAddr>,
    ) -> Self {
        RejectionRecord {
            identifier: identifier.to_string(),
            reason: "blocked".to_string(),
            source_address: source_address.map(|ip| ip.to_string()).unwrap_or_default(),
            timestamp,
            detail: format!(
                "Identifier '{}' rejected during active lockout ({} seconds remaining).",
                identifier, remaining_seconds
            ),
        }
    }

    pub fn anomalous(identifier: &str, timestamp: i64, source_address: Option<IpAddr>) -> Self {
        RejectionRecord {
            identifier: identifier.to_string(),
            reason: "anomalous".to_string(),
            source_address: source_address.map(|ip| ip.to_string()).unwrap_or_default(),
            timestamp,
            detail: format!(
                "Identifier '{}' rejected by the attempt-pattern classifier.",
                identifier
            ),
        }
    }
}
