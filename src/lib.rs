pub mod config;
pub mod features;
pub mod guard;
pub mod models;
pub mod persistence;

// Re-export commonly used types
pub use config::{Config, GuardConfig};
pub use features::{FeatureExtractor, FeaturePolicy};
pub use guard::{ClassifierGuard, ClassifierModel, Guard, LinearModel, ThresholdBlocker};
pub use models::{BlockState, FeatureVector, LoginEvent, Outcome, RejectionRecord, Verdict};
pub use persistence::{EventStore, PersistenceError, SqliteEventStore};
