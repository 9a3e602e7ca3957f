pub mod event;

pub use event::{BlockState, FeatureVector, LoginEvent, Outcome, RejectionRecord, Verdict};
