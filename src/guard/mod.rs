pub mod classifier;
pub mod orchestrator;
pub mod threshold;

pub use classifier::{ClassifierGuard, ClassifierModel, InferenceError, LinearModel};
pub use orchestrator::Guard;
pub use threshold::ThresholdBlocker;
