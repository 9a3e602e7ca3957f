//! Classifier layer for attack-like attempt patterns
//!
//! Applies a pre-trained binary model to summary features of an
//! identifier's history. This layer is a best-effort heuristic on top
//! of the threshold rule: every internal error is recovered as
//! "not anomalous" so the classifier can never become an availability
//! hazard on its own.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureExtractor;
use crate::models::FeatureVector;
use crate::persistence::{EventStore, PersistenceError};

/// Errors raised by model loading and inference
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A pre-trained binary classifier over feature vectors
///
/// Loaded once at process start and immutable for the process
/// lifetime. Training is out of scope; only inference is specified.
pub trait ClassifierModel: Send + Sync {
    /// Predict a label for the features: 0 = benign, 1 = attack.
    fn predict(&self, features: &FeatureVector) -> Result<u8, InferenceError>;
}

/// Linear decision rule over (attempt_count, time_span_seconds)
///
/// Emits label 1 when `weights . features + bias > 0`. The default
/// weights flag rapid bursts: many attempts compressed into a short
/// span score positive, the same attempts spread out do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: [f64; 2],
    pub bias: f64,
}

impl LinearModel {
    pub fn new(weights: [f64; 2], bias: f64) -> Self {
        LinearModel { weights, bias }
    }

    /// Load a model artifact (JSON) from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InferenceError> {
        let contents = std::fs::read_to_string(path)?;
        let model: LinearModel = serde_json::from_str(&contents)?;
        Ok(model)
    }
}

impl Default for LinearModel {
    fn default() -> Self {
        LinearModel {
            weights: [1.0, -0.1],
            bias: -6.0,
        }
    }
}

impl ClassifierModel for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<u8, InferenceError> {
        let [count, span] = features.as_f64();
        let score = self.weights[0] * count + self.weights[1] * span + self.bias;
        if !score.is_finite() {
            return Err(InferenceError::Artifact(format!(
                "Non-finite decision value for features ({}, {})",
                count, span
            )));
        }
        Ok(if score > 0.0 { 1 } else { 0 })
    }
}

#[derive(Error, Debug)]
enum ClassifierError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Flags anomalous attempt patterns for an identifier
pub struct ClassifierGuard {
    store: Arc<dyn EventStore>,
    model: Arc<dyn ClassifierModel>,
    extractor: FeatureExtractor,
}

impl ClassifierGuard {
    pub fn new(
        store: Arc<dyn EventStore>,
        model: Arc<dyn ClassifierModel>,
        extractor: FeatureExtractor,
    ) -> Self {
        ClassifierGuard {
            store,
            model,
            extractor,
        }
    }

    /// Whether the identifier's attempt pattern looks like an attack.
    ///
    /// Any internal error (store query, inference) is logged and
    /// recovered as `false`; the threshold rule is the hard backstop.
    pub fn is_anomalous(&self, identifier: &str) -> bool {
        match self.classify(identifier) {
            Ok(label) => label == 1,
            Err(e) => {
                log::warn!(
                    "Classifier unavailable for '{}', treating attempt as benign: {}",
                    identifier,
                    e
                );
                false
            }
        }
    }

    fn classify(&self, identifier: &str) -> Result<u8, ClassifierError> {
        let history = self.store.query(identifier, None)?;
        let features = self.extractor.extract(&history);
        Ok(self.model.predict(&features)?)
    }
}
