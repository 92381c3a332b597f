//! Label-scoring backends behind the NSFW detector and the domain classifier.

use std::sync::Arc;

use crate::checkers::CheckerError;
use crate::ingest::CanonicalImage;

mod lazy;
#[cfg(feature = "torch")]
mod torch;

pub use lazy::LazyScorer;
#[cfg(feature = "torch")]
pub use torch::{TorchScriptLoader, TorchScriptScorer};

#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Image -> per-label probabilities. Must be safe for concurrent calls.
pub trait LabelScorer: Send + Sync {
    fn scores(&self, image: &CanonicalImage) -> Result<Vec<LabelScore>, CheckerError>;
}

/// Acquires a heavyweight scorer (model weights, compute session).
pub trait ScorerLoader: Send + Sync {
    fn describe(&self) -> String;

    fn load(&self) -> Result<Arc<dyn LabelScorer>, CheckerError>;
}

/// Stand-in for backends this binary was built without.
pub struct UnavailableLoader {
    model: String,
    reason: String,
}

impl UnavailableLoader {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

impl ScorerLoader for UnavailableLoader {
    fn describe(&self) -> String {
        format!("unavailable backend for {}", self.model)
    }

    fn load(&self) -> Result<Arc<dyn LabelScorer>, CheckerError> {
        Err(CheckerError::BackendUnavailable(format!(
            "{}: {}",
            self.model, self.reason
        )))
    }
}

/// Sorts by descending score and keeps at most `top_k` entries.
pub fn rank(mut scores: Vec<LabelScore>, top_k: usize) -> Vec<LabelScore> {
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores.truncate(top_k);
    scores
}
