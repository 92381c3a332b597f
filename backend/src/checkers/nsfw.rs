use std::sync::Arc;

use shared::SafetyResult;

use super::{CheckerError, SafetyDetector, round_to};
use crate::ingest::CanonicalImage;
use crate::inference::LabelScorer;

pub const NSFW_LABEL: &str = "nsfw";
pub const DEFAULT_NSFW_THRESHOLD: f32 = 0.7;

/// Flags images whose `nsfw` label probability reaches the threshold.
pub struct NsfwDetector {
    scorer: Arc<dyn LabelScorer>,
    threshold: f32,
    version: String,
}

impl NsfwDetector {
    pub fn new(scorer: Arc<dyn LabelScorer>, threshold: f32, version: impl Into<String>) -> Self {
        Self {
            scorer,
            threshold,
            version: version.into(),
        }
    }
}

impl SafetyDetector for NsfwDetector {
    fn version(&self) -> &str {
        &self.version
    }

    fn detect(&self, image: &CanonicalImage) -> Result<SafetyResult, CheckerError> {
        let nsfw_score = self
            .scorer
            .scores(image)?
            .into_iter()
            .find(|s| s.label.eq_ignore_ascii_case(NSFW_LABEL))
            .map(|s| s.score)
            .unwrap_or(0.0);

        let rounded = round_to(nsfw_score, 4);
        if nsfw_score < self.threshold {
            return Ok(SafetyResult::safe(rounded));
        }

        log::debug!("NSFW score {:.4} >= threshold {}", nsfw_score, self.threshold);
        Ok(SafetyResult::flagged(
            rounded,
            format!("NSFW score {:.2}", nsfw_score),
        ))
    }
}
