use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use shared::{
    AnalysisStatus, AnalyzeResponse, DISCLAIMER, GateVerdict, STAGE_CLASSIFIER, STAGE_QUALITY,
    STAGE_SAFETY,
};

use crate::checkers::{CheckerError, DomainClassifier, QualityChecker, SafetyDetector};
use crate::ingest::CanonicalImage;

/// Quality gate, then safety gate, then domain classification.
///
/// Stages run strictly in that order and a rejecting gate ends the run, so the
/// classifier only ever sees images that passed both gates. Checker errors are
/// returned untouched; translating them is up to the caller.
pub struct AnalysisPipeline {
    quality: Arc<dyn QualityChecker>,
    safety: Arc<dyn SafetyDetector>,
    classifier: Arc<dyn DomainClassifier>,
}

impl AnalysisPipeline {
    pub fn new(
        quality: Arc<dyn QualityChecker>,
        safety: Arc<dyn SafetyDetector>,
        classifier: Arc<dyn DomainClassifier>,
    ) -> Self {
        Self {
            quality,
            safety,
            classifier,
        }
    }

    pub fn model_versions(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (STAGE_QUALITY.to_string(), self.quality.version().to_string()),
            (STAGE_SAFETY.to_string(), self.safety.version().to_string()),
            (STAGE_CLASSIFIER.to_string(), self.classifier.version().to_string()),
        ])
    }

    pub fn analyze(&self, image: &CanonicalImage) -> Result<AnalyzeResponse, CheckerError> {
        let start = Instant::now();
        let versions = self.model_versions();

        let quality = self.quality.check(image)?;
        warn_if_out_of_range(STAGE_QUALITY, quality.score);
        if let GateVerdict::Rejected { reason } = quality.verdict {
            log::info!("Rejected by quality gate (score={}): {}", quality.score, reason);
            return Ok(AnalyzeResponse::rejected(
                AnalysisStatus::RejectedQuality,
                Some(reason),
                elapsed_ms(start),
                versions,
            ));
        }

        let safety = self.safety.detect(image)?;
        warn_if_out_of_range(STAGE_SAFETY, safety.nsfw_score);
        if let GateVerdict::Rejected { reason } = safety.verdict {
            log::info!("Rejected by safety gate (nsfw_score={}): {}", safety.nsfw_score, reason);
            return Ok(AnalyzeResponse::rejected(
                AnalysisStatus::RejectedNsfw,
                Some(reason),
                elapsed_ms(start),
                versions,
            ));
        }

        let classification = self.classifier.classify(image)?;
        log::debug!(
            "Classified {}x{} image: {}",
            image.width(),
            image.height(),
            classification.description
        );

        Ok(AnalyzeResponse {
            status: AnalysisStatus::Success,
            reason: None,
            lesion_detected: Some(classification.detected),
            main_description: Some(classification.description),
            predictions: classification.predictions,
            urgency: classification.urgency,
            disclaimer: DISCLAIMER.to_string(),
            inference_time_ms: elapsed_ms(start),
            model_versions: versions,
        })
    }
}

/// Whole milliseconds on the monotonic clock, truncated.
fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// Scores are passed through as reported.
fn warn_if_out_of_range(stage: &str, score: f32) {
    if !(0.0..=1.0).contains(&score) {
        log::warn!("{} reported score {} outside [0, 1]", stage, score);
    }
}
