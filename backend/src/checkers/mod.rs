//! Capability contracts for the three pipeline stages and their concrete backends.

use shared::{ClassificationResult, QualityResult, SafetyResult};

use crate::ingest::CanonicalImage;

mod blur;
mod noop;
mod nsfw;
mod skin;

pub use blur::{DEFAULT_BLUR_THRESHOLD, LaplacianBlurChecker, laplacian_variance};
pub use noop::PermissiveSafety;
pub use nsfw::{DEFAULT_NSFW_THRESHOLD, NSFW_LABEL, NsfwDetector};
pub use skin::{DEFAULT_TOP_K, SkinLesionClassifier, risk_for_label, urgency_for_risk};

#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),
    #[error("Inference error: {0}")]
    Inference(String),
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Image quality gate. Deterministic for a given image and configuration.
pub trait QualityChecker: Send + Sync {
    fn version(&self) -> &str;

    fn check(&self, image: &CanonicalImage) -> Result<QualityResult, CheckerError>;
}

/// NSFW safety gate.
pub trait SafetyDetector: Send + Sync {
    fn version(&self) -> &str;

    fn detect(&self, image: &CanonicalImage) -> Result<SafetyResult, CheckerError>;
}

/// Domain-specific classifier (skin lesions for the bundled backend).
pub trait DomainClassifier: Send + Sync {
    fn version(&self) -> &str;

    fn classify(&self, image: &CanonicalImage) -> Result<ClassificationResult, CheckerError>;
}

pub(crate) fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}
