use std::sync::Arc;

use shared::{ClassificationResult, Prediction, RiskLevel};

use super::{CheckerError, DomainClassifier, round_to};
use crate::ingest::CanonicalImage;
use crate::inference::{LabelScorer, rank};

pub const DEFAULT_TOP_K: usize = 5;

/// HAM10000 / ISIC lesion codes to risk.
pub fn risk_for_label(label: &str) -> Option<RiskLevel> {
    match label {
        "mel" | "bcc" => Some(RiskLevel::High),
        "akiec" => Some(RiskLevel::Moderate),
        "df" | "nv" | "bkl" | "vasc" => Some(RiskLevel::Low),
        _ => None,
    }
}

pub fn urgency_for_risk(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::High => "Consult dermatologist within days",
        RiskLevel::Moderate => "Consult dermatologist within weeks",
        RiskLevel::Low => "Monitor, no immediate urgency",
    }
}

/// Skin lesion classifier over a ViT fine-tuned on HAM10000.
pub struct SkinLesionClassifier {
    scorer: Arc<dyn LabelScorer>,
    top_k: usize,
    version: String,
}

impl SkinLesionClassifier {
    /// `model_name` is a hub-style id such as `Anwarkh1/Skin_Cancer-Image_Classification`;
    /// its last segment becomes part of the version.
    pub fn new(scorer: Arc<dyn LabelScorer>, model_name: &str, top_k: usize) -> Self {
        let short_name = model_name.rsplit('/').next().unwrap_or(model_name);
        Self {
            scorer,
            top_k,
            version: format!("vit-skin-{}", short_name),
        }
    }
}

impl DomainClassifier for SkinLesionClassifier {
    fn version(&self) -> &str {
        &self.version
    }

    fn classify(&self, image: &CanonicalImage) -> Result<ClassificationResult, CheckerError> {
        let predictions: Vec<Prediction> = rank(self.scorer.scores(image)?, self.top_k)
            .into_iter()
            .map(|s| {
                let risk = risk_for_label(&s.label);
                Prediction::new(s.label, round_to(s.score, 4), risk)
            })
            .collect();

        // A scorer that returns nothing has not seen a lesion; report it as not detected
        // rather than claiming a detection with no label behind it.
        let Some(top) = predictions.first() else {
            return Ok(ClassificationResult {
                detected: false,
                predictions,
                description: "No prediction".to_string(),
                urgency: None,
            });
        };

        Ok(ClassificationResult {
            detected: true,
            description: format!(
                "Top prediction: {} ({:.1}%)",
                top.label,
                top.probability * 100.0
            ),
            urgency: top.risk_level.map(|r| urgency_for_risk(r).to_string()),
            predictions,
        })
    }
}
