use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Outcome of a gate. A rejection always carries the reason shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GateVerdict {
    Accepted,
    Rejected { reason: String },
}

impl GateVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateVerdict::Accepted)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            GateVerdict::Accepted => None,
            GateVerdict::Rejected { reason } => Some(reason),
        }
    }
}

/// Image quality assessment. `score` is normalized to [0, 1], 1.0 being the best.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub score: f32,
    pub verdict: GateVerdict,
}

impl QualityResult {
    pub fn accepted(score: f32) -> Self {
        Self {
            score,
            verdict: GateVerdict::Accepted,
        }
    }

    pub fn rejected(score: f32, reason: impl Into<String>) -> Self {
        Self {
            score,
            verdict: GateVerdict::Rejected {
                reason: reason.into(),
            },
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.verdict.is_accepted()
    }

    pub fn reason(&self) -> Option<&str> {
        self.verdict.reason()
    }
}

/// NSFW safety check. `nsfw_score` is in [0, 1], 1.0 meaning definitely unsafe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyResult {
    pub nsfw_score: f32,
    pub verdict: GateVerdict,
}

impl SafetyResult {
    pub fn safe(nsfw_score: f32) -> Self {
        Self {
            nsfw_score,
            verdict: GateVerdict::Accepted,
        }
    }

    pub fn flagged(nsfw_score: f32, reason: impl Into<String>) -> Self {
        Self {
            nsfw_score,
            verdict: GateVerdict::Rejected {
                reason: reason.into(),
            },
        }
    }

    pub fn is_safe(&self) -> bool {
        self.verdict.is_accepted()
    }

    pub fn reason(&self) -> Option<&str> {
        self.verdict.reason()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
}

impl Prediction {
    pub fn new(label: impl Into<String>, probability: f32, risk_level: Option<RiskLevel>) -> Self {
        Self {
            label: label.into(),
            probability,
            risk_level,
        }
    }
}

/// Domain classification output. Predictions are ranked, highest confidence first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassificationResult {
    pub detected: bool,
    pub predictions: Vec<Prediction>,
    pub description: String,
    pub urgency: Option<String>,
}
