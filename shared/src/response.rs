use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

use crate::results::Prediction;

/// Attached verbatim to every success and rejection.
pub const DISCLAIMER: &str =
    "This is NOT a medical diagnosis. See a qualified specialist. AI output only.";

pub const STAGE_QUALITY: &str = "nn1_quality";
pub const STAGE_SAFETY: &str = "nn1_safety";
pub const STAGE_CLASSIFIER: &str = "nn2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisStatus {
    Success,
    RejectedQuality,
    RejectedNsfw,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: AnalysisStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub lesion_detected: Option<bool>,
    #[serde(default)]
    pub main_description: Option<String>,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub disclaimer: String,
    #[serde(default)]
    pub inference_time_ms: u64,
    #[serde(default)]
    pub model_versions: BTreeMap<String, String>,
}

impl AnalyzeResponse {
    /// Early exit from one of the gates.
    pub fn rejected(
        status: AnalysisStatus,
        reason: Option<String>,
        inference_time_ms: u64,
        model_versions: BTreeMap<String, String>,
    ) -> Self {
        Self {
            status,
            reason,
            lesion_detected: None,
            main_description: None,
            predictions: Vec::new(),
            urgency: None,
            disclaimer: DISCLAIMER.to_string(),
            inference_time_ms,
            model_versions,
        }
    }

    /// Per-item failure entry. Carries no disclaimer, versions or timing.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Error,
            reason: Some(reason.into()),
            lesion_detected: None,
            main_description: None,
            predictions: Vec::new(),
            urgency: None,
            disclaimer: String::new(),
            inference_time_ms: 0,
            model_versions: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AnalysisStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalyzeResponse {
    pub results: Vec<AnalyzeResponse>,
}
