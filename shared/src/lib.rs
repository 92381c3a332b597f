mod request;
mod response;
mod results;

pub use request::{AnalyzeRequest, BatchAnalyzeRequest, ImageSource, MAX_BATCH_SIZE};
pub use response::{
    AnalysisStatus, AnalyzeResponse, BatchAnalyzeResponse, DISCLAIMER, STAGE_CLASSIFIER,
    STAGE_QUALITY, STAGE_SAFETY,
};
pub use results::{
    ClassificationResult, GateVerdict, Prediction, QualityResult, RiskLevel, SafetyResult,
};
