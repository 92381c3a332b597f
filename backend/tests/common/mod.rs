#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, RgbImage};
use lensforge::checkers::{
    CheckerError, DomainClassifier, QualityChecker, SafetyDetector,
};
use lensforge::ingest::{CanonicalImage, ImageLoader};
use lensforge::pipeline::AnalysisPipeline;
use lensforge::service::{AnalysisService, BatchLimits};
use shared::{ClassificationResult, Prediction, QualityResult, RiskLevel, SafetyResult};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([180, 130, 100])))
}

pub fn jpeg_b64(width: u32, height: u32) -> String {
    STANDARD.encode(encode(rgb(width, height), ImageFormat::Jpeg))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(rgb(width, height), ImageFormat::Png)
}

pub fn canonical(width: u32, height: u32) -> CanonicalImage {
    CanonicalImage::normalize(rgb(width, height), 1024)
}

pub struct FakeQuality {
    result: QualityResult,
    pub calls: AtomicUsize,
}

impl FakeQuality {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            result: QualityResult::accepted(0.9),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn blurry() -> Arc<Self> {
        Arc::new(Self {
            result: QualityResult::rejected(0.1, "Too blurry"),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QualityChecker for FakeQuality {
    fn version(&self) -> &str {
        "mock-quality-1.0"
    }

    fn check(&self, _image: &CanonicalImage) -> Result<QualityResult, CheckerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

pub struct FakeSafety {
    result: SafetyResult,
    pub calls: AtomicUsize,
}

impl FakeSafety {
    pub fn safe() -> Arc<Self> {
        Arc::new(Self {
            result: SafetyResult::safe(0.05),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unsafe_content() -> Arc<Self> {
        Arc::new(Self {
            result: SafetyResult::flagged(0.92, "NSFW content"),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SafetyDetector for FakeSafety {
    fn version(&self) -> &str {
        "mock-nsfw-1.0"
    }

    fn detect(&self, _image: &CanonicalImage) -> Result<SafetyResult, CheckerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

pub enum Behavior {
    Return(ClassificationResult),
    Fail,
    /// Panics for images of this width, returns the benign result otherwise.
    PanicOnWidth(u32),
}

pub struct FakeClassifier {
    behavior: Behavior,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn benign() -> Arc<Self> {
        Self::with(Behavior::Return(benign_result()))
    }

    pub fn melanoma() -> Arc<Self> {
        Self::with(Behavior::Return(ClassificationResult {
            detected: true,
            predictions: vec![
                Prediction::new("mel", 0.78, Some(RiskLevel::High)),
                Prediction::new("nv", 0.15, Some(RiskLevel::Low)),
            ],
            description: "Top prediction: mel (78.0%)".to_string(),
            urgency: Some("Consult dermatologist within days".to_string()),
        }))
    }

    pub fn with(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn benign_result() -> ClassificationResult {
    ClassificationResult {
        detected: true,
        predictions: vec![
            Prediction::new("nv", 0.87, Some(RiskLevel::Low)),
            Prediction::new("mel", 0.08, Some(RiskLevel::High)),
        ],
        description: "Top prediction: nv (87.0%)".to_string(),
        urgency: Some("Monitor, no immediate urgency".to_string()),
    }
}

impl DomainClassifier for FakeClassifier {
    fn version(&self) -> &str {
        "mock-skin-1.0"
    }

    fn classify(&self, image: &CanonicalImage) -> Result<ClassificationResult, CheckerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Return(result) => Ok(result.clone()),
            Behavior::Fail => Err(CheckerError::Inference("CUDA out of memory".to_string())),
            Behavior::PanicOnWidth(width) if image.width() == *width => {
                panic!("classifier crashed")
            }
            Behavior::PanicOnWidth(_) => Ok(benign_result()),
        }
    }
}

pub fn pipeline(
    quality: &Arc<FakeQuality>,
    safety: &Arc<FakeSafety>,
    classifier: &Arc<FakeClassifier>,
) -> AnalysisPipeline {
    AnalysisPipeline::new(quality.clone(), safety.clone(), classifier.clone())
}

pub fn service(
    quality: &Arc<FakeQuality>,
    safety: &Arc<FakeSafety>,
    classifier: &Arc<FakeClassifier>,
) -> AnalysisService {
    AnalysisService::new(
        ImageLoader::with_max_size(1024).unwrap(),
        Arc::new(pipeline(quality, safety, classifier)),
        BatchLimits::default(),
    )
}
