use std::sync::Arc;
use std::time::Duration;

use crate::checkers::{
    CheckerError, DomainClassifier, LaplacianBlurChecker, NsfwDetector, PermissiveSafety,
    SafetyDetector, SkinLesionClassifier,
};
use crate::config::{AppConfig, ComputeDevice, ConfigError, ModelConfig, SafetyBackend};
use crate::inference::LazyScorer;
use crate::ingest::ImageLoader;
use crate::pipeline::AnalysisPipeline;
use crate::service::{AnalysisService, BatchLimits};

/// Composition root: everything the HTTP layer needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    service: AnalysisService,
    scorers: Vec<Arc<LazyScorer>>,
}

impl AppState {
    pub fn new(service: AnalysisService) -> Self {
        Self {
            service,
            scorers: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let loader = ImageLoader::new(
            config.ingest.max_image_size,
            Duration::from_secs(config.ingest.fetch_timeout_secs),
            config.ingest.max_payload_bytes,
        )
        .map_err(|e| ConfigError::Invalid(format!("image loader: {}", e)))?;

        let mut scorers = Vec::new();

        let quality = Arc::new(LaplacianBlurChecker::new(config.quality.blur_threshold));

        let safety: Arc<dyn SafetyDetector> = match config.safety.backend {
            SafetyBackend::TorchScript => {
                let scorer = build_scorer(&config.safety.model, config.device);
                scorers.push(scorer.clone());
                Arc::new(NsfwDetector::new(
                    scorer,
                    config.safety.threshold,
                    config.safety.version.clone(),
                ))
            }
            SafetyBackend::Disabled => {
                log::warn!("NSFW safety gate is disabled");
                Arc::new(PermissiveSafety::new())
            }
        };

        let classifier_scorer = build_scorer(&config.classifier.model, config.device);
        scorers.push(classifier_scorer.clone());
        let classifier: Arc<dyn DomainClassifier> = Arc::new(SkinLesionClassifier::new(
            classifier_scorer,
            &config.classifier.model.name,
            config.classifier.top_k,
        ));

        let pipeline = Arc::new(AnalysisPipeline::new(quality, safety, classifier));
        log::info!("Pipeline versions: {:?}", pipeline.model_versions());
        for scorer in &scorers {
            log::info!("Registered {}", scorer.describe());
        }

        let limits = BatchLimits {
            max_items: config.batch.max_items,
            concurrency: config.batch.concurrency,
        };

        Ok(Self {
            service: AnalysisService::new(loader, pipeline, limits),
            scorers,
        })
    }

    pub fn service(&self) -> &AnalysisService {
        &self.service
    }

    /// Loads every lazily-acquired model now instead of on the first request.
    pub fn warm_up(&self) -> Result<(), CheckerError> {
        for scorer in &self.scorers {
            scorer.warm_up()?;
        }
        Ok(())
    }
}

#[cfg(feature = "torch")]
fn build_scorer(model: &ModelConfig, device: ComputeDevice) -> Arc<LazyScorer> {
    use crate::inference::TorchScriptLoader;

    Arc::new(LazyScorer::new(TorchScriptLoader::new(model.clone(), device)))
}

#[cfg(not(feature = "torch"))]
fn build_scorer(model: &ModelConfig, device: ComputeDevice) -> Arc<LazyScorer> {
    use crate::inference::UnavailableLoader;

    log::debug!("{} requested on {} without TorchScript support", model.name, device);
    Arc::new(LazyScorer::new(UnavailableLoader::new(
        model.describe(),
        "lensforge was built without the `torch` feature",
    )))
}
