use actix_web::web;
use futures::stream::{self, StreamExt};
use shared::{AnalyzeRequest, AnalyzeResponse, ImageSource};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::checkers::CheckerError;
use crate::ingest::{ImageLoader, IngestError};
use crate::pipeline::AnalysisPipeline;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Provide image_base64 or image_url")]
    MissingImageSource,
    #[error("Invalid image URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Batch contains {count} images (max {max})")]
    BatchTooLarge { count: usize, max: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Checker(#[from] CheckerError),
    #[error("Analysis worker failed: {0}")]
    Blocking(String),
}

#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub max_items: usize,
    pub concurrency: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_items: shared::MAX_BATCH_SIZE,
            concurrency: 4,
        }
    }
}

/// Ingestion plus pipeline, for one request or a batch of them.
#[derive(Clone)]
pub struct AnalysisService {
    loader: ImageLoader,
    pipeline: Arc<AnalysisPipeline>,
    limits: BatchLimits,
}

impl AnalysisService {
    pub fn new(loader: ImageLoader, pipeline: Arc<AnalysisPipeline>, limits: BatchLimits) -> Self {
        Self {
            loader,
            pipeline,
            limits,
        }
    }

    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    /// Validates, ingests and analyzes one image. Base64 decoding, image decoding and the
    /// pipeline run on the blocking thread pool; only the URL fetch stays on the async side.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, AnalyzeError> {
        let payload = match OwnedSource::from_request(request)? {
            OwnedSource::Embedded(data) => Payload::Encoded(data),
            OwnedSource::Remote(raw) => {
                let url = parse_image_url(&raw)?;
                Payload::Fetched(self.loader.fetch(url.as_str()).await?)
            }
        };

        let loader = self.loader.clone();
        let pipeline = self.pipeline.clone();
        web::block(move || -> Result<AnalyzeResponse, AnalyzeError> {
            let image = match payload {
                Payload::Encoded(data) => loader.load_base64(&data)?,
                Payload::Fetched(bytes) => loader.load_bytes(&bytes)?,
            };
            Ok(pipeline.analyze(&image)?)
        })
        .await
        .map_err(|e| AnalyzeError::Blocking(e.to_string()))?
    }

    /// Analyzes every item independently. A failing item becomes an `error` entry in its
    /// own slot; results stay index-aligned with `requests`.
    pub async fn analyze_batch(
        &self,
        requests: Vec<AnalyzeRequest>,
    ) -> Result<Vec<AnalyzeResponse>, ValidationError> {
        if requests.len() > self.limits.max_items {
            return Err(ValidationError::BatchTooLarge {
                count: requests.len(),
                max: self.limits.max_items,
            });
        }

        let batch_id = Uuid::new_v4();
        log::info!("Batch {}: analyzing {} images", batch_id, requests.len());

        let results: Vec<AnalyzeResponse> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| async move {
                match self.analyze(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        log::warn!("Batch {} item {} failed: {}", batch_id, index, e);
                        AnalyzeResponse::error(e.to_string())
                    }
                }
            })
            .buffered(self.limits.concurrency.max(1))
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        log::info!(
            "Batch {}: {} of {} images classified",
            batch_id,
            succeeded,
            results.len()
        );
        Ok(results)
    }
}

enum OwnedSource {
    Embedded(String),
    Remote(String),
}

/// Bytes handed to the blocking pool.
enum Payload {
    Encoded(String),
    Fetched(Vec<u8>),
}

impl OwnedSource {
    fn from_request(request: AnalyzeRequest) -> Result<Self, ValidationError> {
        let embedded = match request.source() {
            Some(ImageSource::Base64(_)) => true,
            Some(ImageSource::Url(_)) => false,
            None => return Err(ValidationError::MissingImageSource),
        };
        Ok(if embedded {
            OwnedSource::Embedded(request.image_base64.unwrap_or_default())
        } else {
            OwnedSource::Remote(request.image_url.unwrap_or_default())
        })
    }
}

fn parse_image_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {:?}", other))),
    }
}
