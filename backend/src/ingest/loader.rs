use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use std::time::Duration;

use super::canonical::CanonicalImage;

pub const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];
pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 1024;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid base64 data: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Unsupported image format: {0}")]
    Format(String),
    #[error("Image fetch failed: {0}")]
    Fetch(String),
    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

/// Turns base64 payloads or remote URLs into [`CanonicalImage`]s.
#[derive(Clone)]
pub struct ImageLoader {
    max_size: u32,
    max_payload_bytes: usize,
    client: reqwest::Client,
}

impl ImageLoader {
    pub fn new(
        max_size: u32,
        fetch_timeout: Duration,
        max_payload_bytes: usize,
    ) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| IngestError::Fetch(e.to_string()))?;

        Ok(Self {
            max_size,
            max_payload_bytes,
            client,
        })
    }

    pub fn with_max_size(max_size: u32) -> Result<Self, IngestError> {
        Self::new(max_size, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_PAYLOAD_BYTES)
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Decodes a base64 string, optionally wrapped as a `data:` URI.
    pub fn decode_base64(&self, data: &str) -> Result<Vec<u8>, IngestError> {
        let payload = strip_data_uri(data.trim());
        let bytes = if payload.contains(|c: char| c.is_ascii_whitespace()) {
            let compact: String = payload.split_ascii_whitespace().collect();
            STANDARD.decode(compact)?
        } else {
            STANDARD.decode(payload)?
        };
        self.check_size(bytes.len())?;
        Ok(bytes)
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError> {
        log::debug!("Fetching image from {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| IngestError::Fetch(e.to_string()))?;

        if let Some(length) = response.content_length() {
            self.check_size(usize::try_from(length).unwrap_or(usize::MAX))?;
        }

        // Chunked bodies carry no length; stop reading once the cap is crossed.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| IngestError::Fetch(e.to_string()))?
        {
            self.check_size(body.len() + chunk.len())?;
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    /// Validates the format against [`SUPPORTED_FORMATS`], decodes and normalizes.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<CanonicalImage, IngestError> {
        if bytes.is_empty() {
            return Err(IngestError::Format("empty payload".to_string()));
        }

        let format =
            image::guess_format(bytes).map_err(|e| IngestError::Format(e.to_string()))?;
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(IngestError::Format(format_name(format)));
        }

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| IngestError::Format(e.to_string()))?;

        Ok(CanonicalImage::normalize(decoded, self.max_size))
    }

    pub fn load_base64(&self, data: &str) -> Result<CanonicalImage, IngestError> {
        let bytes = self.decode_base64(data)?;
        self.load_bytes(&bytes)
    }

    pub async fn load_url(&self, url: &str) -> Result<CanonicalImage, IngestError> {
        let bytes = self.fetch(url).await?;
        self.load_bytes(&bytes)
    }

    fn check_size(&self, size: usize) -> Result<(), IngestError> {
        if size > self.max_payload_bytes {
            return Err(IngestError::TooLarge {
                size,
                max: self.max_payload_bytes,
            });
        }
        Ok(())
    }
}

fn strip_data_uri(data: &str) -> &str {
    if data.starts_with("data:") {
        if let Some((_, payload)) = data.split_once(";base64,") {
            return payload;
        }
    }
    data
}

fn format_name(format: ImageFormat) -> String {
    format!("{:?}", format).to_uppercase()
}
