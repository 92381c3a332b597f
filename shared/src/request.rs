use serde::{Deserialize, Serialize};

/// Upper bound on the number of images accepted by one batch request.
pub const MAX_BATCH_SIZE: usize = 50;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Where the bytes of a single image come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Base64(&'a str),
    Url(&'a str),
}

impl AnalyzeRequest {
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self {
            image_base64: Some(data.into()),
            image_url: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            image_base64: None,
            image_url: Some(url.into()),
        }
    }

    /// Picks the embedded payload over the URL when both are set. Empty strings count as absent.
    pub fn source(&self) -> Option<ImageSource<'_>> {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.trim().is_empty())
        }

        if let Some(data) = non_empty(&self.image_base64) {
            return Some(ImageSource::Base64(data));
        }
        non_empty(&self.image_url).map(ImageSource::Url)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BatchAnalyzeRequest {
    pub images: Vec<AnalyzeRequest>,
}
