use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::checkers::{DEFAULT_BLUR_THRESHOLD, DEFAULT_NSFW_THRESHOLD, DEFAULT_TOP_K};
use crate::ingest::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_SIZE, DEFAULT_MAX_PAYLOAD_BYTES};

pub const DEFAULT_CONFIG_PATH: &str = "config/lensforge.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value:?}")]
    Env { key: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where inference runs. Parsed from `cpu`, `cuda`, `cuda:N` or `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComputeDevice {
    Cpu,
    Cuda(usize),
    Auto,
}

impl FromStr for ComputeDevice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cpu" => Ok(ComputeDevice::Cpu),
            "cuda" | "gpu" => Ok(ComputeDevice::Cuda(0)),
            "auto" => Ok(ComputeDevice::Auto),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(ComputeDevice::Cuda)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown device {:?}", s))),
        }
    }
}

impl TryFrom<String> for ComputeDevice {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComputeDevice> for String {
    fn from(device: ComputeDevice) -> Self {
        device.to_string()
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Cpu => write!(f, "cpu"),
            ComputeDevice::Cuda(index) => write!(f, "cuda:{}", index),
            ComputeDevice::Auto => write!(f, "auto"),
        }
    }
}

/// Known safety gate implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyBackend {
    TorchScript,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: ComputeDevice,
    pub preload_models: bool,
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub quality: QualityConfig,
    pub safety: SafetyConfig,
    pub classifier: ClassifierConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_image_size: u32,
    pub fetch_timeout_secs: u64,
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub blur_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub backend: SafetyBackend,
    pub threshold: f32,
    pub version: String,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub top_k: usize,
    pub model: ModelConfig,
}

/// Exported image classification model and its preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub path: String,
    pub labels: Vec<String>,
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_norm")]
    pub mean: [f32; 3],
    #[serde(default = "default_norm")]
    pub std: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_items: usize,
    pub concurrency: usize,
}

impl ModelConfig {
    pub fn describe(&self) -> String {
        format!("{} from {} ({} labels)", self.name, self.path, self.labels.len())
    }
}

fn default_input_size() -> u32 {
    224
}

fn default_norm() -> [f32; 3] {
    [0.5, 0.5, 0.5]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: ComputeDevice::Cpu,
            preload_models: true,
            server: ServerConfig::default(),
            ingest: IngestConfig::default(),
            quality: QualityConfig::default(),
            safety: SafetyConfig::default(),
            classifier: ClassifierConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            backend: SafetyBackend::TorchScript,
            threshold: DEFAULT_NSFW_THRESHOLD,
            version: "falconsai-nsfw-vit-1.0".to_string(),
            model: ModelConfig {
                name: "Falconsai/nsfw_image_detection".to_string(),
                path: "models/nsfw_image_detection.pt".to_string(),
                labels: vec!["normal".to_string(), "nsfw".to_string()],
                input_size: default_input_size(),
                mean: default_norm(),
                std: default_norm(),
            },
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            model: ModelConfig {
                name: "Anwarkh1/Skin_Cancer-Image_Classification".to_string(),
                path: "models/skin_cancer_vit.pt".to_string(),
                labels: ["akiec", "bcc", "bkl", "df", "mel", "nv", "vasc"]
                    .iter()
                    .map(|l| l.to_string())
                    .collect(),
                input_size: default_input_size(),
                mean: default_norm(),
                std: default_norm(),
            },
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_items: shared::MAX_BATCH_SIZE,
            concurrency: 4,
        }
    }
}

impl AppConfig {
    /// Reads `.env`, then the YAML file named by `LENSFORGE_CONFIG` (if it exists),
    /// then environment overrides, and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path =
            std::env::var("LENSFORGE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            log::info!("Loading configuration from {}", path);
            Self::from_yaml_file(&path)?
        } else {
            log::info!("No configuration file at {}, using defaults", path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(config_str)?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(device) = lookup("LENSFORGE_DEVICE") {
            self.device = device.parse().map_err(|_| ConfigError::Env {
                key: "LENSFORGE_DEVICE".to_string(),
                value: device,
            })?;
        }
        if let Some(threshold) = parse_var(&lookup, "LENSFORGE_QUALITY_BLUR_THRESHOLD")? {
            self.quality.blur_threshold = threshold;
        }
        if let Some(threshold) = parse_var(&lookup, "LENSFORGE_NSFW_THRESHOLD")? {
            self.safety.threshold = threshold;
        }
        self.apply_classifier_override(&lookup)?;
        if let Some(max_size) = parse_var(&lookup, "LENSFORGE_MAX_IMAGE_SIZE")? {
            self.ingest.max_image_size = max_size;
        }
        if let Some(preload) = parse_var(&lookup, "LENSFORGE_PRELOAD_MODELS")? {
            self.preload_models = preload;
        }
        Ok(())
    }

    /// The model name is reported as provenance, so it may only change together with
    /// the weights it names. Labels are optional and replace the configured list.
    fn apply_classifier_override<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = lookup("LENSFORGE_CLASSIFIER_MODEL");
        let path = lookup("LENSFORGE_CLASSIFIER_MODEL_PATH");
        match (name, path) {
            (Some(name), Some(path)) => {
                self.classifier.model.name = name;
                self.classifier.model.path = path;
            }
            (Some(_), None) => {
                return Err(ConfigError::Invalid(
                    "LENSFORGE_CLASSIFIER_MODEL requires LENSFORGE_CLASSIFIER_MODEL_PATH".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "LENSFORGE_CLASSIFIER_MODEL_PATH requires LENSFORGE_CLASSIFIER_MODEL".to_string(),
                ));
            }
            (None, None) => {}
        }

        if let Some(raw) = lookup("LENSFORGE_CLASSIFIER_LABELS") {
            let labels: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            if labels.is_empty() {
                return Err(ConfigError::Env {
                    key: "LENSFORGE_CLASSIFIER_LABELS".to_string(),
                    value: raw,
                });
            }
            self.classifier.model.labels = labels;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let blur = self.quality.blur_threshold;
        if !blur.is_finite() || blur <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "quality.blur_threshold must be positive, got {}",
                blur
            )));
        }
        let nsfw = self.safety.threshold;
        if !(nsfw > 0.0 && nsfw <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "safety.threshold must be in (0, 1], got {}",
                nsfw
            )));
        }
        if self.ingest.max_image_size == 0 {
            return Err(ConfigError::Invalid(
                "ingest.max_image_size must be greater than 0".to_string(),
            ));
        }
        if self.batch.max_items == 0 || self.batch.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "batch.max_items and batch.concurrency must be greater than 0".to_string(),
            ));
        }
        if self.classifier.top_k == 0 {
            return Err(ConfigError::Invalid(
                "classifier.top_k must be greater than 0".to_string(),
            ));
        }
        let models = [
            ("safety", &self.safety.model),
            ("classifier", &self.classifier.model),
        ];
        for (section, model) in models {
            if model.labels.is_empty() || model.input_size == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{}.model needs labels and a non-zero input_size",
                    section
                )));
            }
            if model.std.iter().any(|s| *s == 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{}.model.std must not contain zero",
                    section
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
