use std::sync::Arc;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use super::{LabelScore, LabelScorer, ScorerLoader};
use crate::checkers::CheckerError;
use crate::config::{ComputeDevice, ModelConfig};
use crate::ingest::CanonicalImage;

impl From<tch::TchError> for CheckerError {
    fn from(err: tch::TchError) -> Self {
        CheckerError::Inference(err.to_string())
    }
}

fn to_tch_device(device: ComputeDevice) -> Device {
    match device {
        ComputeDevice::Cpu => Device::Cpu,
        ComputeDevice::Cuda(index) => Device::Cuda(index),
        ComputeDevice::Auto => Device::cuda_if_available(),
    }
}

/// TorchScript image classifier exported with a softmax-able logits head.
pub struct TorchScriptScorer {
    model: Mutex<CModule>,
    device: Device,
    labels: Vec<String>,
    input_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl TorchScriptScorer {
    pub fn load(config: &ModelConfig, device: ComputeDevice) -> Result<Self, CheckerError> {
        let device = to_tch_device(device);
        log::info!("Loading {} from {} on {:?}", config.name, config.path, device);

        let model = CModule::load_on_device(&config.path, device)
            .map_err(|e| CheckerError::ModelLoad(format!("{}: {}", config.path, e)))?;

        Ok(Self {
            model: Mutex::new(model),
            device,
            labels: config.labels.clone(),
            input_size: config.input_size,
            mean: config.mean,
            std: config.std,
        })
    }

    fn preprocess(&self, image: &CanonicalImage) -> Tensor {
        let size = self.input_size;
        let resized = image::imageops::resize(
            image.as_rgb(),
            size,
            size,
            image::imageops::FilterType::Triangle,
        );

        let plane = (size * size) as usize;
        let mut data = vec![0f32; 3 * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                let value = f32::from(pixel.0[c]) / 255.0;
                // CHW layout
                data[c * plane + i] = (value - self.mean[c]) / self.std[c];
            }
        }

        Tensor::from_slice(&data)
            .view([1, 3, i64::from(size), i64::from(size)])
            .to_device(self.device)
    }
}

impl LabelScorer for TorchScriptScorer {
    fn scores(&self, image: &CanonicalImage) -> Result<Vec<LabelScore>, CheckerError> {
        let input = self.preprocess(image);
        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| CheckerError::Inference("model lock poisoned".to_string()))?;
            model.forward_ts(&[input])?
        };

        let probs = output
            .softmax(-1, Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = probs.size()[0] as usize;
        if num_elements != self.labels.len() {
            return Err(CheckerError::Inference(format!(
                "model produced {} scores for {} labels",
                num_elements,
                self.labels.len()
            )));
        }

        let mut output_vec = vec![0.0f32; num_elements];
        probs.copy_data(&mut output_vec, num_elements);

        Ok(self
            .labels
            .iter()
            .zip(output_vec)
            .map(|(label, score)| LabelScore::new(label.clone(), score))
            .collect())
    }
}

pub struct TorchScriptLoader {
    config: ModelConfig,
    device: ComputeDevice,
}

impl TorchScriptLoader {
    pub fn new(config: ModelConfig, device: ComputeDevice) -> Self {
        Self { config, device }
    }
}

impl ScorerLoader for TorchScriptLoader {
    fn describe(&self) -> String {
        format!("TorchScript model {}", self.config.describe())
    }

    fn load(&self) -> Result<Arc<dyn LabelScorer>, CheckerError> {
        Ok(Arc::new(TorchScriptScorer::load(&self.config, self.device)?))
    }
}
