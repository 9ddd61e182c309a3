use ndarray::Array4;
use std::path::PathBuf;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use super::PredictError;
use crate::config::{DeviceChoice, ModelConfig, OutputKind, TensorLayout};

/// A forward pass over a single-item NHWC batch, returning one score per class.
pub trait Infer: Send + Sync {
    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, PredictError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to load model from {path}: {source}")]
    Load {
        path: PathBuf,
        source: tch::TchError,
    },
}

/// TorchScript classifier loaded once at startup.
pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
    layout: TensorLayout,
    output: OutputKind,
}

impl TorchModel {
    pub fn load(config: &ModelConfig, layout: TensorLayout) -> Result<Self, ModelError> {
        let device = match config.device {
            DeviceChoice::Auto => Device::cuda_if_available(),
            DeviceChoice::Cpu => Device::Cpu,
            DeviceChoice::Cuda => Device::Cuda(0),
        };

        let mut module = CModule::load_on_device(&config.path, device).map_err(|source| {
            ModelError::Load {
                path: config.path.clone(),
                source,
            }
        })?;
        module.set_eval();

        Ok(Self {
            module: Mutex::new(module),
            device,
            layout,
            output: config.output,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl Infer for TorchModel {
    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, PredictError> {
        let tensor = to_tensor(input, self.layout)?.to_device(self.device);

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| PredictError::Inference("model lock poisoned".into()))?;
            tch::no_grad(|| module.forward_ts(&[tensor]))?
        };

        let output = match self.output {
            OutputKind::Logits => output.softmax(-1, Kind::Float),
            OutputKind::Probabilities => output,
        };

        let output_flat = output.to_kind(Kind::Float).to_device(Device::Cpu).view([-1]);
        let num_elements = output_flat.numel();
        let mut output_vec = vec![0.0f32; num_elements];
        output_flat.f_copy_data(&mut output_vec, num_elements)?;
        Ok(output_vec)
    }
}

fn to_tensor(input: &Array4<f32>, layout: TensorLayout) -> Result<Tensor, PredictError> {
    let data = input
        .as_slice()
        .ok_or_else(|| PredictError::Shape("input batch is not contiguous".into()))?;
    let (n, h, w, c) = input.dim();
    let tensor = Tensor::from_slice(data).view([n as i64, h as i64, w as i64, c as i64]);

    Ok(match layout {
        TensorLayout::Nhwc => tensor,
        TensorLayout::Nchw => tensor.permute([0, 3, 1, 2]).contiguous(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Array4<f32> {
        Array4::from_shape_fn((1, 2, 3, 3), |(_, y, x, c)| (y * 100 + x * 10 + c) as f32)
    }

    #[test]
    fn nhwc_tensor_keeps_layout() {
        let tensor = to_tensor(&batch(), TensorLayout::Nhwc).unwrap();
        assert_eq!(tensor.size(), vec![1, 2, 3, 3]);
        assert_eq!(tensor.double_value(&[0, 1, 2, 1]), 121.0);
    }

    #[test]
    fn nchw_tensor_moves_channels_first() {
        let tensor = to_tensor(&batch(), TensorLayout::Nchw).unwrap();
        assert_eq!(tensor.size(), vec![1, 3, 2, 3]);
        assert_eq!(tensor.double_value(&[0, 1, 1, 2]), 121.0);
    }

    #[test]
    fn missing_artifact_fails_to_load() {
        let config = ModelConfig {
            path: PathBuf::from("does/not/exist.pt"),
            device: DeviceChoice::Cpu,
            output: OutputKind::Probabilities,
            input_range: [0.0, 1.0],
        };
        let result = TorchModel::load(&config, TensorLayout::Nhwc);
        assert!(matches!(result, Err(ModelError::Load { .. })));
    }
}
