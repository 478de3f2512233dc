pub mod labels;
pub mod preprocess;

pub use labels::LabelSet;

use crate::error::{Error, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, Module};
use image::DynamicImage;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// One ranked class for an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub index: usize,
    pub confidence: f32,
}

/// Read-only, loaded model shared by every request handler.
///
/// Implementations must tolerate concurrent `predict` calls.
pub trait Predictor: Send + Sync {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction>;

    fn labels(&self) -> &LabelSet;
}

/// Feed-forward classification head stored as safetensors.
///
/// Tensors are `layers.{i}.weight` `[out, in]` and `layers.{i}.bias` `[out]`,
/// applied in order with ReLU between layers. The first layer consumes a
/// normalized `3 x side x side` image flattened channel-major.
pub struct Classifier {
    layers: Vec<Linear>,
    labels: LabelSet,
    input_side: usize,
    device: Device,
}

impl Classifier {
    pub fn load(path: &Path, labels: LabelSet, device: Device) -> Result<Self> {
        tracing::info!("Loading model from: {:?}", path);

        if labels.is_empty() {
            return Err(Error::ModelLoadFailed("Label set is empty".to_string()));
        }

        let tensors = match candle_core::safetensors::load(path, &device) {
            Ok(tensors) => tensors,
            Err(e) => {
                return Err(match foreign_format(path) {
                    Some(format) => incompatible(path, format, &e),
                    None => Error::ModelLoadFailed(format!("Failed to read safetensors: {}", e)),
                });
            }
        };

        let (layers, shapes) = build_layers(&tensors)?;

        let input_features = shapes[0].1;
        let input_side = input_side(input_features)?;

        let classes = shapes[shapes.len() - 1].0;
        if classes != labels.len() {
            return Err(Error::ModelLoadFailed(format!(
                "Model predicts {} classes but the label set has {}",
                classes,
                labels.len()
            )));
        }

        tracing::info!("Model loaded successfully");
        tracing::info!("  Layers: {}", layers.len());
        tracing::info!("  Input: 3x{}x{}", input_side, input_side);
        tracing::info!("  Classes: {}", classes);

        Ok(Self {
            layers,
            labels,
            input_side,
            device,
        })
    }

    /// Top `k` classes, most confident first. Ties keep label order.
    pub fn rank(&self, image: &DynamicImage, k: usize) -> Result<Vec<Prediction>> {
        let probabilities = self.probabilities(image)?;

        let mut scored: Vec<(usize, f32)> = probabilities.into_iter().enumerate().collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(k)
            .map(|(index, confidence)| {
                let label = self.labels.get(index).ok_or_else(|| {
                    Error::InferenceError(format!("No label for class index {}", index))
                })?;
                Ok(Prediction {
                    label: label.to_string(),
                    index,
                    confidence,
                })
            })
            .collect()
    }

    pub fn input_side(&self) -> usize {
        self.input_side
    }

    fn probabilities(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let mut xs = preprocess::to_input(image, self.input_side, &self.device)?;

        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs).map_err(inference_error)?;
            if i < last {
                xs = xs.relu().map_err(inference_error)?;
            }
        }

        candle_nn::ops::softmax(&xs, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(inference_error)
    }
}

impl Predictor for Classifier {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        self.rank(image, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::InferenceError("Model produced no scores".to_string()))
    }

    fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

fn inference_error(e: candle_core::Error) -> Error {
    Error::InferenceError(e.to_string())
}

/// Name the serializer of an artifact that failed to parse as safetensors.
///
/// Only consulted after a failed load: a safetensors file starts with its
/// header length, which can collide with these magic bytes.
fn foreign_format(path: &Path) -> Option<&'static str> {
    let mut magic = [0u8; 4];
    let read = std::fs::File::open(path)
        .and_then(|mut file| file.read(&mut magic))
        .ok()?;

    match &magic[..read] {
        [b'P', b'K', 0x03, 0x04] => Some("a PyTorch zip archive (torch.save)"),
        [0x80, 2..=5, ..] => Some("a Python pickle"),
        _ => None,
    }
}

fn incompatible(path: &Path, format: &str, cause: &candle_core::Error) -> Error {
    tracing::error!("Model artifact {:?} is {}: {}", path, format, cause);

    Error::IncompatibleRuntime(format!(
        "\n\nThis model was exported as {} and cannot be loaded by this server.\n\n\
         Export the trained classification head to safetensors \
         (layers.N.weight / layers.N.bias) and publish the new file. \
         Delete {:?} before restarting, or it will be reused as-is.",
        format, path
    ))
}

fn build_layers(tensors: &HashMap<String, Tensor>) -> Result<(Vec<Linear>, Vec<(usize, usize)>)> {
    let mut layers = Vec::new();
    let mut shapes: Vec<(usize, usize)> = Vec::new();

    loop {
        let i = layers.len();
        let Some(weight) = tensors.get(&format!("layers.{}.weight", i)) else {
            break;
        };
        let bias = tensors.get(&format!("layers.{}.bias", i)).ok_or_else(|| {
            Error::ModelLoadFailed(format!("Missing tensor layers.{}.bias", i))
        })?;

        let weight = as_f32(weight, i)?;
        let bias = as_f32(bias, i)?;

        let (out_dim, in_dim) = weight
            .dims2()
            .map_err(|e| Error::ModelLoadFailed(format!("layers.{}.weight: {}", i, e)))?;
        let bias_dim = bias
            .dims1()
            .map_err(|e| Error::ModelLoadFailed(format!("layers.{}.bias: {}", i, e)))?;

        if bias_dim != out_dim {
            return Err(Error::ModelLoadFailed(format!(
                "layers.{}.bias has {} entries, expected {}",
                i, bias_dim, out_dim
            )));
        }
        if let Some(&(prev_out, _)) = shapes.last() {
            if prev_out != in_dim {
                return Err(Error::ModelLoadFailed(format!(
                    "layers.{} expects {} inputs but layers.{} produces {}",
                    i,
                    in_dim,
                    i - 1,
                    prev_out
                )));
            }
        }

        layers.push(Linear::new(weight, Some(bias)));
        shapes.push((out_dim, in_dim));
    }

    if layers.is_empty() {
        return Err(Error::ModelLoadFailed(
            "Could not find tensor layers.0.weight".to_string(),
        ));
    }

    Ok((layers, shapes))
}

fn as_f32(tensor: &Tensor, layer: usize) -> Result<Tensor> {
    if !tensor.dtype().is_float() {
        return Err(Error::ModelLoadFailed(format!(
            "layers.{} has non-float dtype {:?}",
            layer,
            tensor.dtype()
        )));
    }

    tensor
        .to_dtype(DType::F32)
        .map_err(|e| Error::ModelLoadFailed(format!("layers.{}: {}", layer, e)))
}

fn input_side(features: usize) -> Result<usize> {
    let per_channel = features / 3;
    let side = (per_channel as f64).sqrt().round() as usize;

    if features == 0 || features % 3 != 0 || side * side != per_channel {
        return Err(Error::ModelLoadFailed(format!(
            "First layer takes {} inputs, which is not a 3-channel square image",
            features
        )));
    }

    Ok(side)
}
