use crate::error::{Error, Result};
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::DynamicImage;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decode uploaded bytes into an image. Format is sniffed from the content.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(Error::InvalidImage("empty image payload".to_string()));
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Resize to `side x side`, normalize per channel and flatten channel-major
/// into a `(1, 3 * side * side)` tensor.
pub fn to_input(image: &DynamicImage, side: usize, device: &Device) -> Result<Tensor> {
    let side_px = side as u32;
    let rgb = image
        .resize_exact(side_px, side_px, FilterType::Triangle)
        .to_rgb8();

    let plane = side * side;
    let mut data = vec![0f32; 3 * plane];

    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            data[c * plane + i] = (value - MEAN[c]) / STD[c];
        }
    }

    Tensor::from_vec(data, (1, 3 * plane), device)
        .map_err(|e| Error::InferenceError(format!("Failed to build input tensor: {}", e)))
}
