//! Fixtures shared by unit tests: a tiny classifier artifact, encoded images,
//! an in-process artifact host and multipart request bodies.

use crate::classifier::LabelSet;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use candle_core::{DType, Device, Tensor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const SAMPLE_SIDE: usize = 4;
const BOUNDARY: &str = "leafscan-test-boundary";

/// Single linear layer over a 4x4 input: the green channel votes for
/// `Apple___healthy`, the red channel for `Apple___Apple_scab`.
fn sample_weights() -> (Vec<f32>, usize, usize) {
    let labels = LabelSet::plant_disease();
    let plane = SAMPLE_SIDE * SAMPLE_SIDE;
    let features = 3 * plane;

    let healthy = labels.index_of("Apple___healthy").unwrap();
    let scab = labels.index_of("Apple___Apple_scab").unwrap();

    let mut weight = vec![0f32; labels.len() * features];
    for p in 0..plane {
        weight[scab * features + p] = 1.0;
        weight[healthy * features + plane + p] = 1.0;
    }

    (weight, labels.len(), features)
}

pub fn write_sample_artifact(path: &Path) {
    let (weight, classes, features) = sample_weights();

    let weight = Tensor::from_vec(weight, (classes, features), &Device::Cpu).unwrap();
    let bias = Tensor::zeros(classes, DType::F32, &Device::Cpu).unwrap();

    let mut tensors = HashMap::new();
    tensors.insert("layers.0.weight".to_string(), weight);
    tensors.insert("layers.0.bias".to_string(), bias);
    candle_core::safetensors::save(&tensors, path).unwrap();
}

/// Same head as [`write_sample_artifact`], written by hand with the JSON
/// header space-padded to exactly `header_len` bytes.
pub fn write_padded_sample_artifact(path: &Path, header_len: usize) {
    let (weight, classes, features) = sample_weights();
    let weight_end = weight.len() * 4;
    let bias_end = weight_end + classes * 4;

    let mut header = format!(
        "{{\"layers.0.weight\":{{\"dtype\":\"F32\",\"shape\":[{},{}],\"data_offsets\":[0,{}]}},\
         \"layers.0.bias\":{{\"dtype\":\"F32\",\"shape\":[{}],\"data_offsets\":[{},{}]}}}}",
        classes, features, weight_end, classes, weight_end, bias_end
    );
    assert!(header.len() <= header_len);
    header.extend(std::iter::repeat(' ').take(header_len - header.len()));

    let mut bytes = Vec::with_capacity(8 + header_len + bias_end);
    bytes.extend_from_slice(&(header_len as u64).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in &weight {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes.resize(8 + header_len + bias_end, 0);
    std::fs::write(path, bytes).unwrap();
}

pub fn sample_artifact_bytes() -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.safetensors");
    write_sample_artifact(&path);
    std::fs::read(&path).unwrap()
}

pub fn solid_png(rgb: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb(rgb)));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Serves `body` with `status` at `/export.safetensors` on a loopback port.
/// Returns the URL and a counter of requests received.
pub async fn spawn_artifact_host(status: StatusCode, body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/export.safetensors",
        get(move || {
            let counter = counter.clone();
            let body = body.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (status, body)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/export.safetensors", addr), hits)
}

pub fn multipart_request(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"leaf.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
