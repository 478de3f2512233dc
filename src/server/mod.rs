use crate::classifier::{preprocess, Predictor};
use crate::config::Config;
use crate::error::{Error, Result};
use axum::{
	body::Bytes,
	extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
	http::{header, HeaderName, Method, StatusCode},
	response::{Html, IntoResponse, Response},
	routing::{get, post},
	Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
	cors::{Any, CorsLayer},
	services::ServeDir,
	trace::TraceLayer,
};

/// Everything a request handler needs, built once during startup.
#[derive(Clone)]
pub struct AppState {
	predictor: Arc<dyn Predictor>,
	device_name: String,
	index_path: PathBuf,
	static_dir: PathBuf,
	max_upload_bytes: usize,
}

impl AppState {
	pub fn new(predictor: Arc<dyn Predictor>, config: &Config, device_name: String) -> Self {
		Self {
			predictor,
			device_name,
			index_path: config.index_path(),
			static_dir: config.static_dir(),
			max_upload_bytes: config.max_upload_bytes,
		}
	}
}

#[derive(Serialize)]
pub struct HealthResponse {
	pub status: String,
	pub device: String,
	pub labels: usize,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
	pub result: String,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, message) = match self {
			Error::InvalidInput(_) | Error::InvalidImage(_) => (StatusCode::BAD_REQUEST, self.to_string()),
			Error::InferenceError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
		};

		if status.is_server_error() {
			tracing::error!("Request failed: {}", self);
		}

		let body = Json(serde_json::json!({
			"error": message,
		}));

		(status, body).into_response()
	}
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>> {
	let page = tokio::fs::read_to_string(&state.index_path).await?;
	Ok(Html(page))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ready".to_string(),
		device: state.device_name.clone(),
		labels: state.predictor.labels().len(),
	})
}

async fn analyze_handler(
	State(state): State<AppState>,
	multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>> {
	let mut multipart = multipart.map_err(|e| Error::InvalidInput(e.body_text()))?;
	let bytes = read_file_field(&mut multipart).await?;

	tracing::debug!("Analyzing {} byte upload", bytes.len());

	let predictor = state.predictor.clone();
	let prediction = tokio::task::spawn_blocking(move || {
		let image = preprocess::decode(&bytes)?;
		predictor.predict(&image)
	})
	.await
	.map_err(|e| Error::InferenceError(format!("Prediction task failed: {}", e)))??;

	Ok(Json(AnalyzeResponse {
		result: prediction.label,
	}))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Bytes> {
	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| Error::InvalidInput(e.body_text()))?
	{
		if field.name() == Some("file") {
			return field
				.bytes()
				.await
				.map_err(|e| Error::InvalidInput(e.body_text()));
		}
	}

	Err(Error::InvalidInput("Missing multipart field 'file'".to_string()))
}

pub fn create_router(state: AppState) -> Router {
	let cors = CorsLayer::new()
		.allow_origin(Any)
		.allow_methods([Method::POST])
		.allow_headers([HeaderName::from_static("x-requested-with"), header::CONTENT_TYPE]);

	let static_files = ServeDir::new(&state.static_dir);
	let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

	Router::new()
		.route("/", get(index_handler))
		.route("/analyze", post(analyze_handler).layer(cors))
		.route("/api/health", get(health_handler))
		.nest_service("/static", static_files)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(body_limit),
		)
		.with_state(state)
}

pub async fn serve(host: &str, port: u16, state: AppState) -> Result<()> {
	let app = create_router(state);
	let addr = format!("{}:{}", host, port);

	tracing::info!("Starting server on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;

	axum::serve(listener, app)
		.await
		.map_err(|e| Error::ConfigError(format!("Server error: {}", e)))?;

	Ok(())
}
