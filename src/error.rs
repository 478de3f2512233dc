use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Download failed: {0}")]
	DownloadFailed(String),
	#[error("Incompatible model artifact: {0}")]
	IncompatibleRuntime(String),
	#[error("Failed to load model: {0}")]
	ModelLoadFailed(String),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Invalid image: {0}")]
	InvalidImage(String),
	#[error("Inference error: {0}")]
	InferenceError(String),
	#[error("Configuration error: {0}")]
	ConfigError(String),
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	SerializationError(String),
}

impl Error {
	/// Startup errors abort the process; everything else is scoped to one request.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Error::DownloadFailed(_)
				| Error::IncompatibleRuntime(_)
				| Error::ModelLoadFailed(_)
				| Error::ConfigError(_)
		)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<toml::ser::Error> for Error {
	fn from(err: toml::ser::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Error::DownloadFailed(err.to_string())
	}
}

impl From<image::ImageError> for Error {
	fn from(err: image::ImageError) -> Self {
		Error::InvalidImage(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
