use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ARTIFACT_URL: &str =
	"https://drive.google.com/uc?export=download&id=1hTF9uPjao9HogRWlCdy4QoQFWpjHQB7K";
pub const DEFAULT_ARTIFACT_NAME: &str = "export.safetensors";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub data_dir: PathBuf,
	pub artifact_url: String,
	pub artifact_path: PathBuf,
	pub app_dir: PathBuf,
	pub max_upload_bytes: usize,
}

impl Config {
	pub fn new() -> crate::error::Result<Self> {
		let project_dirs = ProjectDirs::from("", "", "leafscan")
			.ok_or_else(|| crate::error::Error::ConfigError("Could not determine data directory".to_string()))?;

		Ok(Self::with_data_dir(project_dirs.data_dir().to_path_buf()))
	}

	/// Defaults rooted at `data_dir`. Nothing is created on disk.
	pub fn with_data_dir(data_dir: PathBuf) -> Self {
		let artifact_path = data_dir.join(DEFAULT_ARTIFACT_NAME);

		Self {
			data_dir,
			artifact_url: DEFAULT_ARTIFACT_URL.to_string(),
			artifact_path,
			app_dir: PathBuf::from("app"),
			max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
		}
	}

	pub fn from_env() -> crate::error::Result<Self> {
		let mut config = match std::env::var("LEAFSCAN_DATA_DIR") {
			Ok(data_dir) => Self::with_data_dir(PathBuf::from(data_dir)),
			Err(_) => Self::new()?,
		};

		if let Ok(url) = std::env::var("LEAFSCAN_ARTIFACT_URL") {
			config.artifact_url = url;
		}

		if let Ok(name) = std::env::var("LEAFSCAN_ARTIFACT_NAME") {
			config.artifact_path = config.data_dir.join(name);
		}

		if let Ok(app_dir) = std::env::var("LEAFSCAN_APP_DIR") {
			config.app_dir = PathBuf::from(app_dir);
		}

		if let Ok(limit) = std::env::var("LEAFSCAN_MAX_UPLOAD_BYTES") {
			config.max_upload_bytes = limit.parse().map_err(|_| {
				crate::error::Error::ConfigError(format!("Invalid LEAFSCAN_MAX_UPLOAD_BYTES: {}", limit))
			})?;
		}

		std::fs::create_dir_all(&config.data_dir)?;

		Ok(config)
	}

	pub fn index_path(&self) -> PathBuf {
		self.app_dir.join("view").join("index.html")
	}

	pub fn static_dir(&self) -> PathBuf {
		self.app_dir.join("static")
	}
}
