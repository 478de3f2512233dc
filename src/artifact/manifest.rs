use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a downloaded artifact came from. Informational only: presence of the
/// artifact itself is what provisioning checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub url: String,
    pub bytes: u64,
    pub downloaded_at: String,
}

impl ArtifactManifest {
    pub fn new(url: &str, bytes: u64) -> Self {
        Self {
            url: url.to_string(),
            bytes,
            downloaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// `export.safetensors` -> `export.safetensors.source.toml`
    pub fn path_for(artifact: &Path) -> PathBuf {
        let mut name = artifact
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".source.toml");
        artifact.with_file_name(name)
    }

    pub fn load(artifact: &Path) -> Result<Option<Self>> {
        let path = Self::path_for(artifact);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let manifest: ArtifactManifest = toml::from_str(&content)?;
        Ok(Some(manifest))
    }

    pub fn save(&self, artifact: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(Self::path_for(artifact), content)?;
        Ok(())
    }
}
