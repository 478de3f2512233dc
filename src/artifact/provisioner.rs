use crate::artifact::ArtifactManifest;
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Outcome of [`ArtifactProvisioner::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Makes sure a model artifact exists on local disk, downloading it once.
pub struct ArtifactProvisioner {
    client: reqwest::Client,
}

impl ArtifactProvisioner {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Download `url` to `destination` unless `destination` already exists.
    ///
    /// An existing file is trusted as-is and no request is made. Network
    /// errors, non-success statuses and local filesystem failures are all
    /// returned as `DownloadFailed`.
    pub async fn ensure(&self, url: &str, destination: &Path) -> Result<Provisioned> {
        let present = tokio::fs::try_exists(destination)
            .await
            .map_err(|e| disk_error(destination, e))?;
        if present {
            tracing::info!("Model artifact already present at {:?}", destination);
            return Ok(Provisioned::AlreadyPresent);
        }

        tracing::info!("Downloading model artifact from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadFailed(format!(
                "{} returned {}",
                url, status
            )));
        }

        let body = response.bytes().await?;
        let bytes = body.len() as u64;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| disk_error(parent, e))?;
            }
        }

        // Rename onto the destination only once every byte is on disk.
        let partial = partial_path(destination);
        tokio::fs::write(&partial, &body)
            .await
            .map_err(|e| disk_error(&partial, e))?;
        tokio::fs::rename(&partial, destination)
            .await
            .map_err(|e| disk_error(destination, e))?;

        tracing::info!("✓ Downloaded {} bytes to {:?}", bytes, destination);

        if let Err(e) = ArtifactManifest::new(url, bytes).save(destination) {
            tracing::warn!("Could not write artifact manifest: {}", e);
        }

        Ok(Provisioned::Downloaded { bytes })
    }
}

impl Default for ArtifactProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

fn disk_error(path: &Path, err: std::io::Error) -> Error {
    Error::DownloadFailed(format!("{:?}: {}", path, err))
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
