//! Startup sequencing: provision the artifact, load it, and hand back the
//! application state only once the model is ready.
//!
//! The phases only ever move forward. `serve` is never reached unless
//! [`Startup::run`] returns `Ok`.

use crate::artifact::ArtifactProvisioner;
use crate::classifier::{Classifier, LabelSet};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::server::AppState;
use candle_core::Device;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Provisioning,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Provisioning => "provisioning",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks which phase startup has reached.
#[derive(Debug)]
pub struct Startup {
    phase: Phase,
}

impl Startup {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            matches!(
                (self.phase, next),
                (Phase::Uninitialized, Phase::Provisioning)
                    | (Phase::Provisioning, Phase::Loading)
                    | (Phase::Loading, Phase::Ready)
            ),
            "illegal startup transition {} -> {}",
            self.phase,
            next
        );
        tracing::info!("Startup: {} -> {}", self.phase, next);
        self.phase = next;
    }

    fn fail(&mut self, err: Error) -> Error {
        tracing::error!("Startup failed while {}: {}", self.phase, err);
        self.phase = Phase::Failed;
        err
    }

    /// Run provisioning and loading. On error the phase is left at `Failed`.
    pub async fn run(&mut self, config: &Config, device: Device) -> Result<AppState> {
        self.advance(Phase::Provisioning);
        ArtifactProvisioner::new()
            .ensure(&config.artifact_url, &config.artifact_path)
            .await
            .map_err(|e| self.fail(e))?;

        self.advance(Phase::Loading);
        let device_name = format!("{:?}", device);
        let artifact_path = config.artifact_path.clone();
        let classifier = tokio::task::spawn_blocking(move || {
            Classifier::load(&artifact_path, LabelSet::plant_disease(), device)
        })
        .await
        .map_err(|e| Error::ModelLoadFailed(format!("Loader task failed: {}", e)))
        .and_then(|loaded| loaded)
        .map_err(|e| self.fail(e))?;

        let state = AppState::new(Arc::new(classifier), config, device_name);
        self.advance(Phase::Ready);
        Ok(state)
    }
}

impl Default for Startup {
    fn default() -> Self {
        Self::new()
    }
}
