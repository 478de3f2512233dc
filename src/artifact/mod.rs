pub mod manifest;
pub mod provisioner;

pub use manifest::ArtifactManifest;
pub use provisioner::{ArtifactProvisioner, Provisioned};
