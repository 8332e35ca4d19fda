//! A minimal resource type and controller demonstrating the framework
//! end to end: a `LocalFile` resource whose spec names a path and
//! content, reconciled against the real filesystem.

use std::fs;
use std::path::Path;

use equilibrium_core::{Resource, ResourceType, Result, SpecType};
use equilibrium_controller::{CrudController, CrudOutcome};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct LocalFileSpec {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileState {
    pub path: String,
    pub digest: String,
}

/// The `example.com/v1, LocalFile` resource type.
pub struct LocalFile;

impl SpecType for LocalFile {
    type Spec = LocalFileSpec;

    fn resource_type() -> ResourceType {
        ResourceType::new("example.com/v1", "LocalFile")
    }

    fn namespaced() -> bool {
        true
    }
}

fn digest_of(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Keeps a file on disk in sync with a [`LocalFile`] resource's spec.
pub struct LocalFileController;

impl CrudController for LocalFileController {
    type Spec = LocalFile;
    type State = LocalFileState;

    fn create(&self, resource: &Resource) -> Result<LocalFileState> {
        let spec: LocalFileSpec = resource.typed_spec()?;
        info!("creating local file '{}'", spec.path);
        fs::write(&spec.path, &spec.content)?;
        Ok(LocalFileState {
            path: spec.path,
            digest: digest_of(&spec.content),
        })
    }

    fn read(&self, state: &LocalFileState) -> Result<CrudOutcome<LocalFileState>> {
        if !Path::new(&state.path).exists() {
            return Ok(CrudOutcome::Deleted);
        }
        let on_disk = fs::read_to_string(&state.path)?;
        Ok(CrudOutcome::Current(LocalFileState {
            path: state.path.clone(),
            digest: digest_of(&on_disk),
        }))
    }

    fn update(&self, resource: &Resource, state: LocalFileState) -> Result<LocalFileState> {
        let spec: LocalFileSpec = resource.typed_spec()?;
        let mut path = state.path;

        if path != spec.path {
            info!("moving local file '{}' to '{}'", path, spec.path);
            match fs::rename(&path, &spec.path) {
                Ok(()) => path = spec.path.clone(),
                Err(_) => {
                    let _ = fs::remove_file(&path);
                    path = spec.path.clone();
                }
            }
        }

        let wanted_digest = digest_of(&spec.content);
        if !Path::new(&path).exists() || fs::read_to_string(&path).ok().as_deref().map(digest_of) != Some(wanted_digest.clone()) {
            fs::write(&path, &spec.content)?;
        }

        Ok(LocalFileState {
            path,
            digest: wanted_digest,
        })
    }

    fn delete(&self, state: &LocalFileState) -> Result<CrudOutcome<()>> {
        if Path::new(&state.path).exists() {
            info!("deleting local file '{}'", state.path);
            fs::remove_file(&state.path)?;
        }
        Ok(CrudOutcome::Deleted)
    }
}
