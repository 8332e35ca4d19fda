//! [`Context`]: the single entry point wiring a store to its registries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use equilibrium_core::{EquilibriumError, Namespace, Resource, ResourceTypeRegistry, Result, SpecType};
use equilibrium_store::ResourceStore;
use equilibrium_store_json::JsonDirStore;
use parking_lot::RwLock;
use tracing::debug;

use crate::admission::AdmissionController;
use crate::controller::ResourceController;
use crate::handles::ControllerHandles;
use crate::registry::{ControllerRegistry, ResourceRegistry};
use crate::service::ServiceRegistry;

const DEFAULT_NAMESPACE: &str = "default";

/// Chooses the resource store backing a [`Context`].
pub enum Backend {
    /// A JSON-directory store rooted at `directory`.
    Json {
        directory: PathBuf,
        max_lock_duration: Option<Duration>,
    },
    /// A JSON-directory store in a process-lifetime temporary directory —
    /// useful for tests and short-lived tools with no durability need.
    InMemory { max_lock_duration: Option<Duration> },
}

impl Backend {
    pub fn json(directory: impl Into<PathBuf>) -> Self {
        Backend::Json {
            directory: directory.into(),
            max_lock_duration: Some(Duration::from_secs(5)),
        }
    }

    pub fn in_memory() -> Self {
        Backend::InMemory {
            max_lock_duration: Some(Duration::from_secs(5)),
        }
    }
}

/// The main entry point for managing resource types, controllers, services
/// and resources against a single store.
pub struct Context {
    pub store: Arc<dyn ResourceStore>,
    pub services: Arc<ServiceRegistry>,
    pub controllers: Arc<ControllerRegistry>,
    pub resource_types: Arc<RwLock<ResourceTypeRegistry>>,
    pub resources: ResourceRegistry,
    // Keeps a `Backend::InMemory` temporary directory alive for as long as
    // the context lives; dropped (and cleaned up) with it.
    _temp_dir: Option<tempfile::TempDir>,
}

impl Context {
    pub fn create(backend: Backend) -> Result<Self> {
        let (store, temp_dir): (Arc<dyn ResourceStore>, Option<tempfile::TempDir>) = match backend {
            Backend::Json {
                directory,
                max_lock_duration,
            } => {
                debug!("using JSON backend: {}", directory.display());
                (Arc::new(JsonDirStore::with_max_lock_duration(directory, max_lock_duration)?), None)
            }
            Backend::InMemory { max_lock_duration } => {
                let dir = tempfile::tempdir().map_err(EquilibriumError::Io)?;
                debug!("using temporary directory for in-memory backend: {}", dir.path().display());
                let store = JsonDirStore::with_max_lock_duration(dir.path(), max_lock_duration)?;
                (Arc::new(store), Some(dir))
            }
        };
        Ok(Self::new(store, temp_dir, DEFAULT_NAMESPACE))
    }

    fn new(store: Arc<dyn ResourceStore>, temp_dir: Option<tempfile::TempDir>, default_namespace: impl Into<String>) -> Self {
        let services = Arc::new(ServiceRegistry::new());
        let handles = ControllerHandles::new(Arc::clone(&store), Arc::clone(&services));
        let controllers = Arc::new(ControllerRegistry::new(handles));

        let mut resource_types = ResourceTypeRegistry::new();
        resource_types
            .register::<Namespace>()
            .expect("Namespace registers cleanly into a fresh registry");
        let resource_types = Arc::new(RwLock::new(resource_types));

        let resources = ResourceRegistry::new(
            Arc::clone(&store),
            Arc::clone(&resource_types),
            Arc::clone(&controllers),
            default_namespace,
        );

        Context {
            store,
            services,
            controllers,
            resource_types,
            resources,
            _temp_dir: temp_dir,
        }
    }

    pub fn register_resource_type<T: SpecType>(&self) -> Result<()> {
        self.resource_types.write().register::<T>()
    }

    pub fn register_admission_controller(&self, controller: impl AdmissionController + 'static) {
        self.controllers.register_admission(controller);
    }

    pub fn register_controller(&self, controller: impl ResourceController + 'static) {
        self.controllers.register_controller(controller);
    }

    pub fn register_service<S: crate::service::Service + 'static>(
        &self,
        resource_type: equilibrium_core::ResourceType,
        service: S,
    ) {
        self.services.register(resource_type, service);
    }

    /// Loads a YAML file of one or more resource manifests (separated by
    /// `---` documents) into the store, admitting each in turn.
    pub fn load_manifest(&self, path: impl AsRef<Path>) -> Result<Vec<Resource>> {
        use serde::de::{Deserialize, Error as _};

        let text = fs::read_to_string(path).map_err(EquilibriumError::Io)?;
        let mut loaded = Vec::new();
        for document in serde_yaml::Deserializer::from_str(&text) {
            let resource = Resource::deserialize(document).map_err(|source| EquilibriumError::Serde {
                context: "parsing resource manifest".to_string(),
                source: serde_json::Error::custom(source.to_string()),
            })?;
            loaded.push(self.resources.put(resource)?);
        }
        Ok(loaded)
    }
}
