//! The controller and resource registries that back a [`crate::Context`].

use std::sync::Arc;

use equilibrium_core::{EquilibriumError, Resource, ResourceTypeRegistry, Result, Uri};
use equilibrium_store::{LockRequest, NamespaceFilter, ResourceStore, SearchRequest};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::admission::{self, AdmissionController};
use crate::controller::ResourceController;
use crate::handles::ControllerHandles;

/// Holds registered admission and reconciliation controllers and drives
/// admission and the reconcile sweep.
pub struct ControllerRegistry {
    handles: ControllerHandles,
    admission: RwLock<Vec<Box<dyn AdmissionController>>>,
    controllers: RwLock<Vec<Box<dyn ResourceController>>>,
}

impl ControllerRegistry {
    pub(crate) fn new(handles: ControllerHandles) -> Self {
        ControllerRegistry {
            handles,
            admission: RwLock::new(Vec::new()),
            controllers: RwLock::new(Vec::new()),
        }
    }

    pub fn register_admission(&self, controller: impl AdmissionController + 'static) {
        self.admission.write().push(Box::new(controller));
    }

    pub fn register_controller(&self, controller: impl ResourceController + 'static) {
        self.controllers.write().push(Box::new(controller));
    }

    pub(crate) fn admit(&self, resource: Resource) -> Result<Resource> {
        let chain = self.admission.read();
        admission::run_chain(&chain, resource, &self.handles)
    }

    /// Runs one reconcile sweep of every registered controller, in
    /// registration order.
    pub fn reconcile(&self) -> Result<()> {
        for controller in self.controllers.read().iter() {
            debug!("reconciling {}", controller.name());
            controller.reconcile(&self.handles)?;
        }
        Ok(())
    }
}

/// High-level interface to the resource store: admission, default
/// namespacing, validation, and soft/hard deletion.
pub struct ResourceRegistry {
    store: Arc<dyn ResourceStore>,
    resource_types: Arc<RwLock<ResourceTypeRegistry>>,
    controllers: Arc<ControllerRegistry>,
    default_namespace: String,
}

impl ResourceRegistry {
    pub(crate) fn new(
        store: Arc<dyn ResourceStore>,
        resource_types: Arc<RwLock<ResourceTypeRegistry>>,
        controllers: Arc<ControllerRegistry>,
        default_namespace: impl Into<String>,
    ) -> Self {
        ResourceRegistry {
            store,
            resource_types,
            controllers,
            default_namespace: default_namespace.into(),
        }
    }

    pub fn get(&self, uri: &Uri) -> Result<Option<Resource>> {
        let lock = self.store.enter(LockRequest::scoped_to_kind(&uri.api_version, &uri.kind))?;
        self.store.get(&lock, uri)
    }

    /// Admits and stores `resource`. The incoming resource must carry no
    /// `state` — state is always inherited from whatever is already stored.
    /// If the resource is namespaced and no namespace was given, it is
    /// placed in the registry's default namespace.
    pub fn put(&self, mut resource: Resource) -> Result<Resource> {
        if resource.state.is_some() {
            return Err(EquilibriumError::StateNotWritable);
        }

        let resource_type = resource.resource_type();
        let namespaced = self.resource_types.read().namespaced(&resource_type)?;

        if resource.metadata.namespace.is_none() && namespaced {
            resource.metadata.namespace = Some(self.default_namespace.clone());
        }
        if resource.metadata.namespace.is_some() && !namespaced {
            let uri = resource.uri()?;
            return Err(EquilibriumError::NamespaceMismatch(uri));
        }

        let uri = resource.uri()?;

        let validation = self.resource_types.read().validate(&resource_type, &resource.spec)?;
        validation.map_err(|source| EquilibriumError::ValidationFailed {
            uri: uri.clone(),
            source,
        })?;

        let mut resource = self.controllers.admit(resource)?;

        let lock = self.store.enter(LockRequest::scoped_to_kind(&uri.api_version, &uri.kind))?;
        let existing = self.store.get(&lock, &uri)?;
        resource.state = existing.as_ref().and_then(|r| r.state.clone());
        info!("putting resource '{}'", uri);
        self.store.put(&lock, resource.clone())?;
        Ok(resource)
    }

    /// Marks a resource for deletion, or (with `force`) removes it
    /// immediately. Returns `false` instead of `NotFound` when `do_raise`
    /// is false.
    pub fn delete(&self, uri: &Uri, do_raise: bool, force: bool) -> Result<bool> {
        let lock = self.store.enter(LockRequest::scoped_to_kind(&uri.api_version, &uri.kind))?;
        let resource = self.store.get(&lock, uri)?;
        let Some(mut resource) = resource else {
            info!("could not delete '{}', not found", uri);
            if do_raise {
                return Err(EquilibriumError::NotFound(uri.clone()));
            }
            return Ok(false);
        };

        if force {
            info!("force deleting '{}'", uri);
            self.store.delete(&lock, uri)?;
        } else if resource.deletion_marker.is_none() {
            info!("marking '{}' as deleted", uri);
            resource.deletion_marker = Some(equilibrium_core::DeletionMarker::now());
            self.store.put(&lock, resource)?;
        } else {
            info!("'{}' is already marked as deleted", uri);
        }
        Ok(true)
    }

    pub fn search(&self, request: SearchRequest) -> Result<Vec<Uri>> {
        let lock_request = LockRequest {
            api_version: request.api_version.clone(),
            kind: request.kind.clone(),
            namespace: match &request.namespace {
                Some(NamespaceFilter::Named(ns)) => Some(ns.clone()),
                _ => None,
            },
            name: request.name.clone(),
            ..LockRequest::new()
        };
        let lock = self.store.enter(lock_request)?;
        self.store.search(&lock, &request)
    }
}
