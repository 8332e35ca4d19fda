//! Resource controllers: the reconcile loop, and the CRUD state machine
//! that adapts a small four-method contract into one.

use equilibrium_core::{Resource, Result, SpecType, Uri};
use equilibrium_store::{LockRequest, ResourceStore, SearchRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::handles::ControllerHandles;

/// Drives one subsystem of the reconcile sweep. Most controllers should
/// prefer wrapping a [`CrudController`] in a [`CrudControllerAdapter`]
/// rather than implementing this directly.
pub trait ResourceController: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn reconcile(&self, handles: &ControllerHandles) -> Result<()>;
}

/// The outcome of observing a resource's real-world state against its
/// last known [`CrudController::State`].
pub enum CrudOutcome<T> {
    /// The resource still exists; this is its current observed state.
    Current(T),
    /// The resource it was tracking no longer exists and must be recreated.
    Deleted,
}

/// A resource lifecycle expressed as four pure-ish steps instead of one
/// general reconcile function. [`CrudControllerAdapter`] drives the state
/// table that dispatches between them.
pub trait CrudController: Send + Sync {
    type Spec: SpecType;
    type State: Serialize + DeserializeOwned + Send + Sync + Clone + 'static;

    /// Brings a brand-new resource into existence, returning its state.
    fn create(&self, resource: &Resource) -> Result<Self::State>;

    /// Observes whether the resource backing `state` still exists.
    fn read(&self, state: &Self::State) -> Result<CrudOutcome<Self::State>>;

    /// Reconciles a resource whose last known state is still current.
    fn update(&self, resource: &Resource, state: Self::State) -> Result<Self::State>;

    /// Tears down the resource backing `state`. Returns `Current(())` if
    /// teardown is still in progress and the next sweep should retry it, or
    /// `Deleted` once the backing resource is actually gone, at which point
    /// the adapter physically removes it from the store.
    fn delete(&self, state: &Self::State) -> Result<CrudOutcome<()>>;
}

/// Adapts a [`CrudController`] into a [`ResourceController`] by sweeping
/// every resource of its registered type, in URI order, applying one step
/// of the lifecycle to each under that resource's own lock.
pub struct CrudControllerAdapter<C> {
    inner: C,
}

impl<C: CrudController> CrudControllerAdapter<C> {
    pub fn new(inner: C) -> Self {
        CrudControllerAdapter { inner }
    }

    fn reconcile_one(&self, handles: &ControllerHandles, uri: &Uri) -> Result<()> {
        let lock = handles.store.enter(LockRequest {
            api_version: Some(uri.api_version.clone()),
            kind: Some(uri.kind.clone()),
            namespace: uri.namespace.clone(),
            name: Some(uri.name.clone()),
            ..LockRequest::new()
        })?;

        let Some(mut resource) = handles.store.get(&lock, uri)? else {
            debug!("resource '{}' vanished before its turn in the sweep", uri);
            return Ok(());
        };

        if resource.is_deleted() {
            let Some(state) = resource.typed_state::<C::State>()? else {
                handles.store.delete(&lock, uri)?;
                return Ok(());
            };
            match self.inner.delete(&state)? {
                CrudOutcome::Deleted => {
                    handles.store.delete(&lock, uri)?;
                }
                CrudOutcome::Current(()) => {
                    debug!("resource '{}' teardown still in progress, retrying next sweep", uri);
                }
            }
            return Ok(());
        }

        let existing = resource.typed_state::<C::State>()?;
        let new_state = match existing {
            None => Some(self.inner.create(&resource)?),
            Some(state) => match self.inner.read(&state)? {
                CrudOutcome::Current(state) => Some(self.inner.update(&resource, state)?),
                CrudOutcome::Deleted => {
                    // Treated as if the resource had no state at all; the
                    // next sweep observes `None` and recreates it.
                    warn!("resource '{}' was observed deleted out-of-band, clearing its state", uri);
                    None
                }
            },
        };

        match new_state {
            Some(state) => resource.set_typed_state(&state)?,
            None => resource.state = None,
        }
        handles.store.put(&lock, resource)?;
        Ok(())
    }
}

impl<C: CrudController> ResourceController for CrudControllerAdapter<C> {
    fn name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn reconcile(&self, handles: &ControllerHandles) -> Result<()> {
        let resource_type = C::Spec::resource_type();
        let sweep_lock = handles
            .store
            .enter(LockRequest::scoped_to_kind(&resource_type.api_version, &resource_type.kind))?;
        let mut uris = handles.store.search(
            &sweep_lock,
            &SearchRequest::new().with_kind(&resource_type.api_version, &resource_type.kind),
        )?;
        drop(sweep_lock);
        uris.sort();

        for uri in &uris {
            if let Err(error) = self.reconcile_one(handles, uri) {
                warn!("reconciling '{}' failed, leaving it for the next sweep: {}", uri, error);
            }
        }
        Ok(())
    }
}
