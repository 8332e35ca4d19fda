//! Resource admission: a chain of controllers each permitted to mutate or
//! deny an incoming resource before it reaches the store.

use equilibrium_core::{EquilibriumError, Resource, Result};

use crate::handles::ControllerHandles;

/// A single step of the admission chain. Implementations may mutate
/// `resource` (labels, defaults, injected annotations) but must not change
/// its URI or the concrete type of its `spec` — [`ControllerRegistry::admit`]
/// enforces both invariants around every call.
pub trait AdmissionController: Send + Sync {
    fn admit(&self, resource: Resource, handles: &ControllerHandles) -> Result<Resource>;
}

pub(crate) fn run_chain(
    chain: &[Box<dyn AdmissionController>],
    mut resource: Resource,
    handles: &ControllerHandles,
) -> Result<Resource> {
    let uri = resource.uri()?;
    for controller in chain {
        resource = controller
            .admit(resource, handles)
            .map_err(|source| EquilibriumError::AdmissionFailed {
                uri: uri.clone(),
                source: Box::new(source),
            })?;
        let new_uri = resource.uri()?;
        if new_uri != uri {
            return Err(EquilibriumError::AdmissionFailed {
                uri: uri.clone(),
                source: Box::new(EquilibriumError::NamespaceMismatch(new_uri)),
            });
        }
    }
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::ControllerHandles;
    use crate::service::ServiceRegistry;
    use equilibrium_core::Metadata;
    use equilibrium_store_json::JsonDirStore;
    use std::sync::Arc;

    struct LabelStamper;
    impl AdmissionController for LabelStamper {
        fn admit(&self, mut resource: Resource, _handles: &ControllerHandles) -> Result<Resource> {
            resource.metadata.labels.insert("stamped".into(), "true".into());
            Ok(resource)
        }
    }

    struct Denier;
    impl AdmissionController for Denier {
        fn admit(&self, _resource: Resource, _handles: &ControllerHandles) -> Result<Resource> {
            Err(EquilibriumError::StateNotWritable)
        }
    }

    fn handles() -> ControllerHandles {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonDirStore::open(dir.path()).unwrap());
        ControllerHandles::new(store, Arc::new(ServiceRegistry::new()))
    }

    #[test]
    fn chain_mutates_resource() {
        let chain: Vec<Box<dyn AdmissionController>> = vec![Box::new(LabelStamper)];
        let resource = Resource::new("v1", "Widget", Metadata::new("x"));
        let out = run_chain(&chain, resource, &handles()).unwrap();
        assert_eq!(out.metadata.labels.get("stamped"), Some(&"true".to_string()));
    }

    #[test]
    fn denying_controller_wraps_error() {
        let chain: Vec<Box<dyn AdmissionController>> = vec![Box::new(Denier)];
        let resource = Resource::new("v1", "Widget", Metadata::new("x"));
        let err = run_chain(&chain, resource, &handles()).unwrap_err();
        assert!(matches!(err, EquilibriumError::AdmissionFailed { .. }));
    }
}
