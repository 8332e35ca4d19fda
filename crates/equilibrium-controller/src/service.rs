//! Services: pluggable components registered per resource type and looked
//! up by controllers, independent of the CRUD/admission pipeline.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use equilibrium_core::ResourceType;
use parking_lot::RwLock;

/// A pluggable component registered against a [`ResourceType`] and later
/// retrieved by controllers through [`ServiceRegistry::get`].
///
/// `service_id` identifies the *service's* own type, not the resource type
/// it is registered under — two services may be registered for the same
/// resource type as long as their ids differ.
pub trait Service: Any + Send + Sync {
    fn service_id() -> ResourceType
    where
        Self: Sized;
}

/// Registry of services, keyed by the resource type they were registered
/// for and the identity of the service implementation.
pub struct ServiceRegistry {
    services: RwLock<HashMap<ResourceType, HashMap<ResourceType, Arc<dyn Any + Send + Sync>>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        ServiceRegistry {
            services: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `service` for `resource_type`. Panics if a service with the
    /// same [`Service::service_id`] is already registered for that type —
    /// this is a wiring mistake caught at startup, not a runtime condition.
    pub fn register<S: Service + 'static>(&self, resource_type: ResourceType, service: S) {
        let mut services = self.services.write();
        let by_id = services.entry(resource_type.clone()).or_default();
        let id = S::service_id();
        if by_id.contains_key(&id) {
            panic!("service '{id}' is already registered for resource type {resource_type}");
        }
        by_id.insert(id, Arc::new(service));
    }

    /// Looks up a service of type `S` registered for `resource_type`.
    pub fn get<S: Service + 'static>(&self, resource_type: &ResourceType) -> Option<Arc<S>> {
        let services = self.services.read();
        let entry = services.get(resource_type)?.get(&S::service_id())?.clone();
        entry.downcast::<S>().ok()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Adder;
    impl Service for Adder {
        fn service_id() -> ResourceType {
            ResourceType::new("example.com/v1", "Adder")
        }
    }

    #[test]
    fn registers_and_retrieves() {
        let registry = ServiceRegistry::new();
        let rt = ResourceType::new("example.com/v1", "Add");
        registry.register(rt.clone(), Adder);
        assert!(registry.get::<Adder>(&rt).is_some());
    }

    #[test]
    fn unregistered_type_returns_none() {
        let registry = ServiceRegistry::new();
        let rt = ResourceType::new("example.com/v1", "Add");
        assert!(registry.get::<Adder>(&rt).is_none());
    }
}
