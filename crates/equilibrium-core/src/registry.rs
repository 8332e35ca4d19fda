//! The spec type registry: `Type -> SpecType`.
//!
//! Follows the type-indexed-dispatch pattern favoured throughout the
//! framework: a stable key (here, [`ResourceType`]) maps to a type-erased
//! trait object rather than relying on reflection or inheritance. Concrete
//! spec types stay fully typed for their own module; only the registry
//! boundary is erased.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EquilibriumError;
use crate::uri::ResourceType;

/// A registered kind of resource. `namespaced()` is a compile-time-stable
/// property of the type, not a per-instance flag.
pub trait SpecType: 'static + Send + Sync {
    type Spec: Serialize + DeserializeOwned + Send + Sync + Debug + 'static;

    fn resource_type() -> ResourceType;

    fn namespaced() -> bool;

    /// Invoked during admission after the spec deserializes successfully.
    /// The default accepts everything.
    fn validate(_spec: &Self::Spec) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Object-safe projection of [`SpecType`], stored in the registry.
pub type ValidationError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) trait ErasedSpecType: Send + Sync {
    fn resource_type(&self) -> ResourceType;
    fn namespaced(&self) -> bool;
    fn validate_json(&self, spec: &Map<String, Value>) -> Result<(), ValidationError>;
    fn as_any(&self) -> &dyn Any;
}

struct Erased<T: SpecType>(std::marker::PhantomData<T>);

impl<T: SpecType> ErasedSpecType for Erased<T> {
    fn resource_type(&self) -> ResourceType {
        T::resource_type()
    }

    fn namespaced(&self) -> bool {
        T::namespaced()
    }

    fn validate_json(&self, spec: &Map<String, Value>) -> Result<(), ValidationError> {
        let typed: T::Spec = serde_json::from_value(Value::Object(spec.clone()))?;
        T::validate(&typed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registers [`SpecType`]s by [`ResourceType`]. Re-registering the *same*
/// Rust type under a `ResourceType` it already owns is a no-op; registering
/// a *different* type under an already-claimed `ResourceType` is an error.
#[derive(Default)]
pub struct ResourceTypeRegistry {
    entries: HashMap<ResourceType, Arc<dyn ErasedSpecType>>,
}

impl ResourceTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: SpecType>(&mut self) -> Result<(), EquilibriumError> {
        let key = T::resource_type();
        if let Some(existing) = self.entries.get(&key) {
            if existing.as_any().downcast_ref::<Erased<T>>().is_some() {
                return Ok(());
            }
            return Err(EquilibriumError::ConflictingResourceType { expected: key });
        }
        self.entries.insert(key, Arc::new(Erased::<T>(std::marker::PhantomData)));
        Ok(())
    }

    pub fn is_registered(&self, resource_type: &ResourceType) -> bool {
        self.entries.contains_key(resource_type)
    }

    pub fn namespaced(&self, resource_type: &ResourceType) -> Result<bool, EquilibriumError> {
        self.entries
            .get(resource_type)
            .map(|entry| entry.namespaced())
            .ok_or_else(|| EquilibriumError::UnknownResourceType(resource_type.clone()))
    }

    /// Deserializes and validates `spec` against the registered type.
    /// Returns `Ok(Err(validation_source))` if the type is known but the
    /// spec fails its own `validate()`, so the caller (which knows the
    /// resource's `Uri`) can attach it to a [`EquilibriumError::ValidationFailed`].
    pub fn validate(
        &self,
        resource_type: &ResourceType,
        spec: &Map<String, Value>,
    ) -> Result<Result<(), ValidationError>, EquilibriumError> {
        let entry = self
            .entries
            .get(resource_type)
            .ok_or_else(|| EquilibriumError::UnknownResourceType(resource_type.clone()))?;
        Ok(entry.validate_json(spec))
    }
}
