//! The typed resource model at the heart of Equilibrium: identity,
//! namespacing, the spec type registry, and the resource envelope.
//!
//! This crate has no opinion on how resources are stored or reconciled —
//! see `equilibrium-store` and `equilibrium-controller` for that. It only
//! defines what a resource *is*.

pub mod error;
pub mod namespace;
pub mod registry;
pub mod resource;
pub mod uri;

pub use error::{CoreError, EquilibriumError, Result};
pub use namespace::{Namespace, NamespaceSpec, NAMESPACE_API_VERSION, NAMESPACE_KIND};
pub use registry::{ResourceTypeRegistry, SpecType, ValidationError};
pub use resource::{DeletionMarker, Metadata, Resource};
pub use uri::{ResourceType, Uri};
