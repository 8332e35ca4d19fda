//! Equilibrium: a small declarative resource reconciliation framework.
//!
//! A `Context` ([`equilibrium_controller::Context`]) owns a [`ResourceStore`]
//! and the registries that sit in front of it: resource types, admission
//! controllers, reconcile controllers, and services. Resources are
//! `apiVersion`/`kind`/`namespace`/`name`-addressed envelopes with a
//! declared `spec` and controller-owned `state`. The rules engine in
//! [`equilibrium_rules`] is a separate, optional piece: a type-indexed
//! dependency graph of pure functions, useful for controllers that need to
//! derive values rather than just react to them.
//!
//! [`ResourceStore`]: equilibrium_store::ResourceStore

pub mod local_file;

pub mod prelude {
    pub use equilibrium_core::{
        CoreError, DeletionMarker, EquilibriumError, Metadata, Namespace, NamespaceSpec, Resource, ResourceType,
        ResourceTypeRegistry, Result, SpecType, Uri, NAMESPACE_API_VERSION, NAMESPACE_KIND,
    };
    pub use equilibrium_controller::{
        AdmissionController, Backend, Context, ControllerHandles, ControllerRegistry, CrudController,
        CrudControllerAdapter, CrudOutcome, ResourceController, ResourceRegistry, Service, ServiceRegistry,
    };
    pub use equilibrium_rules::{
        get, rule0, rule1, rule2, rule3, Cache, MemoryCache, NoneCache, Params, Rule, RuleInfo, RuleValue,
        RulesEngine, RulesError, RulesGraph, Signature, SimpleExecutor, ThreadedExecutor, TypeKey,
    };
    pub use equilibrium_store::{LockHandle, LockId, LockRequest, NamespaceFilter, ReentrantLock, ResourceStore, SearchRequest};
    pub use equilibrium_store_json::JsonDirStore;
}

pub use prelude::*;
