//! Wires a resource store to the admission chain, the CRUD reconcile
//! sweep, and the service registry.

mod admission;
mod context;
mod controller;
mod handles;
mod registry;
mod service;

pub use admission::AdmissionController;
pub use context::{Backend, Context};
pub use controller::{CrudController, CrudControllerAdapter, CrudOutcome, ResourceController};
pub use handles::ControllerHandles;
pub use registry::{ControllerRegistry, ResourceRegistry};
pub use service::{Service, ServiceRegistry};
