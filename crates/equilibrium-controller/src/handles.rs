//! The handles a controller is given at registration time: the store it
//! reconciles against and the service registry it can query.

use std::sync::Arc;

use equilibrium_store::ResourceStore;

use crate::service::ServiceRegistry;

#[derive(Clone)]
pub struct ControllerHandles {
    pub store: Arc<dyn ResourceStore>,
    pub services: Arc<ServiceRegistry>,
}

impl ControllerHandles {
    pub fn new(store: Arc<dyn ResourceStore>, services: Arc<ServiceRegistry>) -> Self {
        ControllerHandles { store, services }
    }
}
