//! The built-in, cluster-scoped `v1/Namespace` kind.

use serde::{Deserialize, Serialize};

use crate::registry::SpecType;
use crate::uri::ResourceType;

/// Namespaces carry no meaningful spec of their own; the type exists purely
/// so the store can enforce referential integrity — a namespace resource
/// must exist before any resource in that namespace is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceSpec {}

pub struct Namespace;

impl SpecType for Namespace {
    type Spec = NamespaceSpec;

    fn resource_type() -> ResourceType {
        ResourceType::new("v1", "Namespace")
    }

    fn namespaced() -> bool {
        false
    }
}

pub const NAMESPACE_API_VERSION: &str = "v1";
pub const NAMESPACE_KIND: &str = "Namespace";
