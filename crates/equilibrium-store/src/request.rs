//! Request types for scoping lock acquisition and resource search.

use std::collections::BTreeMap;
use std::time::Duration;

/// Scopes a lock acquisition. The filter fields are presently advisory
/// (the store only ever has one coarse-grained lock) but are carried
/// through so a future fine-grained implementation can use them without
/// changing the call site.
#[derive(Debug, Clone, Default)]
pub struct LockRequest {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    /// `None` means block indefinitely.
    pub timeout: Option<Duration>,
    /// If false, fail immediately instead of waiting when contended.
    pub block: bool,
}

impl LockRequest {
    pub fn new() -> Self {
        LockRequest {
            block: true,
            ..Default::default()
        }
    }

    pub fn scoped_to_kind(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        LockRequest {
            api_version: Some(api_version.into()),
            kind: Some(kind.into()),
            ..Self::new()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn non_blocking(mut self) -> Self {
        self.block = false;
        self
    }
}

/// `search`'s namespace filter: `All` matches every resource regardless of
/// namespace, `ClusterScoped` matches only resources with no namespace, and
/// `Named` matches resources in exactly that namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceFilter {
    All,
    ClusterScoped,
    Named(String),
}

/// Filters resources by any subset of apiVersion/kind/namespace/name/labels.
/// `None` fields are unconstrained; labels are subset-matched (every
/// requested label must be present with the same value).
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub namespace: Option<NamespaceFilter>,
    pub name: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self.kind = Some(kind.into());
        self
    }

    pub fn with_namespace(mut self, namespace: NamespaceFilter) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, resource: &equilibrium_core::Resource) -> bool {
        if let Some(api_version) = &self.api_version {
            if &resource.api_version != api_version {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            if &resource.kind != kind {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &resource.metadata.name != name {
                return false;
            }
        }
        match &self.namespace {
            None | Some(NamespaceFilter::All) => {}
            Some(NamespaceFilter::ClusterScoped) => {
                if resource.metadata.namespace.is_some() {
                    return false;
                }
            }
            Some(NamespaceFilter::Named(ns)) => {
                if resource.metadata.namespace.as_deref() != Some(ns.as_str()) {
                    return false;
                }
            }
        }
        self.labels
            .iter()
            .all(|(k, v)| resource.metadata.labels.get(k) == Some(v))
    }
}
