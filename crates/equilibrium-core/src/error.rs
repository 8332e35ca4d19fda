//! Error taxonomy shared by the resource model and its consumers.

use thiserror::Error;

use crate::uri::{ResourceType, Uri};

/// Errors raised while constructing or validating the resource model itself.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid apiVersion: {0:?}")]
    InvalidApiVersion(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid resource URI: {0:?}")]
    InvalidUri(String),
}

/// The full error taxonomy of the resource store and registry surface.
/// Named variants are abstract error *kinds*, not implementation details
/// of any particular store.
#[derive(Debug, Error)]
pub enum EquilibriumError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("resource not found: {0}")]
    NotFound(Uri),

    #[error("admission denied for {uri}: {source}")]
    AdmissionFailed {
        uri: Uri,
        #[source]
        source: Box<EquilibriumError>,
    },

    #[error("validation failed for {uri}: {source}")]
    ValidationFailed {
        uri: Uri,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("namespace {namespace:?} does not exist, required by {uri}")]
    NamespaceNotFound { uri: Uri, namespace: String },

    #[error("namespace {0} is not empty")]
    NamespaceNotEmpty(Uri),

    #[error("lock acquisition timed out")]
    LockTimeout,

    #[error("lock has been invalidated: held past its maximum duration")]
    LockInvalidated,

    #[error("unknown resource type: {0}")]
    UnknownResourceType(ResourceType),

    #[error("resource type {expected} is already registered with a different spec type")]
    ConflictingResourceType { expected: ResourceType },

    #[error("state may not be set on an incoming write")]
    StateNotWritable,

    #[error("resource namespacing does not match its registered type: {0}")]
    NamespaceMismatch(Uri),

    #[error("{context}: {source}")]
    Serde {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EquilibriumError>;
