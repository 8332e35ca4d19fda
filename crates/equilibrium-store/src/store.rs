//! The pluggable, process-local resource store contract.
//!
//! Any implementation satisfying this trait is interchangeable — the JSON
//! directory store in `equilibrium-store-json` is the reference
//! implementation; a SQL-backed store is an external collaborator that
//! implements the same contract.

use equilibrium_core::{Resource, Result, Uri};

use crate::lock::LockHandle;
use crate::request::{LockRequest, SearchRequest};

pub trait ResourceStore: Send + Sync {
    /// Scoped acquisition of the store's single exclusive lock. Returns a
    /// handle that releases the lock (or decrements its reentrant depth)
    /// on drop.
    fn enter(&self, request: LockRequest) -> Result<LockHandle>;

    /// Upserts a resource by its URI. Fails with `NamespaceNotFound` if the
    /// resource is namespaced and no `Namespace` resource exists for it.
    fn put(&self, lock: &LockHandle, resource: Resource) -> Result<()>;

    fn get(&self, lock: &LockHandle, uri: &Uri) -> Result<Option<Resource>>;

    /// Physically removes a resource. Returns `false` if it was absent.
    /// Deleting a `Namespace` fails with `NamespaceNotEmpty` while any
    /// resource in it still exists.
    fn delete(&self, lock: &LockHandle, uri: &Uri) -> Result<bool>;

    fn search(&self, lock: &LockHandle, request: &SearchRequest) -> Result<Vec<Uri>>;

    /// Cheap enumeration of all `Namespace` resources.
    fn namespaces(&self, lock: &LockHandle) -> Result<Vec<Resource>>;
}
