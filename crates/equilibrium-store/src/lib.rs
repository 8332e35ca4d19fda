//! The resource store contract: locking, CRUD, label-filtered search, and
//! the request types that scope them.

pub mod lock;
pub mod request;
pub mod store;

pub use lock::{LockHandle, LockId, ReentrantLock};
pub use request::{LockRequest, NamespaceFilter, SearchRequest};
pub use store::ResourceStore;
