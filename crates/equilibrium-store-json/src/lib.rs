//! A reference [`ResourceStore`] backed by one directory per namespace,
//! plus a sentinel directory for cluster-scoped resources.
//!
//! Each resource is one `{apiVersion-escaped}_{kind}_{name}.json` file.
//! Writes go to a sibling tempfile and are atomically renamed in. Any
//! equivalent on-disk layout satisfies the store contract — this one is
//! simply the one this crate ships.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use equilibrium_core::{EquilibriumError, Resource, Result, Uri};
use equilibrium_store::{LockHandle, LockRequest, NamespaceFilter, ReentrantLock, ResourceStore, SearchRequest};

const CLUSTER_SCOPED_DIR: &str = "_cluster";
const NAMESPACE_API_VERSION: &str = "v1";
const NAMESPACE_KIND: &str = "Namespace";

/// A JSON-directory backed [`ResourceStore`].
pub struct JsonDirStore {
    root: PathBuf,
    lock: Arc<ReentrantLock>,
}

impl JsonDirStore {
    /// Opens (creating if necessary) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_max_lock_duration(root, None)
    }

    pub fn with_max_lock_duration(root: impl Into<PathBuf>, max_lock_duration: Option<Duration>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(CLUSTER_SCOPED_DIR))?;
        Ok(JsonDirStore {
            root,
            lock: ReentrantLock::new(max_lock_duration),
        })
    }

    fn namespace_dir(&self, namespace: Option<&str>) -> PathBuf {
        match namespace {
            Some(ns) => self.root.join(ns),
            None => self.root.join(CLUSTER_SCOPED_DIR),
        }
    }

    fn file_name(api_version: &str, kind: &str, name: &str) -> String {
        format!("{}_{kind}_{name}.json", escape_api_version(api_version))
    }

    fn path_for(&self, uri: &Uri) -> PathBuf {
        self.namespace_dir(uri.namespace.as_deref())
            .join(Self::file_name(&uri.api_version, &uri.kind, &uri.name))
    }

    fn read_resource(path: &Path) -> Result<Resource> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|source| EquilibriumError::Serde {
            context: format!("reading {}", path.display()),
            source,
        })
    }

    fn write_resource_atomically(&self, dir: &Path, path: &Path, resource: &Resource) -> Result<()> {
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, resource).map_err(|source| EquilibriumError::Serde {
            context: format!("writing {}", path.display()),
            source,
        })?;
        tmp.persist(path).map_err(|e| EquilibriumError::Io(e.error))?;
        Ok(())
    }

    fn namespace_has_resources(&self, namespace: &str) -> Result<bool> {
        let dir = self.root.join(namespace);
        match fs::read_dir(&dir) {
            Ok(mut entries) => Ok(entries.next().is_some()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn all_resources(&self) -> Result<Vec<(PathBuf, Resource)>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            for file in fs::read_dir(entry.path())? {
                let file = file?;
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let resource = Self::read_resource(&path)?;
                out.push((path, resource));
            }
        }
        Ok(out)
    }
}

impl ResourceStore for JsonDirStore {
    fn enter(&self, request: LockRequest) -> Result<LockHandle> {
        self.lock.enter(request.timeout, request.block)
    }

    fn put(&self, lock: &LockHandle, mut resource: Resource) -> Result<()> {
        lock.check()?;
        let uri = resource.uri()?;

        if let Some(namespace) = &uri.namespace {
            let ns_uri = Uri::new(NAMESPACE_API_VERSION, NAMESPACE_KIND, None, namespace.clone())?;
            if self.get(lock, &ns_uri)?.is_none() {
                return Err(EquilibriumError::NamespaceNotFound {
                    uri: uri.clone(),
                    namespace: namespace.clone(),
                });
            }
        }

        // `state` is inherited from any existing stored value, never
        // overwritten through this path.
        if let Some(existing) = self.get(lock, &uri)? {
            resource.state = existing.state;
        }

        let path = self.path_for(&uri);
        let dir = self.namespace_dir(uri.namespace.as_deref());
        self.write_resource_atomically(&dir, &path, &resource)
    }

    fn get(&self, lock: &LockHandle, uri: &Uri) -> Result<Option<Resource>> {
        lock.check()?;
        let path = self.path_for(uri);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_resource(&path).map(Some)
    }

    fn delete(&self, lock: &LockHandle, uri: &Uri) -> Result<bool> {
        lock.check()?;
        if uri.api_version == NAMESPACE_API_VERSION && uri.kind == NAMESPACE_KIND {
            if self.namespace_has_resources(&uri.name)? {
                return Err(EquilibriumError::NamespaceNotEmpty(uri.clone()));
            }
        }

        let path = self.path_for(uri);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;

        if let Some(namespace) = &uri.namespace {
            if !self.namespace_has_resources(namespace)? {
                let _ = fs::remove_dir(self.root.join(namespace));
            }
        }
        Ok(true)
    }

    fn search(&self, lock: &LockHandle, request: &SearchRequest) -> Result<Vec<Uri>> {
        lock.check()?;
        let mut out = Vec::new();
        for (_, resource) in self.all_resources()? {
            if request.matches(&resource) {
                out.push(resource.uri()?);
            }
        }
        out.sort();
        Ok(out)
    }

    fn namespaces(&self, lock: &LockHandle) -> Result<Vec<Resource>> {
        lock.check()?;
        let request = SearchRequest::new()
            .with_kind(NAMESPACE_API_VERSION, NAMESPACE_KIND)
            .with_namespace(NamespaceFilter::ClusterScoped);
        let mut out = Vec::new();
        for (_, resource) in self.all_resources()? {
            if request.matches(&resource) {
                out.push(resource);
            }
        }
        Ok(out)
    }
}

fn escape_api_version(api_version: &str) -> String {
    api_version.replace('/', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use equilibrium_core::Metadata;
    use tempfile::tempdir;

    fn namespace(name: &str) -> Resource {
        Resource::new(NAMESPACE_API_VERSION, NAMESPACE_KIND, Metadata::new(name))
    }

    fn widget(namespace: &str, name: &str) -> Resource {
        Resource::new("v1", "Widget", Metadata::new(name).with_namespace(namespace))
    }

    #[test]
    fn namespace_integrity_scenario() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let lock = store.enter(LockRequest::new()).unwrap();

        store.put(&lock, namespace("default")).unwrap();
        store.put(&lock, widget("default", "x")).unwrap();

        let ns_uri = Uri::new("v1", "Namespace", None, "default").unwrap();
        let err = store.delete(&lock, &ns_uri).unwrap_err();
        assert!(matches!(err, EquilibriumError::NamespaceNotEmpty(_)));

        let widget_uri = Uri::new("v1", "Widget", Some("default".into()), "x").unwrap();
        assert!(store.delete(&lock, &widget_uri).unwrap());
        assert!(store.delete(&lock, &ns_uri).unwrap());
    }

    #[test]
    fn put_rejects_missing_namespace() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let lock = store.enter(LockRequest::new()).unwrap();
        let err = store.put(&lock, widget("ghost", "x")).unwrap_err();
        assert!(matches!(err, EquilibriumError::NamespaceNotFound { .. }));
    }

    #[test]
    fn put_preserves_state_across_updates() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let lock = store.enter(LockRequest::new()).unwrap();
        store.put(&lock, namespace("default")).unwrap();

        let mut first = widget("default", "x");
        first.state = Some(serde_json::json!({"observed": true}));
        store.put(&lock, first).unwrap();

        let mut second = widget("default", "x");
        second.spec.insert("replicas".into(), serde_json::json!(3));
        store.put(&lock, second).unwrap();

        let uri = Uri::new("v1", "Widget", Some("default".into()), "x").unwrap();
        let stored = store.get(&lock, &uri).unwrap().unwrap();
        assert_eq!(stored.state, Some(serde_json::json!({"observed": true})));
        assert_eq!(stored.spec.get("replicas"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn search_filters_by_label() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let lock = store.enter(LockRequest::new()).unwrap();
        store.put(&lock, namespace("default")).unwrap();

        let mut a = widget("default", "a");
        a.metadata.labels.insert("tier".into(), "gold".into());
        store.put(&lock, a).unwrap();
        store.put(&lock, widget("default", "b")).unwrap();

        let found = store
            .search(&lock, &SearchRequest::new().with_label("tier", "gold"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "a");
    }

    #[test]
    fn deleting_last_resource_removes_namespace_dir() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let lock = store.enter(LockRequest::new()).unwrap();
        store.put(&lock, namespace("default")).unwrap();
        store.put(&lock, widget("default", "x")).unwrap();

        let widget_uri = Uri::new("v1", "Widget", Some("default".into()), "x").unwrap();
        store.delete(&lock, &widget_uri).unwrap();
        assert!(!dir.path().join("default").exists());
    }
}
