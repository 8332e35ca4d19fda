//! The universal resource envelope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, EquilibriumError};
use crate::uri::{ResourceType, Uri};

/// Namespace, name, labels and annotations of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Metadata {
            namespace: None,
            name: name.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Marks the instant a resource was asked to be deleted. Set by
/// `ResourceRegistry::delete` and cleared only by physical removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionMarker {
    pub timestamp: DateTime<Utc>,
}

impl DeletionMarker {
    pub fn now() -> Self {
        DeletionMarker {
            timestamp: Utc::now(),
        }
    }
}

/// The universal resource envelope: identity, declared intent (`spec`) and
/// controller-owned observed reality (`state`).
///
/// `spec` and `state` are stored in their generic, serialized form — per
/// the design notes, the store only ever persists the generic tree. Typed
/// access goes through a registered [`crate::registry::SpecType`] at the
/// admission boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_marker: Option<DeletionMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

impl Resource {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, metadata: Metadata) -> Self {
        Resource {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata,
            spec: Map::new(),
            deletion_marker: None,
            state: None,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::new(self.api_version.clone(), self.kind.clone())
    }

    /// The resource's primary key. Fails if any component is not a valid
    /// identifier — this should not happen for resources that passed
    /// admission, but is re-checked here since `Resource` can also be built
    /// directly from deserialized manifests.
    pub fn uri(&self) -> Result<Uri, CoreError> {
        Uri::new(
            self.api_version.clone(),
            self.kind.clone(),
            self.metadata.namespace.clone(),
            self.metadata.name.clone(),
        )
    }

    /// Deserializes `spec` into a strongly typed form.
    pub fn typed_spec<T: for<'de> Deserialize<'de>>(&self) -> Result<T, EquilibriumError> {
        serde_json::from_value(Value::Object(self.spec.clone())).map_err(|source| EquilibriumError::Serde {
            context: "deserializing spec".to_string(),
            source,
        })
    }

    /// Deserializes `state` into a strongly typed form, if present.
    pub fn typed_state<T: for<'de> Deserialize<'de>>(&self) -> Result<Option<T>, EquilibriumError> {
        match &self.state {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| EquilibriumError::Serde {
                    context: "deserializing state".to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn set_typed_spec<T: Serialize>(&mut self, spec: &T) -> Result<(), EquilibriumError> {
        let value = serde_json::to_value(spec).map_err(|source| EquilibriumError::Serde {
            context: "serializing spec".to_string(),
            source,
        })?;
        match value {
            Value::Object(map) => {
                self.spec = map;
                Ok(())
            }
            other => {
                // Non-map specs are wrapped so the envelope's `spec` field
                // (always an object) can still hold them.
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                self.spec = map;
                Ok(())
            }
        }
    }

    pub fn set_typed_state<T: Serialize>(&mut self, state: &T) -> Result<(), EquilibriumError> {
        self.state = Some(serde_json::to_value(state).map_err(|source| EquilibriumError::Serde {
            context: "serializing state".to_string(),
            source,
        })?);
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion_marker.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_manifest_keys() {
        let yaml = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: default\n";
        let r: Resource = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(r.api_version, "v1");
        assert_eq!(r.kind, "Namespace");
        assert_eq!(serde_json::to_value(&r).unwrap()["apiVersion"], "v1");
    }

    #[test]
    fn round_trips_through_json() {
        let mut r = Resource::new("v1", "Namespace", Metadata::new("default"));
        r.metadata.labels.insert("env".into(), "prod".into());
        let json = serde_json::to_string(&r).unwrap();
        let back: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(back.api_version, r.api_version);
        assert_eq!(back.kind, r.kind);
        assert_eq!(back.metadata, r.metadata);
    }

    #[test]
    fn typed_spec_round_trips() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Spec {
            replicas: i32,
        }
        let mut r = Resource::new("v1", "Widget", Metadata::new("x"));
        r.set_typed_spec(&Spec { replicas: 3 }).unwrap();
        let back: Spec = r.typed_spec().unwrap();
        assert_eq!(back, Spec { replicas: 3 });
    }
}
