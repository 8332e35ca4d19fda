//! Identity of a resource: its [`ResourceType`] and its [`Uri`].

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[.a-z0-9]([-.a-z0-9]*[.a-z0-9])?$").expect("static regex"));
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?$").expect("static regex"));

/// Validates an `apiVersion`: `segment('/'segment)*`.
pub fn validate_api_version(api_version: &str) -> Result<(), CoreError> {
    if api_version.is_empty() || api_version.split('/').any(|seg| !SEGMENT.is_match(seg)) {
        return Err(CoreError::InvalidApiVersion(api_version.to_string()));
    }
    Ok(())
}

/// Validates an identifier (`kind`, `name`, `namespace`).
pub fn validate_identifier(identifier: &str) -> Result<(), CoreError> {
    if !IDENTIFIER.is_match(identifier) {
        return Err(CoreError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

/// The pair `(apiVersion, kind)` — the unit of kind-level registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceType {
    pub api_version: String,
    pub kind: String,
}

impl ResourceType {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        ResourceType {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

/// The primary key of a stored resource: `(apiVersion, kind, namespace?, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uri {
    pub api_version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl Uri {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<String>,
        name: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let api_version = api_version.into();
        let kind = kind.into();
        let name = name.into();
        validate_api_version(&api_version)?;
        validate_identifier(&kind)?;
        validate_identifier(&name)?;
        if let Some(ns) = &namespace {
            validate_identifier(ns)?;
        }
        Ok(Uri {
            api_version,
            kind,
            namespace,
            name,
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::new(self.api_version.clone(), self.kind.clone())
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}/{}", self.api_version, self.kind, ns, self.name),
            None => write!(f, "{}/{}/{}", self.api_version, self.kind, self.name),
        }
    }
}

impl FromStr for Uri {
    type Err = CoreError;

    /// Parses `apiVersion/kind/namespace/name` or `apiVersion/kind/name`.
    ///
    /// Since `apiVersion` may itself contain `/`-separated segments, the
    /// string is disambiguated from the right: the last component is always
    /// `name`. The component before it is `kind` if it is preceded by either
    /// nothing else (cluster-scoped, two components remain) or a namespace
    /// component, otherwise it is the tail segment of `apiVersion`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() < 3 {
            return Err(CoreError::InvalidUri(s.to_string()));
        }
        let name = parts[parts.len() - 1];
        // Try the namespaced reading first since it is more specific; fall
        // back to the cluster-scoped reading (apiVersion/kind/name).
        if parts.len() >= 4 {
            let namespace = parts[parts.len() - 3];
            let kind = parts[parts.len() - 2];
            let api_version = parts[..parts.len() - 3].join("/");
            if validate_api_version(&api_version).is_ok()
                && validate_identifier(kind).is_ok()
                && validate_identifier(namespace).is_ok()
                && validate_identifier(name).is_ok()
            {
                return Uri::new(api_version, kind, Some(namespace.to_string()), name);
            }
        }
        let cluster_kind = parts[parts.len() - 2];
        let cluster_api_version = parts[..parts.len() - 2].join("/");
        Uri::new(cluster_api_version, cluster_kind, None, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_cluster_scoped() {
        let uri = Uri::new("v1", "Namespace", None, "default").unwrap();
        assert_eq!(uri.to_string(), "v1/Namespace/default");
        assert_eq!(uri.to_string().parse::<Uri>().unwrap(), uri);
    }

    #[test]
    fn round_trips_namespaced() {
        let uri = Uri::new("example.com/v1", "Widget", Some("team-a".into()), "x").unwrap();
        assert_eq!(uri.to_string(), "example.com/v1/Widget/team-a/x");
        assert_eq!(uri.to_string().parse::<Uri>().unwrap(), uri);
    }

    #[test]
    fn rejects_invalid_identifier() {
        assert!(Uri::new("v1", "-bad", None, "x").is_err());
        assert!(Uri::new("v1", "Good", None, "bad_name").is_err());
    }

    #[test]
    fn rejects_invalid_api_version() {
        assert!(Uri::new("V1", "Good", None, "x").is_err());
    }
}
