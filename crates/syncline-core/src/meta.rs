//! Metadata shared by every desired-state resource.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Annotation key holding the remote UI link of a synced resource.
/// Written once on creation so external tooling can deep-link into the
/// remote backend.
pub const EXTERNAL_LINK_ANNOTATION: &str = "syncline.dev/external-link";

/// Namespace + name pair identifying one desired-state object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Parent-to-child ownership link, recorded on the child at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Metadata carried by every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    /// Bumped by the store on every spec change. Status writes leave it
    /// alone, which is what keeps status-only updates from re-triggering
    /// reconciliation for most kinds.
    #[serde(default)]
    pub generation: i64,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Ownership link, set at most once and never re-parented.
    #[serde(default)]
    pub owner: Option<OwnerRef>,
    /// Opaque version used for optimistic concurrency; bumped by the store
    /// on every write. A stale version makes writes fail with a conflict.
    #[serde(default)]
    pub resource_version: u64,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn has_owner(&self) -> bool {
        self.owner.is_some()
    }

    /// Record the remote UI link for this object.
    pub fn set_external_link(&mut self, url: impl Into<String>) {
        self.annotations
            .insert(EXTERNAL_LINK_ANNOTATION.to_string(), url.into());
    }

    pub fn external_link(&self) -> Option<&str> {
        self.annotations.get(EXTERNAL_LINK_ANNOTATION).map(String::as_str)
    }
}

/// Common shape of every desired-state resource. Lets stores and the
/// reconcile driver stay generic over the concrete kind.
pub trait Resource: Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ResourceKey {
        self.meta().key()
    }
}

/// Reference to a parent space, either by the name of a Space object in the
/// desired-state store or directly by remote id. The two are mutually
/// exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceRef {
    /// Name of a Space object in the desired-state store. Resolution gates
    /// on that object being ready.
    #[serde(rename = "spaceName")]
    Name(String),
    /// Remote id (slug) of a space not managed here. Used as-is.
    #[serde(rename = "spaceId")]
    Id(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = ResourceKey::new("infra", "core-stack");
        assert_eq!(key.to_string(), "infra/core-stack");
    }

    #[test]
    fn test_external_link_round_trip() {
        let mut meta = ObjectMeta::new("infra", "core-stack");
        assert_eq!(meta.external_link(), None);
        meta.set_external_link("https://backend.example.com/stack/core-stack");
        assert_eq!(
            meta.external_link(),
            Some("https://backend.example.com/stack/core-stack")
        );
    }

    #[test]
    fn test_space_ref_serializes_tagged() {
        let by_name = serde_json::to_value(SpaceRef::Name("prod".into())).unwrap();
        assert_eq!(by_name, serde_json::json!({ "spaceName": "prod" }));
        let by_id = serde_json::to_value(SpaceRef::Id("prod-01HX".into())).unwrap();
        assert_eq!(by_id, serde_json::json!({ "spaceId": "prod-01HX" }));
    }
}
