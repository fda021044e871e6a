//! Spaces: the root of the ownership tree.

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};
use crate::record::SpaceRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSpec {
    /// Remote-side name override; defaults to the object name.
    pub name: Option<String>,
    /// Remote slug of the parent space. Spaces always hang off an existing
    /// remote space (ultimately the backend root), so this is not gated on
    /// a local object.
    pub parent_space: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inherit_entities: bool,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceStatus {
    /// Remote space id. Never cleared once set.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    /// True once the remote id is known. Dependents gate on this.
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub meta: ObjectMeta,
    pub spec: SpaceSpec,
    #[serde(default)]
    pub status: SpaceStatus,
}

impl Space {
    pub fn name(&self) -> &str {
        self.spec.name.as_deref().unwrap_or(&self.meta.name)
    }

    pub fn ready(&self) -> bool {
        !self.status.id.is_empty()
    }

    pub fn apply_record(&mut self, record: &SpaceRecord) {
        if self.status.id.is_empty() && !record.id.is_empty() {
            self.status.id = record.id.clone();
        }
        if !record.url.is_empty() {
            self.status.url = record.url.clone();
        }
        self.status.ready = self.ready();
    }
}

impl Resource for Space {
    const KIND: &'static str = "Space";

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_tracks_remote_id() {
        let mut space = Space {
            meta: ObjectMeta::new("infra", "prod"),
            spec: SpaceSpec {
                name: None,
                parent_space: "root".into(),
                description: String::new(),
                inherit_entities: true,
                labels: None,
            },
            status: SpaceStatus::default(),
        };
        assert!(!space.ready());
        space.apply_record(&SpaceRecord {
            id: "prod-01HX".into(),
            url: "https://backend.example.com/spaces/prod-01HX".into(),
        });
        assert!(space.ready());
        assert!(space.status.ready);

        // A later record never rewrites the id.
        space.apply_record(&SpaceRecord {
            id: "other".into(),
            url: String::new(),
        });
        assert_eq!(space.status.id, "prod-01HX");
    }

    #[test]
    fn test_name_override() {
        let mut space = Space {
            meta: ObjectMeta::new("infra", "prod"),
            spec: SpaceSpec {
                name: Some("production".into()),
                parent_space: "root".into(),
                description: String::new(),
                inherit_entities: false,
                labels: None,
            },
            status: SpaceStatus::default(),
        };
        assert_eq!(space.name(), "production");
        space.spec.name = None;
        assert_eq!(space.name(), "prod");
    }
}
