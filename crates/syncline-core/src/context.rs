//! Contexts: bundles of environment variables and mounted files shared
//! across stacks.

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource, SpaceRef};
use crate::record::ContextRecord;

/// Pointer at one key of a secret in the desired-state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

/// One environment variable or mounted file. The value is either a literal
/// or sourced from a secret; entries sourced from secrets are always marked
/// write-only on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigElement {
    pub id: String,
    pub value: Option<String>,
    pub value_from_secret: Option<SecretKeySelector>,
    #[serde(default)]
    pub secret: bool,
    pub description: Option<String>,
}

/// Attachment of the context to a stack or module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAttachment {
    /// Name of a Stack object in the desired-state store; gated on readiness.
    pub stack_name: Option<String>,
    /// Remote stack id, used as-is.
    pub stack_id: Option<String>,
    /// Remote module id, used as-is.
    pub module_id: Option<String>,
    pub priority: Option<i64>,
}

/// Lifecycle hooks attached to the context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hooks {
    #[serde(default)]
    pub after_apply: Vec<String>,
    #[serde(default)]
    pub after_destroy: Vec<String>,
    #[serde(default)]
    pub after_init: Vec<String>,
    #[serde(default)]
    pub after_perform: Vec<String>,
    #[serde(default)]
    pub after_plan: Vec<String>,
    #[serde(default)]
    pub after_run: Vec<String>,
    #[serde(default)]
    pub before_apply: Vec<String>,
    #[serde(default)]
    pub before_destroy: Vec<String>,
    #[serde(default)]
    pub before_init: Vec<String>,
    #[serde(default)]
    pub before_perform: Vec<String>,
    #[serde(default)]
    pub before_plan: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSpec {
    /// Remote-side name override; defaults to the object name.
    pub name: Option<String>,
    pub space: Option<SpaceRef>,
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<ContextAttachment>,
    #[serde(default)]
    pub hooks: Hooks,
    #[serde(default)]
    pub environment: Vec<ConfigElement>,
    #[serde(default)]
    pub mounted_files: Vec<ConfigElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStatus {
    /// Remote context id. Never cleared once set.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub meta: ObjectMeta,
    pub spec: ContextSpec,
    #[serde(default)]
    pub status: ContextStatus,
}

impl Context {
    pub fn name(&self) -> &str {
        self.spec.name.as_deref().unwrap_or(&self.meta.name)
    }

    pub fn ready(&self) -> bool {
        !self.status.id.is_empty()
    }

    pub fn apply_record(&mut self, record: &ContextRecord) {
        if self.status.id.is_empty() && !record.id.is_empty() {
            self.status.id = record.id.clone();
        }
    }
}

impl Resource for Context {
    const KIND: &'static str = "Context";

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
    fn test_id_never_rewritten() {
        let mut context = Context {
            meta: ObjectMeta::new("infra", "shared-env"),
            spec: ContextSpec::default(),
            status: ContextStatus::default(),
        };
        context.apply_record(&ContextRecord { id: "ctx-1".into() });
        context.apply_record(&ContextRecord { id: "ctx-2".into() });
        assert_eq!(context.status.id, "ctx-1");
        assert!(context.ready());
    }
}
