//! Policies: named rule bodies attached to stacks.

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource, SpaceRef};
use crate::record::PolicyRecord;

/// Policy kind, as understood by the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    Access,
    Approval,
    GitPush,
    Initialization,
    Login,
    Plan,
    Task,
    Trigger,
    Notification,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Access => "ACCESS",
            PolicyType::Approval => "APPROVAL",
            PolicyType::GitPush => "GIT_PUSH",
            PolicyType::Initialization => "INITIALIZATION",
            PolicyType::Login => "LOGIN",
            PolicyType::Plan => "PLAN",
            PolicyType::Task => "TASK",
            PolicyType::Trigger => "TRIGGER",
            PolicyType::Notification => "NOTIFICATION",
        }
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    /// Remote-side name override; defaults to the object name. Must be
    /// unique per account.
    pub name: Option<String>,
    pub body: String,
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub space: Option<SpaceRef>,
    /// Stacks to attach by desired-state object name; gated on readiness.
    #[serde(default)]
    pub attached_stack_names: Vec<String>,
    /// Stacks to attach directly by remote id.
    #[serde(default)]
    pub attached_stack_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatus {
    /// Remote policy id. Never cleared once set.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub meta: ObjectMeta,
    pub spec: PolicySpec,
    #[serde(default)]
    pub status: PolicyStatus,
}

impl Policy {
    pub fn name(&self) -> &str {
        self.spec.name.as_deref().unwrap_or(&self.meta.name)
    }

    pub fn ready(&self) -> bool {
        !self.status.id.is_empty()
    }

    pub fn apply_record(&mut self, record: &PolicyRecord) {
        if self.status.id.is_empty() && !record.id.is_empty() {
            self.status.id = record.id.clone();
        }
    }
}

impl Resource for Policy {
    const KIND: &'static str = "Policy";

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}
