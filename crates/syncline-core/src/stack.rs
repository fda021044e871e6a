//! Stacks: the unit of IaC deployment on the remote backend.

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource, SpaceRef};
use crate::record::StackRecord;

/// Cloud-credential integration attached to a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsIntegration {
    pub id: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
}

/// Vendor-specific build configuration. The variants are mutually exclusive
/// by construction, matching the remote API which accepts exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VendorConfig {
    Terraform {
        version: Option<String>,
        workspace: Option<String>,
        workflow_tool: Option<String>,
        #[serde(default)]
        use_smart_sanitization: bool,
        #[serde(default)]
        external_state_access_enabled: bool,
    },
    Terragrunt {
        terraform_version: String,
        terragrunt_version: String,
        #[serde(default)]
        use_run_all: bool,
        #[serde(default)]
        use_smart_sanitization: bool,
    },
    Pulumi {
        login_url: String,
        stack_name: String,
    },
    CloudFormation {
        entry_template_file: String,
        region: String,
        stack_name: String,
        template_bucket: String,
    },
    Kubernetes {
        namespace: String,
        kubectl_version: Option<String>,
    },
    Ansible {
        playbook: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSpec {
    /// Remote-side name override; defaults to the object name.
    pub name: Option<String>,
    /// Source repository as `owner/name`.
    pub repository: String,
    pub repository_url: Option<String>,
    /// Tracked branch; the remote defaults to `main` when unset.
    pub branch: Option<String>,
    /// Pin the remote stack to this commit after creation.
    pub commit_sha: Option<String>,
    pub project_root: Option<String>,
    pub additional_project_globs: Option<Vec<String>>,
    pub provider: Option<String>,
    pub runner_image: Option<String>,
    pub worker_pool: Option<String>,
    pub description: Option<String>,
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub administrative: bool,
    pub autodeploy: Option<bool>,
    pub autoretry: Option<bool>,
    pub github_action_deploy: Option<bool>,
    pub local_preview_enabled: Option<bool>,
    pub protect_from_deletion: Option<bool>,
    pub manages_state_file: Option<bool>,

    // Lifecycle hooks, passed through to the remote verbatim.
    pub after_apply: Option<Vec<String>>,
    pub after_destroy: Option<Vec<String>>,
    pub after_init: Option<Vec<String>>,
    pub after_perform: Option<Vec<String>>,
    pub after_plan: Option<Vec<String>>,
    pub after_run: Option<Vec<String>>,
    pub before_apply: Option<Vec<String>>,
    pub before_destroy: Option<Vec<String>>,
    pub before_init: Option<Vec<String>>,
    pub before_perform: Option<Vec<String>>,
    pub before_plan: Option<Vec<String>>,

    pub space: Option<SpaceRef>,
    pub aws_integration: Option<AwsIntegration>,
    pub vendor_config: Option<VendorConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackStatus {
    /// Remote stack id (slug). Never cleared once set.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    /// Last commit the remote reported as tracked.
    pub tracked_commit: Option<String>,
    /// True once the remote id is known. Runs gate on this.
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub meta: ObjectMeta,
    pub spec: StackSpec,
    #[serde(default)]
    pub status: StackStatus,
}

impl Stack {
    pub fn name(&self) -> &str {
        self.spec.name.as_deref().unwrap_or(&self.meta.name)
    }

    pub fn ready(&self) -> bool {
        !self.status.id.is_empty()
    }

    pub fn apply_record(&mut self, record: &StackRecord) {
        if self.status.id.is_empty() && !record.id.is_empty() {
            self.status.id = record.id.clone();
        }
        if let Some(url) = &record.url {
            if !url.is_empty() {
                self.status.url = url.clone();
            }
        }
        if let Some(commit) = &record.tracked_commit {
            self.status.tracked_commit = Some(commit.clone());
        }
        self.status.ready = self.ready();
    }
}

impl Resource for Stack {
    const KIND: &'static str = "Stack";

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
    fn test_status_projection_is_monotonic() {
        let mut stack = Stack {
            meta: ObjectMeta::new("infra", "core"),
            spec: StackSpec {
                repository: "acme/core-infra".into(),
                ..StackSpec::default()
            },
            status: StackStatus::default(),
        };
        stack.apply_record(&StackRecord {
            id: "core".into(),
            url: Some("https://backend.example.com/stack/core".into()),
            tracked_commit: Some("abc123".into()),
            outputs: vec![],
        });
        assert!(stack.ready());
        assert_eq!(stack.status.tracked_commit.as_deref(), Some("abc123"));

        stack.apply_record(&StackRecord {
            id: "renamed".into(),
            url: None,
            tracked_commit: None,
            outputs: vec![],
        });
        assert_eq!(stack.status.id, "core");
        assert_eq!(
            stack.status.url,
            "https://backend.example.com/stack/core"
        );
    }

    #[test]
    fn test_vendor_config_is_single_variant() {
        let json = serde_json::json!({
            "kubernetes": { "namespace": "apps", "kubectlVersion": null }
        });
        let config: VendorConfig = serde_json::from_value(json).unwrap();
        assert!(matches!(config, VendorConfig::Kubernetes { ref namespace, .. } if namespace == "apps"));
    }
}
