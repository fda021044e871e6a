//! Mutation input payloads.
//!
//! Pure mappings from desired-state specs to the variable bags the remote
//! mutations expect. Kept separate from the repositories so the wire shape
//! is testable without a transport.

use serde::Serialize;
use syncline_core::{Context, Hooks, Space, Stack, VendorConfig};

use crate::resolver::ResolvedContext;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceInput {
    pub name: String,
    pub description: String,
    pub inherit_entities: bool,
    pub parent_space: String,
    pub labels: Option<Vec<String>>,
}

impl SpaceInput {
    pub fn from_space(space: &Space) -> Self {
        Self {
            name: space.name().to_string(),
            description: space.spec.description.clone(),
            inherit_entities: space.spec.inherit_entities,
            parent_space: space.spec.parent_space.clone(),
            labels: space.spec.labels.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StackInput {
    pub name: String,
    pub space: Option<String>,
    pub administrative: bool,
    /// Repository owner, split off the `owner/name` spec field.
    pub namespace: Option<String>,
    pub repository: String,
    pub repository_url: Option<String>,
    pub branch: String,
    pub project_root: Option<String>,
    pub additional_project_globs: Option<Vec<String>>,
    pub provider: Option<String>,
    pub runner_image: Option<String>,
    pub worker_pool: Option<String>,
    pub description: Option<String>,
    pub labels: Option<Vec<String>>,
    pub autodeploy: Option<bool>,
    pub autoretry: Option<bool>,
    pub github_action_deploy: Option<bool>,
    pub local_preview_enabled: Option<bool>,
    pub protect_from_deletion: Option<bool>,
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
    pub vendor_config: Option<VendorConfigInput>,
}

impl StackInput {
    pub fn from_stack(stack: &Stack, space_id: Option<&str>) -> Self {
        let spec = &stack.spec;
        let (namespace, repository) = match spec.repository.rsplit_once('/') {
            Some((owner, name)) => (Some(owner.to_string()), name.to_string()),
            None => (None, spec.repository.clone()),
        };
        Self {
            name: stack.name().to_string(),
            space: space_id.map(str::to_string),
            administrative: spec.administrative,
            namespace,
            repository,
            repository_url: spec.repository_url.clone(),
            branch: spec.branch.clone().unwrap_or_else(|| "main".to_string()),
            project_root: spec.project_root.clone(),
            additional_project_globs: spec.additional_project_globs.clone(),
            provider: spec.provider.clone(),
            runner_image: spec.runner_image.clone(),
            worker_pool: spec.worker_pool.clone(),
            description: spec.description.clone(),
            labels: spec.labels.clone(),
            autodeploy: spec.autodeploy,
            autoretry: spec.autoretry,
            github_action_deploy: spec.github_action_deploy,
            local_preview_enabled: spec.local_preview_enabled,
            protect_from_deletion: spec.protect_from_deletion,
            after_apply: spec.after_apply.clone(),
            after_destroy: spec.after_destroy.clone(),
            after_init: spec.after_init.clone(),
            after_perform: spec.after_perform.clone(),
            after_plan: spec.after_plan.clone(),
            after_run: spec.after_run.clone(),
            before_apply: spec.before_apply.clone(),
            before_destroy: spec.before_destroy.clone(),
            before_init: spec.before_init.clone(),
            before_perform: spec.before_perform.clone(),
            before_plan: spec.before_plan.clone(),
            vendor_config: spec.vendor_config.as_ref().map(VendorConfigInput::from_config),
        }
    }
}

/// The remote accepts at most one vendor section; the others stay null.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VendorConfigInput {
    pub ansible: Option<AnsibleInput>,
    pub cloud_formation: Option<CloudFormationInput>,
    pub kubernetes: Option<KubernetesInput>,
    pub pulumi: Option<PulumiInput>,
    pub terraform: Option<TerraformInput>,
    pub terragrunt: Option<TerragruntInput>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnsibleInput {
    pub playbook: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudFormationInput {
    pub entry_template_file: String,
    pub region: String,
    pub stack_name: String,
    pub template_bucket: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesInput {
    pub namespace: String,
    pub kubectl_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PulumiInput {
    pub login_url: String,
    pub stack_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TerraformInput {
    pub version: Option<String>,
    pub workspace: Option<String>,
    pub workflow_tool: Option<String>,
    pub use_smart_sanitization: bool,
    pub external_state_access_enabled: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TerragruntInput {
    pub terraform_version: String,
    pub terragrunt_version: String,
    pub use_run_all: bool,
    pub use_smart_sanitization: bool,
}

impl VendorConfigInput {
    pub fn from_config(config: &VendorConfig) -> Self {
        let mut input = Self::default();
        match config.clone() {
            VendorConfig::Ansible { playbook } => {
                input.ansible = Some(AnsibleInput { playbook });
            }
            VendorConfig::CloudFormation {
                entry_template_file,
                region,
                stack_name,
                template_bucket,
            } => {
                input.cloud_formation = Some(CloudFormationInput {
                    entry_template_file,
                    region,
                    stack_name,
                    template_bucket,
                });
            }
            VendorConfig::Kubernetes {
                namespace,
                kubectl_version,
            } => {
                input.kubernetes = Some(KubernetesInput {
                    namespace,
                    kubectl_version,
                });
            }
            VendorConfig::Pulumi {
                login_url,
                stack_name,
            } => {
                input.pulumi = Some(PulumiInput {
                    login_url,
                    stack_name,
                });
            }
            VendorConfig::Terraform {
                version,
                workspace,
                workflow_tool,
                use_smart_sanitization,
                external_state_access_enabled,
            } => {
                input.terraform = Some(TerraformInput {
                    version,
                    workspace,
                    workflow_tool,
                    use_smart_sanitization,
                    external_state_access_enabled,
                });
            }
            VendorConfig::Terragrunt {
                terraform_version,
                terragrunt_version,
                use_run_all,
                use_smart_sanitization,
            } => {
                input.terragrunt = Some(TerragruntInput {
                    terraform_version,
                    terragrunt_version,
                    use_run_all,
                    use_smart_sanitization,
                });
            }
        }
        input
    }
}

/// Whether a config element is an environment variable or a mounted file.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ConfigType {
    #[serde(rename = "ENVIRONMENT_VARIABLE")]
    EnvironmentVariable,
    #[serde(rename = "FILE_MOUNT")]
    FileMount,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInput {
    pub id: String,
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    pub value: String,
    pub write_only: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StackAttachmentInput {
    pub id: String,
    pub priority: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextInput {
    pub name: String,
    pub space: Option<String>,
    pub description: Option<String>,
    pub labels: Vec<String>,
    pub hooks: Hooks,
    pub stack_attachments: Vec<StackAttachmentInput>,
    pub config_attachments: Vec<ConfigInput>,
}

impl ContextInput {
    pub fn from_context(context: &Context, resolved: &ResolvedContext) -> Self {
        let mut config_attachments = Vec::new();
        for config in &resolved.environment {
            config_attachments.push(ConfigInput {
                id: config.id.clone(),
                config_type: ConfigType::EnvironmentVariable,
                value: config.value.clone(),
                write_only: config.write_only,
                description: config.description.clone(),
            });
        }
        for config in &resolved.mounted_files {
            config_attachments.push(ConfigInput {
                id: config.id.clone(),
                config_type: ConfigType::FileMount,
                value: config.value.clone(),
                write_only: config.write_only,
                description: config.description.clone(),
            });
        }
        Self {
            name: context.name().to_string(),
            space: resolved.space_id.clone(),
            description: context.spec.description.clone(),
            labels: context.spec.labels.clone(),
            hooks: context.spec.hooks.clone(),
            stack_attachments: resolved
                .attachments
                .iter()
                .map(|a| StackAttachmentInput {
                    id: a.target_id.clone(),
                    priority: a.priority,
                })
                .collect(),
            config_attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncline_core::{ObjectMeta, SpaceSpec, SpaceStatus, StackSpec, StackStatus};

    #[test]
    fn test_space_input_uses_name_override() {
        let space = Space {
            meta: ObjectMeta::new("infra", "prod"),
            spec: SpaceSpec {
                name: Some("production".into()),
                parent_space: "root".into(),
                description: "prod workloads".into(),
                inherit_entities: true,
                labels: Some(vec!["env:prod".into()]),
            },
            status: SpaceStatus::default(),
        };
        let input = SpaceInput::from_space(&space);
        assert_eq!(input.name, "production");
        assert_eq!(input.parent_space, "root");
        assert!(input.inherit_entities);
    }

    #[test]
    fn test_stack_input_splits_repository_and_defaults_branch() {
        let stack = Stack {
            meta: ObjectMeta::new("infra", "core"),
            spec: StackSpec {
                repository: "acme/core-infra".into(),
                ..StackSpec::default()
            },
            status: StackStatus::default(),
        };
        let input = StackInput::from_stack(&stack, Some("prod-01HX"));
        assert_eq!(input.namespace.as_deref(), Some("acme"));
        assert_eq!(input.repository, "core-infra");
        assert_eq!(input.branch, "main");
        assert_eq!(input.space.as_deref(), Some("prod-01HX"));
    }

    #[test]
    fn test_vendor_config_fills_exactly_one_section() {
        let input = VendorConfigInput::from_config(&VendorConfig::Ansible {
            playbook: "site.yml".into(),
        });
        assert!(input.ansible.is_some());
        assert!(input.terraform.is_none());
        assert!(input.kubernetes.is_none());

        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["ansible"]["playbook"], "site.yml");
        assert!(value["cloudFormation"].is_null());
    }

    #[test]
    fn test_config_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConfigType::EnvironmentVariable).unwrap(),
            "\"ENVIRONMENT_VARIABLE\""
        );
        assert_eq!(
            serde_json::to_string(&ConfigType::FileMount).unwrap(),
            "\"FILE_MOUNT\""
        );
    }
}
