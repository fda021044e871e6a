//! Policy repository.
//!
//! Policy-to-stack attachments are converged through the diff engine: the
//! update path reads back what the remote reports as attached and issues
//! only the minimal attach/detach mutations. Entries the remote attached by
//! itself (label-based auto-attachment) are never detached.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use syncline_core::{diff_attachments, Policy, PolicyRecord, RemoteAttachment};

use crate::error::RemoteError;

use super::transport::{parse_payload, Operation, RemoteTransport};
use super::PolicyRemote;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyPayload {
    id: String,
    #[serde(default)]
    attached_stacks: Vec<AttachedStackPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachedStackPayload {
    id: String,
    stack_id: String,
    #[serde(default)]
    is_autoattached: bool,
}

pub struct ApiPolicyRemote {
    transport: Arc<dyn RemoteTransport>,
}

impl ApiPolicyRemote {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }

    fn input(policy: &Policy, space_id: Option<&str>) -> serde_json::Value {
        json!({
            "name": policy.name(),
            "body": policy.spec.body,
            "type": policy.spec.policy_type,
            "description": policy.spec.description,
            "labels": policy.spec.labels,
            "space": space_id,
        })
    }

    async fn converge_attachments(
        &self,
        policy_id: &str,
        desired: &[String],
        attached: &[AttachedStackPayload],
    ) -> Result<(), RemoteError> {
        let remote: Vec<RemoteAttachment> = attached
            .iter()
            .map(|a| RemoteAttachment {
                attachment_id: a.id.clone(),
                target_id: a.stack_id.clone(),
                auto_attached: a.is_autoattached,
            })
            .collect();
        let diff = diff_attachments(desired, &remote);
        for attachment_id in &diff.to_detach {
            self.transport
                .execute(Operation::mutation(
                    "policyDetach",
                    json!({ "id": attachment_id }),
                ))
                .await?;
        }
        for target in &diff.to_attach {
            self.transport
                .execute(Operation::mutation(
                    "policyAttach",
                    json!({ "id": policy_id, "stack": target }),
                ))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyRemote for ApiPolicyRemote {
    async fn get(&self, policy: &Policy) -> Result<PolicyRecord, RemoteError> {
        if policy.status.id.is_empty() {
            return Err(RemoteError::not_found("policy"));
        }
        let payload = self
            .transport
            .execute(Operation::query("policy", json!({ "id": policy.status.id })))
            .await?;
        if payload.is_null() {
            return Err(RemoteError::not_found("policy"));
        }
        let parsed: PolicyPayload = parse_payload(payload)?;
        Ok(PolicyRecord { id: parsed.id })
    }

    async fn create(
        &self,
        policy: &Policy,
        space_id: Option<&str>,
        stack_ids: &[String],
    ) -> Result<PolicyRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "policyCreate",
                json!({ "input": Self::input(policy, space_id) }),
            ))
            .await?;
        let parsed: PolicyPayload = parse_payload(payload)?;
        self.converge_attachments(&parsed.id, stack_ids, &parsed.attached_stacks)
            .await?;
        Ok(PolicyRecord { id: parsed.id })
    }

    async fn update(
        &self,
        policy: &Policy,
        space_id: Option<&str>,
        stack_ids: &[String],
    ) -> Result<PolicyRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "policyUpdate",
                json!({
                    "id": policy.status.id,
                    "input": Self::input(policy, space_id),
                }),
            ))
            .await?;
        let parsed: PolicyPayload = parse_payload(payload)?;
        self.converge_attachments(&parsed.id, stack_ids, &parsed.attached_stacks)
            .await?;
        Ok(PolicyRecord { id: parsed.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedTransport;
    use syncline_core::{ObjectMeta, PolicySpec, PolicyStatus, PolicyType};

    fn policy() -> Policy {
        Policy {
            meta: ObjectMeta::new("infra", "require-approval"),
            spec: PolicySpec {
                name: None,
                body: "package spacelift".into(),
                policy_type: PolicyType::Approval,
                description: None,
                labels: vec![],
                space: None,
                attached_stack_names: vec![],
                attached_stack_ids: vec![],
            },
            status: PolicyStatus::default(),
        }
    }

    #[tokio::test]
    async fn test_create_attaches_desired_stacks() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_payload(json!({ "id": "policy-01" }));
        transport.push_payload(json!({ "id": "att-1" }));
        let remote = ApiPolicyRemote::new(transport.clone());

        let record = remote
            .create(&policy(), Some("prod-01HX"), &["core-infra".into()])
            .await
            .unwrap();
        assert_eq!(record.id, "policy-01");

        let calls = transport.calls();
        assert_eq!(calls[0].name, "policyCreate");
        assert_eq!(calls[0].variables["input"]["type"], "APPROVAL");
        assert_eq!(calls[0].variables["input"]["space"], "prod-01HX");
        assert_eq!(calls[1].name, "policyAttach");
        assert_eq!(calls[1].variables["stack"], "core-infra");
    }

    #[tokio::test]
    async fn test_update_never_detaches_auto_attached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_payload(json!({
            "id": "policy-01",
            "attachedStacks": [
                { "id": "att-1", "stackId": "labelled", "isAutoattached": true },
                { "id": "att-2", "stackId": "stale", "isAutoattached": false },
            ],
        }));
        transport.push_payload(json!({ "id": "att-2" }));
        let remote = ApiPolicyRemote::new(transport.clone());

        let mut known = policy();
        known.status.id = "policy-01".into();
        remote.update(&known, None, &[]).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].name, "policyDetach");
        assert_eq!(calls[1].variables["id"], "att-2");
    }
}
