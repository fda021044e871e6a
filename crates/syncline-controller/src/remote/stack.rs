//! Stack repository.
//!
//! Besides the stack object itself, the update path converges the (at most
//! one) cloud-integration attachment and the tracked commit, both of which
//! the remote models as separate mutations.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use syncline_core::{diff_integrations, IntegrationAttachment, Stack, StackOutput, StackRecord};

use crate::error::RemoteError;

use super::inputs::StackInput;
use super::slug::safe_slug;
use super::transport::{parse_payload, Operation, RemoteTransport};
use super::StackRemote;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StackPayload {
    id: String,
    #[serde(default)]
    tracked_commit: Option<CommitPayload>,
    #[serde(default)]
    attached_aws_integrations: Vec<IntegrationPayload>,
    #[serde(default)]
    outputs: Vec<OutputPayload>,
}

#[derive(Deserialize)]
struct CommitPayload {
    hash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationPayload {
    id: String,
    integration_id: String,
    read: bool,
    write: bool,
}

#[derive(Deserialize)]
struct OutputPayload {
    id: String,
    value: String,
}

pub struct ApiStackRemote {
    transport: Arc<dyn RemoteTransport>,
}

impl ApiStackRemote {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }

    /// Remote id of the stack: the reported one when known, otherwise the
    /// slug the remote will have derived from the name.
    fn stack_id(stack: &Stack) -> String {
        if stack.status.id.is_empty() {
            safe_slug(stack.name())
        } else {
            stack.status.id.clone()
        }
    }

    fn record(&self, payload: StackPayload) -> StackRecord {
        let url = self.transport.resource_url(&format!("/stack/{}", payload.id));
        StackRecord {
            id: payload.id,
            url: Some(url),
            tracked_commit: payload.tracked_commit.map(|c| c.hash),
            outputs: payload
                .outputs
                .into_iter()
                .map(|o| StackOutput {
                    id: o.id,
                    value: o.value,
                })
                .collect(),
        }
    }

    async fn attach_integration(&self, stack: &Stack, stack_id: &str) -> Result<(), RemoteError> {
        let Some(integration) = &stack.spec.aws_integration else {
            return Ok(());
        };
        self.transport
            .execute(Operation::mutation(
                "awsIntegrationAttach",
                json!({
                    "id": integration.id,
                    "stack": stack_id,
                    "read": integration.read,
                    "write": integration.write,
                }),
            ))
            .await?;
        Ok(())
    }

    async fn set_tracked_commit(&self, stack_id: &str, sha: &str) -> Result<(), RemoteError> {
        self.transport
            .execute(Operation::mutation(
                "stackSetCurrentCommit",
                json!({ "stack": stack_id, "sha": sha }),
            ))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StackRemote for ApiStackRemote {
    async fn get(&self, stack: &Stack) -> Result<StackRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::query(
                "stack",
                json!({ "id": Self::stack_id(stack) }),
            ))
            .await?;
        if payload.is_null() {
            return Err(RemoteError::not_found("stack"));
        }
        let parsed: StackPayload = parse_payload(payload)?;
        let mut record = self.record(parsed);
        // Reads never carry the UI link; only create/update refresh it.
        record.url = None;
        Ok(record)
    }

    async fn create(
        &self,
        stack: &Stack,
        space_id: Option<&str>,
    ) -> Result<StackRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "stackCreate",
                json!({
                    "input": StackInput::from_stack(stack, space_id),
                    "manageState": stack.spec.manages_state_file.unwrap_or(true),
                }),
            ))
            .await?;
        let parsed: StackPayload = parse_payload(payload)?;
        let mut record = self.record(parsed);

        self.attach_integration(stack, &record.id).await?;
        if let Some(sha) = &stack.spec.commit_sha {
            if !sha.is_empty() {
                self.set_tracked_commit(&record.id, sha).await?;
                record.tracked_commit = Some(sha.clone());
            }
        }
        Ok(record)
    }

    async fn update(
        &self,
        stack: &Stack,
        space_id: Option<&str>,
    ) -> Result<StackRecord, RemoteError> {
        let stack_id = Self::stack_id(stack);
        let payload = self
            .transport
            .execute(Operation::mutation(
                "stackUpdate",
                json!({
                    "id": stack_id,
                    "input": StackInput::from_stack(stack, space_id),
                }),
            ))
            .await?;
        let parsed: StackPayload = parse_payload(payload)?;

        let attached: Vec<IntegrationAttachment> = parsed
            .attached_aws_integrations
            .iter()
            .map(|i| IntegrationAttachment {
                attachment_id: i.id.clone(),
                integration_id: i.integration_id.clone(),
                read: i.read,
                write: i.write,
            })
            .collect();
        let diff = diff_integrations(stack.spec.aws_integration.as_ref(), &attached);
        for attachment_id in &diff.to_detach {
            self.transport
                .execute(Operation::mutation(
                    "awsIntegrationDetach",
                    json!({ "id": attachment_id }),
                ))
                .await?;
        }
        if diff.needs_attach {
            self.attach_integration(stack, &stack_id).await?;
        }

        let mut record = self.record(parsed);
        if let Some(sha) = &stack.spec.commit_sha {
            if !sha.is_empty() && record.tracked_commit.as_deref() != Some(sha) {
                self.set_tracked_commit(&stack_id, sha).await?;
                record.tracked_commit = Some(sha.clone());
            }
        }
        Ok(record)
    }
}
