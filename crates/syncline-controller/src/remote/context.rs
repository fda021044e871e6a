//! Context repository.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use syncline_core::{Context, ContextRecord};

use crate::error::RemoteError;
use crate::resolver::ResolvedContext;

use super::inputs::ContextInput;
use super::transport::{parse_payload, Operation, RemoteTransport};
use super::ContextRemote;

#[derive(Deserialize)]
struct ContextPayload {
    id: String,
}

pub struct ApiContextRemote {
    transport: Arc<dyn RemoteTransport>,
}

impl ApiContextRemote {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ContextRemote for ApiContextRemote {
    async fn get(&self, context: &Context) -> Result<ContextRecord, RemoteError> {
        if context.status.id.is_empty() {
            return Err(RemoteError::not_found("context"));
        }
        let payload = self
            .transport
            .execute(Operation::query(
                "context",
                json!({ "id": context.status.id }),
            ))
            .await?;
        if payload.is_null() {
            return Err(RemoteError::not_found("context"));
        }
        let parsed: ContextPayload = parse_payload(payload)?;
        Ok(ContextRecord { id: parsed.id })
    }

    async fn create(
        &self,
        context: &Context,
        resolved: &ResolvedContext,
    ) -> Result<ContextRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "contextCreateV2",
                json!({ "input": ContextInput::from_context(context, resolved) }),
            ))
            .await?;
        let parsed: ContextPayload = parse_payload(payload)?;
        Ok(ContextRecord { id: parsed.id })
    }

    async fn update(
        &self,
        context: &Context,
        resolved: &ResolvedContext,
    ) -> Result<ContextRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "contextUpdateV2",
                json!({
                    "id": context.status.id,
                    "input": ContextInput::from_context(context, resolved),
                    // The input carries the full config set, so stale
                    // elements on the remote are replaced, not merged.
                    "replaceConfigElements": true,
                }),
            ))
            .await?;
        let parsed: ContextPayload = parse_payload(payload)?;
        Ok(ContextRecord { id: parsed.id })
    }
}
