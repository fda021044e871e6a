//! Space repository.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use syncline_core::{Space, SpaceRecord};

use crate::error::RemoteError;

use super::inputs::SpaceInput;
use super::transport::{parse_payload, Operation, RemoteTransport};
use super::SpaceRemote;

#[derive(Deserialize)]
struct SpacePayload {
    id: String,
}

pub struct ApiSpaceRemote {
    transport: Arc<dyn RemoteTransport>,
}

impl ApiSpaceRemote {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }

    fn record(&self, id: String) -> SpaceRecord {
        let url = self.transport.resource_url(&format!("/spaces/{id}"));
        SpaceRecord { id, url }
    }
}

#[async_trait]
impl SpaceRemote for ApiSpaceRemote {
    async fn get(&self, space: &Space) -> Result<SpaceRecord, RemoteError> {
        if space.status.id.is_empty() {
            return Err(RemoteError::not_found("space"));
        }
        let payload = self
            .transport
            .execute(Operation::query("space", json!({ "id": space.status.id })))
            .await?;
        if payload.is_null() {
            return Err(RemoteError::not_found("space"));
        }
        let parsed: SpacePayload = parse_payload(payload)?;
        Ok(self.record(parsed.id))
    }

    async fn create(&self, space: &Space) -> Result<SpaceRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "spaceCreate",
                json!({ "input": SpaceInput::from_space(space) }),
            ))
            .await?;
        let parsed: SpacePayload = parse_payload(payload)?;
        Ok(self.record(parsed.id))
    }

    async fn update(&self, space: &Space) -> Result<SpaceRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "spaceUpdate",
                json!({
                    "space": space.status.id,
                    "input": SpaceInput::from_space(space),
                }),
            ))
            .await?;
        let parsed: SpacePayload = parse_payload(payload)?;
        Ok(self.record(parsed.id))
    }
}
