//! Run repository.
//!
//! Runs are remote-driven: we trigger them and then only ever poll their
//! state. Poll reads deliberately return a partial record so folding it
//! into the status never clears the id or URL.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use syncline_core::{RunRecord, RunState};

use crate::error::RemoteError;

use super::transport::{parse_payload, Operation, RemoteTransport};
use super::RunRemote;

#[derive(Deserialize)]
struct RunPayload {
    id: String,
    #[serde(default)]
    state: Option<RunState>,
}

#[derive(Deserialize)]
struct RunStatePayload {
    state: RunState,
}

pub struct ApiRunRemote {
    transport: Arc<dyn RemoteTransport>,
}

impl ApiRunRemote {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl RunRemote for ApiRunRemote {
    async fn trigger(&self, stack_id: &str) -> Result<RunRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::mutation(
                "runTrigger",
                json!({ "stack": stack_id }),
            ))
            .await?;
        let parsed: RunPayload = parse_payload(payload)?;
        let url = self
            .transport
            .resource_url(&format!("/stack/{stack_id}/run/{}", parsed.id));
        Ok(RunRecord {
            id: Some(parsed.id),
            url: Some(url),
            state: parsed.state,
        })
    }

    async fn get(&self, stack_id: &str, run_id: &str) -> Result<RunRecord, RemoteError> {
        let payload = self
            .transport
            .execute(Operation::query(
                "run",
                json!({ "stack": stack_id, "id": run_id }),
            ))
            .await?;
        if payload.is_null() {
            return Err(RemoteError::not_found("run"));
        }
        let parsed: RunStatePayload = parse_payload(payload)?;
        Ok(RunRecord {
            id: None,
            url: None,
            state: Some(parsed.state),
        })
    }
}
