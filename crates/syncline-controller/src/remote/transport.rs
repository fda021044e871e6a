//! Transport layer for the remote API.
//!
//! The backend speaks a GraphQL-flavored protocol: every call is a named
//! operation with a JSON variable bag, and the interesting payload sits
//! under the operation name in the response's `data` object. Repositories
//! only deal in [`Operation`]s; the transport owns auth and HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// One remote API call.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    /// Remote operation name, e.g. `stackCreate`.
    pub name: &'static str,
    pub variables: Value,
}

impl Operation {
    pub fn query(name: &'static str, variables: Value) -> Self {
        Self {
            kind: OperationKind::Query,
            name,
            variables,
        }
    }

    pub fn mutation(name: &'static str, variables: Value) -> Self {
        Self {
            kind: OperationKind::Mutation,
            name,
            variables,
        }
    }
}

#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Execute one operation and return the payload under the operation
    /// name. A `null` payload means the queried object does not exist;
    /// repositories map it to their kind-specific not-found sentinel.
    async fn execute(&self, op: Operation) -> Result<Value, RemoteError>;

    /// Browser-facing URL for a remote resource path such as `/spaces/prod`.
    fn resource_url(&self, path: &str) -> String;
}

/// Decode a non-null payload into a typed view.
pub(crate) fn parse_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, RemoteError> {
    serde_json::from_value(payload).map_err(|err| RemoteError::Payload(err.to_string()))
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    base_url: String,
    token: String,
}

impl HttpTransport {
    /// `base_url` is the account root, e.g. `https://acme.backend.example.com`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{base_url}/graphql"),
            base_url,
            token: token.into(),
        }
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn execute(&self, op: Operation) -> Result<Value, RemoteError> {
        let body = serde_json::json!({
            "operationName": op.name,
            "variables": op.variables,
        });
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: ApiResponse = response.json().await?;
        if let Some(err) = parsed.errors.first() {
            return Err(RemoteError::Payload(err.message.clone()));
        }
        match parsed.data {
            Value::Object(mut data) => Ok(data.remove(op.name).unwrap_or(Value::Null)),
            Value::Null => Ok(Value::Null),
            other => Err(RemoteError::Payload(format!(
                "expected an object under data, got {other}"
            ))),
        }
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
