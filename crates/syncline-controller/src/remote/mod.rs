//! Remote backend repositories.
//!
//! One trait per resource kind, with an HTTP implementation built on
//! [`transport::RemoteTransport`] and scripted fakes in [`crate::fakes`].
//! `get` methods answer [`RemoteError::NotFound`](crate::RemoteError) when
//! the object does not exist remotely; reconcilers branch to the create path
//! on that sentinel.

pub mod context;
pub mod inputs;
pub mod policy;
pub mod run;
pub mod slug;
pub mod space;
pub mod stack;
pub mod transport;

use async_trait::async_trait;
use syncline_core::{
    Context, ContextRecord, Policy, PolicyRecord, RunRecord, Space, SpaceRecord, Stack,
    StackRecord,
};

use crate::error::RemoteError;
use crate::resolver::ResolvedContext;

pub use context::ApiContextRemote;
pub use policy::ApiPolicyRemote;
pub use run::ApiRunRemote;
pub use space::ApiSpaceRemote;
pub use stack::ApiStackRemote;
pub use transport::{HttpTransport, Operation, OperationKind, RemoteTransport};

#[async_trait]
pub trait SpaceRemote: Send + Sync {
    async fn get(&self, space: &Space) -> Result<SpaceRecord, RemoteError>;
    async fn create(&self, space: &Space) -> Result<SpaceRecord, RemoteError>;
    async fn update(&self, space: &Space) -> Result<SpaceRecord, RemoteError>;
}

#[async_trait]
pub trait StackRemote: Send + Sync {
    async fn get(&self, stack: &Stack) -> Result<StackRecord, RemoteError>;
    /// `space_id` is the resolved remote space, when the spec names one.
    async fn create(&self, stack: &Stack, space_id: Option<&str>)
        -> Result<StackRecord, RemoteError>;
    /// Also converges the cloud-integration attachment.
    async fn update(&self, stack: &Stack, space_id: Option<&str>)
        -> Result<StackRecord, RemoteError>;
}

#[async_trait]
pub trait ContextRemote: Send + Sync {
    async fn get(&self, context: &Context) -> Result<ContextRecord, RemoteError>;
    /// `resolved` carries the space id, stack attachments and config values
    /// after dependency and secret resolution.
    async fn create(
        &self,
        context: &Context,
        resolved: &ResolvedContext,
    ) -> Result<ContextRecord, RemoteError>;
    async fn update(
        &self,
        context: &Context,
        resolved: &ResolvedContext,
    ) -> Result<ContextRecord, RemoteError>;
}

#[async_trait]
pub trait PolicyRemote: Send + Sync {
    async fn get(&self, policy: &Policy) -> Result<PolicyRecord, RemoteError>;
    /// `stack_ids` are the resolved remote ids of every stack the policy
    /// should be attached to. Create attaches them; update converges the
    /// attachment set without ever touching auto-attached entries.
    async fn create(
        &self,
        policy: &Policy,
        space_id: Option<&str>,
        stack_ids: &[String],
    ) -> Result<PolicyRecord, RemoteError>;
    async fn update(
        &self,
        policy: &Policy,
        space_id: Option<&str>,
        stack_ids: &[String],
    ) -> Result<PolicyRecord, RemoteError>;
}

#[async_trait]
pub trait RunRemote: Send + Sync {
    async fn trigger(&self, stack_id: &str) -> Result<RunRecord, RemoteError>;
    async fn get(&self, stack_id: &str, run_id: &str) -> Result<RunRecord, RemoteError>;
}
