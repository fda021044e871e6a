//! Domain model for syncline.
//!
//! Pure types only: desired-state resources (spec + status), the run state
//! machine, health projection, the attachment diff engine and remote record
//! types. Everything that talks to a store or the remote API lives in
//! `syncline-controller`.

pub mod context;
pub mod diff;
pub mod health;
pub mod meta;
pub mod policy;
pub mod record;
pub mod run;
pub mod space;
pub mod stack;
pub mod trigger;

pub use context::{ConfigElement, Context, ContextAttachment, ContextSpec, ContextStatus, Hooks, SecretKeySelector};
pub use diff::{diff_attachments, diff_integrations, AttachmentDiff, IntegrationAttachment, IntegrationDiff, RemoteAttachment};
pub use health::Health;
pub use meta::{ObjectMeta, OwnerRef, Resource, ResourceKey, SpaceRef, EXTERNAL_LINK_ANNOTATION};
pub use policy::{Policy, PolicySpec, PolicyStatus, PolicyType};
pub use record::{ContextRecord, PolicyRecord, RunRecord, SpaceRecord, StackOutput, StackRecord};
pub use run::{Run, RunSpec, RunState, RunStatus};
pub use space::{Space, SpaceSpec, SpaceStatus};
pub use stack::{AwsIntegration, Stack, StackSpec, StackStatus, VendorConfig};
