//! Reconcilers: one pass per delivered event, driving the remote towards
//! the desired state.
//!
//! Space, Stack, Context and Policy share the same shape and run through
//! the generic [`reconcile`] driver behind [`ReconcileSteps`]; the run
//! lifecycle is different enough (trigger-then-watch instead of converge)
//! to get its own reconciler in [`run`].
//!
//! Failure policy: recoverable situations (write conflicts, unready or
//! missing dependencies) become requeue outcomes. Remote create/update
//! failures end the pass with `Done` after logging; the next externally
//! delivered event retries them. Store read failures surface as errors and
//! rely on event redelivery.

pub mod context;
pub mod policy;
pub mod run;
pub mod space;
pub mod stack;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use syncline_core::ResourceKey;

use crate::error::{ReconcileError, RemoteError, StoreError};

pub use context::ContextReconciler;
pub use policy::PolicyReconciler;
pub use run::RunReconciler;
pub use space::SpaceReconciler;
pub use stack::StackReconciler;

/// A referenced object does not exist yet; it may never appear, so poll
/// lazily.
pub const MISSING_DEPENDENCY_REQUEUE: Duration = Duration::from_secs(10);
/// A referenced object exists but has no remote id yet; that usually
/// resolves within seconds.
pub const PENDING_DEPENDENCY_REQUEUE: Duration = Duration::from_secs(3);
/// A write lost an optimistic-concurrency race; retry shortly.
pub const CONFLICT_REQUEUE: Duration = Duration::from_secs(3);

/// Result of one reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    RequeueAfter(Duration),
}

/// Dependency-gate decision made before touching the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Requeue(Duration),
}

/// The kind-specific steps of a converging reconciler.
#[async_trait]
pub trait ReconcileSteps: Send + Sync {
    /// Working object for the pass; usually the resource plus resolved
    /// dependency ids.
    type Object: Send;
    type Record: Send + Sync;

    fn kind(&self) -> &'static str;

    async fn fetch(&self, key: &ResourceKey) -> Result<Option<Self::Object>, StoreError>;

    /// Gate on referenced objects, resolve the ids mutations need, and
    /// install the owner link once the parent is known and ready.
    async fn resolve_dependencies(&self, object: &mut Self::Object)
        -> Result<Gate, ReconcileError>;

    /// Read the remote counterpart. `NotFound` routes the pass to the
    /// create path.
    async fn remote_get(&self, object: &Self::Object) -> Result<Self::Record, RemoteError>;

    async fn remote_create(&self, object: &mut Self::Object)
        -> Result<Self::Record, RemoteError>;

    async fn remote_update(&self, object: &mut Self::Object)
        -> Result<Self::Record, RemoteError>;

    /// Follow-up after a successful create, before the status write; used
    /// to stamp the external-link annotation.
    async fn record_created(
        &self,
        object: &mut Self::Object,
        record: &Self::Record,
    ) -> Result<(), StoreError> {
        let _ = (object, record);
        Ok(())
    }

    fn project_status(&self, object: &mut Self::Object, record: &Self::Record);

    async fn write_status(&self, object: &mut Self::Object) -> Result<(), StoreError>;
}

/// Drive one reconcile pass through the shared step sequence.
pub async fn reconcile<S: ReconcileSteps>(
    steps: &S,
    key: &ResourceKey,
) -> Result<Outcome, ReconcileError> {
    let Some(mut object) = steps.fetch(key).await? else {
        // Deletions are filtered out by the event predicates; a vanished
        // object is a no-op.
        return Ok(Outcome::Done);
    };

    if let Gate::Requeue(after) = steps.resolve_dependencies(&mut object).await? {
        return Ok(Outcome::RequeueAfter(after));
    }

    let existing = match steps.remote_get(&object).await {
        Ok(record) => Some(record),
        Err(err) if err.is_not_found() => None,
        Err(err) => return Err(err.into()),
    };

    let created = existing.is_none();
    let record = match existing {
        None => match steps.remote_create(&mut object).await {
            Ok(record) => record,
            Err(err) => {
                error!(kind = steps.kind(), key = %key, error = %err, "remote create failed");
                return Ok(Outcome::Done);
            }
        },
        Some(_) => match steps.remote_update(&mut object).await {
            Ok(record) => record,
            Err(err) => {
                error!(kind = steps.kind(), key = %key, error = %err, "remote update failed");
                return Ok(Outcome::Done);
            }
        },
    };

    if created {
        if let Err(err) = steps.record_created(&mut object, &record).await {
            if err.is_conflict() {
                return Ok(Outcome::RequeueAfter(CONFLICT_REQUEUE));
            }
            return Err(err.into());
        }
    }

    steps.project_status(&mut object, &record);
    match steps.write_status(&mut object).await {
        Ok(()) => {
            info!(kind = steps.kind(), key = %key, created, "reconciled");
            Ok(Outcome::Done)
        }
        Err(err) if err.is_conflict() => Ok(Outcome::RequeueAfter(CONFLICT_REQUEUE)),
        Err(err) => Err(err.into()),
    }
}
