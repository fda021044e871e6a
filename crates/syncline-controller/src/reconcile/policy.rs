//! Policy reconciler.
//!
//! Before touching the remote, every by-name stack reference must resolve
//! to a ready stack; the pass gates on the first one that does not.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use syncline_core::{OwnerRef, Policy, PolicyRecord, ResourceKey, SpaceRef};

use crate::error::{ReconcileError, RemoteError, StoreError};
use crate::remote::PolicyRemote;
use crate::resolver::{DependencyResolver, Resolution};
use crate::store::ObjectStore;

use super::{
    reconcile, Gate, Outcome, ReconcileSteps, MISSING_DEPENDENCY_REQUEUE,
    PENDING_DEPENDENCY_REQUEUE,
};

pub struct PolicyWork {
    policy: Policy,
    space_id: Option<String>,
    stack_ids: Vec<String>,
}

pub struct PolicyReconciler {
    store: Arc<dyn ObjectStore<Policy>>,
    resolver: DependencyResolver,
    remote: Arc<dyn PolicyRemote>,
}

impl PolicyReconciler {
    pub fn new(
        store: Arc<dyn ObjectStore<Policy>>,
        resolver: DependencyResolver,
        remote: Arc<dyn PolicyRemote>,
    ) -> Self {
        Self {
            store,
            resolver,
            remote,
        }
    }

    pub async fn reconcile(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        reconcile(self, key).await
    }
}

#[async_trait]
impl ReconcileSteps for PolicyReconciler {
    type Object = PolicyWork;
    type Record = PolicyRecord;

    fn kind(&self) -> &'static str {
        "Policy"
    }

    async fn fetch(&self, key: &ResourceKey) -> Result<Option<PolicyWork>, StoreError> {
        Ok(self.store.get(key).await?.map(|policy| PolicyWork {
            policy,
            space_id: None,
            stack_ids: Vec::new(),
        }))
    }

    async fn resolve_dependencies(&self, work: &mut PolicyWork) -> Result<Gate, ReconcileError> {
        let namespace = work.policy.meta.namespace.clone();

        match &work.policy.spec.space {
            None => {}
            Some(SpaceRef::Id(id)) => work.space_id = Some(id.clone()),
            Some(SpaceRef::Name(name)) => match self.resolver.space(&namespace, name).await? {
                Resolution::Missing => {
                    debug!(space = %name, policy = %work.policy.meta.name, "space not created yet");
                    return Ok(Gate::Requeue(MISSING_DEPENDENCY_REQUEUE));
                }
                Resolution::NotReady => {
                    info!(space = %name, policy = %work.policy.meta.name, "space not ready yet");
                    return Ok(Gate::Requeue(PENDING_DEPENDENCY_REQUEUE));
                }
                Resolution::Ready(space) => {
                    if !work.policy.meta.has_owner() {
                        self.store
                            .set_owner(
                                &mut work.policy,
                                OwnerRef::new("Space", space.meta.name.clone()),
                            )
                            .await?;
                    }
                    work.space_id = Some(space.status.id);
                }
            },
        }

        let mut stack_ids: Vec<String> = work.policy.spec.attached_stack_ids.clone();
        for name in &work.policy.spec.attached_stack_names {
            match self.resolver.stack(&namespace, name).await? {
                Resolution::Missing => {
                    debug!(stack = %name, policy = %work.policy.meta.name, "stack not created yet");
                    return Ok(Gate::Requeue(MISSING_DEPENDENCY_REQUEUE));
                }
                Resolution::NotReady => {
                    info!(stack = %name, policy = %work.policy.meta.name, "stack not ready yet");
                    return Ok(Gate::Requeue(PENDING_DEPENDENCY_REQUEUE));
                }
                Resolution::Ready(stack) => {
                    if !stack_ids.contains(&stack.status.id) {
                        stack_ids.push(stack.status.id);
                    }
                }
            }
        }
        work.stack_ids = stack_ids;
        Ok(Gate::Proceed)
    }

    async fn remote_get(&self, work: &PolicyWork) -> Result<PolicyRecord, RemoteError> {
        self.remote.get(&work.policy).await
    }

    async fn remote_create(&self, work: &mut PolicyWork) -> Result<PolicyRecord, RemoteError> {
        self.remote
            .create(&work.policy, work.space_id.as_deref(), &work.stack_ids)
            .await
    }

    async fn remote_update(&self, work: &mut PolicyWork) -> Result<PolicyRecord, RemoteError> {
        self.remote
            .update(&work.policy, work.space_id.as_deref(), &work.stack_ids)
            .await
    }

    fn project_status(&self, work: &mut PolicyWork, record: &PolicyRecord) {
        work.policy.apply_record(record);
    }

    async fn write_status(&self, work: &mut PolicyWork) -> Result<(), StoreError> {
        self.store.update_status(&mut work.policy).await
    }
}
