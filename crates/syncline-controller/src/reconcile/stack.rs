//! Stack reconciler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use syncline_core::{OwnerRef, ResourceKey, SpaceRef, Stack, StackRecord};

use crate::error::{ReconcileError, RemoteError, StoreError};
use crate::remote::StackRemote;
use crate::resolver::{DependencyResolver, Resolution};
use crate::store::ObjectStore;

use super::{
    reconcile, Gate, Outcome, ReconcileSteps, MISSING_DEPENDENCY_REQUEUE,
    PENDING_DEPENDENCY_REQUEUE,
};

/// Working state of one stack pass: the object plus the resolved remote
/// space id, when the spec references one.
pub struct StackWork {
    stack: Stack,
    space_id: Option<String>,
}

pub struct StackReconciler {
    store: Arc<dyn ObjectStore<Stack>>,
    resolver: DependencyResolver,
    remote: Arc<dyn StackRemote>,
}

impl StackReconciler {
    pub fn new(
        store: Arc<dyn ObjectStore<Stack>>,
        resolver: DependencyResolver,
        remote: Arc<dyn StackRemote>,
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
impl ReconcileSteps for StackReconciler {
    type Object = StackWork;
    type Record = StackRecord;

    fn kind(&self) -> &'static str {
        "Stack"
    }

    async fn fetch(&self, key: &ResourceKey) -> Result<Option<StackWork>, StoreError> {
        Ok(self.store.get(key).await?.map(|stack| StackWork {
            stack,
            space_id: None,
        }))
    }

    async fn resolve_dependencies(&self, work: &mut StackWork) -> Result<Gate, ReconcileError> {
        match &work.stack.spec.space {
            None => Ok(Gate::Proceed),
            Some(SpaceRef::Id(id)) => {
                work.space_id = Some(id.clone());
                Ok(Gate::Proceed)
            }
            Some(SpaceRef::Name(name)) => {
                let namespace = work.stack.meta.namespace.clone();
                match self.resolver.space(&namespace, name).await? {
                    Resolution::Missing => {
                        debug!(space = %name, stack = %work.stack.meta.name, "space not created yet");
                        Ok(Gate::Requeue(MISSING_DEPENDENCY_REQUEUE))
                    }
                    Resolution::NotReady => {
                        info!(space = %name, stack = %work.stack.meta.name, "space not ready yet");
                        Ok(Gate::Requeue(PENDING_DEPENDENCY_REQUEUE))
                    }
                    Resolution::Ready(space) => {
                        if !work.stack.meta.has_owner() {
                            self.store
                                .set_owner(
                                    &mut work.stack,
                                    OwnerRef::new("Space", space.meta.name.clone()),
                                )
                                .await?;
                        }
                        work.space_id = Some(space.status.id);
                        Ok(Gate::Proceed)
                    }
                }
            }
        }
    }

    async fn remote_get(&self, work: &StackWork) -> Result<StackRecord, RemoteError> {
        self.remote.get(&work.stack).await
    }

    async fn remote_create(&self, work: &mut StackWork) -> Result<StackRecord, RemoteError> {
        self.remote
            .create(&work.stack, work.space_id.as_deref())
            .await
    }

    async fn remote_update(&self, work: &mut StackWork) -> Result<StackRecord, RemoteError> {
        self.remote
            .update(&work.stack, work.space_id.as_deref())
            .await
    }

    async fn record_created(
        &self,
        work: &mut StackWork,
        record: &StackRecord,
    ) -> Result<(), StoreError> {
        let Some(url) = &record.url else {
            return Ok(());
        };
        work.stack.meta.set_external_link(url);
        self.store.update(&mut work.stack).await
    }

    fn project_status(&self, work: &mut StackWork, record: &StackRecord) {
        work.stack.apply_record(record);
    }

    async fn write_status(&self, work: &mut StackWork) -> Result<(), StoreError> {
        self.store.update_status(&mut work.stack).await
    }
}
