//! Space reconciler.
//!
//! Spaces are the root of the dependency tree: their parent is a remote
//! slug, so there is nothing to gate on.

use std::sync::Arc;

use async_trait::async_trait;
use syncline_core::{ResourceKey, Space, SpaceRecord};

use crate::error::{ReconcileError, RemoteError, StoreError};
use crate::remote::SpaceRemote;
use crate::store::ObjectStore;

use super::{reconcile, Gate, Outcome, ReconcileSteps};

pub struct SpaceReconciler {
    store: Arc<dyn ObjectStore<Space>>,
    remote: Arc<dyn SpaceRemote>,
}

impl SpaceReconciler {
    pub fn new(store: Arc<dyn ObjectStore<Space>>, remote: Arc<dyn SpaceRemote>) -> Self {
        Self { store, remote }
    }

    pub async fn reconcile(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        reconcile(self, key).await
    }
}

#[async_trait]
impl ReconcileSteps for SpaceReconciler {
    type Object = Space;
    type Record = SpaceRecord;

    fn kind(&self) -> &'static str {
        "Space"
    }

    async fn fetch(&self, key: &ResourceKey) -> Result<Option<Space>, StoreError> {
        self.store.get(key).await
    }

    async fn resolve_dependencies(&self, _space: &mut Space) -> Result<Gate, ReconcileError> {
        Ok(Gate::Proceed)
    }

    async fn remote_get(&self, space: &Space) -> Result<SpaceRecord, RemoteError> {
        self.remote.get(space).await
    }

    async fn remote_create(&self, space: &mut Space) -> Result<SpaceRecord, RemoteError> {
        self.remote.create(space).await
    }

    async fn remote_update(&self, space: &mut Space) -> Result<SpaceRecord, RemoteError> {
        self.remote.update(space).await
    }

    async fn record_created(
        &self,
        space: &mut Space,
        record: &SpaceRecord,
    ) -> Result<(), StoreError> {
        space.meta.set_external_link(&record.url);
        self.store.update(space).await
    }

    fn project_status(&self, space: &mut Space, record: &SpaceRecord) {
        space.apply_record(record);
    }

    async fn write_status(&self, space: &mut Space) -> Result<(), StoreError> {
        self.store.update_status(space).await
    }
}
