//! Top-level wiring: all five reconcilers behind one dispatch surface.

use std::sync::Arc;

use tracing::warn;

use syncline_core::{Context, Policy, ResourceKey, Run, Space, Stack};

use crate::error::ReconcileError;
use crate::reconcile::{
    ContextReconciler, Outcome, PolicyReconciler, RunReconciler, SpaceReconciler, StackReconciler,
};
use crate::remote::{ContextRemote, PolicyRemote, RunRemote, SpaceRemote, StackRemote};
use crate::resolver::DependencyResolver;
use crate::store::{ObjectStore, SecretStore};
use crate::watcher::RunWatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Space,
    Stack,
    Run,
    Context,
    Policy,
}

/// Everything the daemon needs to serve events.
pub struct Controller {
    spaces: SpaceReconciler,
    stacks: StackReconciler,
    runs: RunReconciler,
    contexts: ContextReconciler,
    policies: PolicyReconciler,
    watcher: Arc<RunWatcher>,
}

pub struct Stores {
    pub spaces: Arc<dyn ObjectStore<Space>>,
    pub stacks: Arc<dyn ObjectStore<Stack>>,
    pub runs: Arc<dyn ObjectStore<Run>>,
    pub contexts: Arc<dyn ObjectStore<Context>>,
    pub policies: Arc<dyn ObjectStore<Policy>>,
    pub secrets: Arc<dyn SecretStore>,
}

pub struct Remotes {
    pub spaces: Arc<dyn SpaceRemote>,
    pub stacks: Arc<dyn StackRemote>,
    pub runs: Arc<dyn RunRemote>,
    pub contexts: Arc<dyn ContextRemote>,
    pub policies: Arc<dyn PolicyRemote>,
}

impl Controller {
    pub fn new(stores: Stores, remotes: Remotes) -> Self {
        let resolver = DependencyResolver::new(stores.spaces.clone(), stores.stacks.clone());
        let watcher = Arc::new(RunWatcher::new(stores.runs.clone(), remotes.runs.clone()));
        Self {
            spaces: SpaceReconciler::new(stores.spaces, remotes.spaces),
            stacks: StackReconciler::new(
                stores.stacks.clone(),
                resolver.clone(),
                remotes.stacks.clone(),
            ),
            runs: RunReconciler::new(
                stores.runs,
                resolver.clone(),
                remotes.runs,
                remotes.stacks,
                stores.secrets.clone(),
                watcher.clone(),
            ),
            contexts: ContextReconciler::new(
                stores.contexts,
                stores.secrets,
                resolver.clone(),
                remotes.contexts,
            ),
            policies: PolicyReconciler::new(stores.policies, resolver, remotes.policies),
            watcher,
        }
    }

    pub fn watcher(&self) -> &Arc<RunWatcher> {
        &self.watcher
    }

    /// Serve one delivered event.
    pub async fn dispatch(
        &self,
        kind: ResourceKind,
        key: &ResourceKey,
    ) -> Result<Outcome, ReconcileError> {
        let result = match kind {
            ResourceKind::Space => self.spaces.reconcile(key).await,
            ResourceKind::Stack => self.stacks.reconcile(key).await,
            ResourceKind::Run => self.runs.reconcile(key).await,
            ResourceKind::Context => self.contexts.reconcile(key).await,
            ResourceKind::Policy => self.policies.reconcile(key).await,
        };
        if let Err(err) = &result {
            warn!(?kind, key = %key, error = %err, "reconcile pass failed");
        }
        result
    }
}
