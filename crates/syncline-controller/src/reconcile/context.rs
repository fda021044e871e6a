//! Context reconciler.
//!
//! The heaviest resolution step of the four: besides the space and stack
//! references, every config element sourced from a secret must be read and
//! inlined before the remote mutation. A secret object that does not exist
//! yet requeues (it is usually still being provisioned); a secret that
//! exists but lacks the requested key is a spec bug and fails the pass.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use syncline_core::{
    ConfigElement, Context, ContextRecord, OwnerRef, ResourceKey, SpaceRef,
};

use crate::error::{ReconcileError, RemoteError, StoreError};
use crate::remote::ContextRemote;
use crate::resolver::{
    DependencyResolver, Resolution, ResolvedAttachment, ResolvedConfig, ResolvedContext,
};
use crate::store::{ObjectStore, SecretStore};

use super::{
    reconcile, Gate, Outcome, ReconcileSteps, MISSING_DEPENDENCY_REQUEUE,
    PENDING_DEPENDENCY_REQUEUE,
};

pub struct ContextWork {
    context: Context,
    resolved: ResolvedContext,
}

pub struct ContextReconciler {
    store: Arc<dyn ObjectStore<Context>>,
    secrets: Arc<dyn SecretStore>,
    resolver: DependencyResolver,
    remote: Arc<dyn ContextRemote>,
}

enum ConfigResolution {
    Resolved(ResolvedConfig),
    SecretMissing(String),
}

impl ContextReconciler {
    pub fn new(
        store: Arc<dyn ObjectStore<Context>>,
        secrets: Arc<dyn SecretStore>,
        resolver: DependencyResolver,
        remote: Arc<dyn ContextRemote>,
    ) -> Self {
        Self {
            store,
            secrets,
            resolver,
            remote,
        }
    }

    pub async fn reconcile(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        reconcile(self, key).await
    }

    async fn resolve_config(
        &self,
        namespace: &str,
        element: &ConfigElement,
    ) -> Result<ConfigResolution, ReconcileError> {
        if let Some(selector) = &element.value_from_secret {
            let key = ResourceKey::new(namespace, selector.name.clone());
            let Some(data) = self.secrets.get(&key).await? else {
                return Ok(ConfigResolution::SecretMissing(selector.name.clone()));
            };
            let Some(value) = data.get(&selector.key) else {
                return Err(ReconcileError::SecretKeyMissing {
                    secret: selector.name.clone(),
                    key: selector.key.clone(),
                });
            };
            return Ok(ConfigResolution::Resolved(ResolvedConfig {
                id: element.id.clone(),
                value: value.clone(),
                // Secret-sourced values must never be readable back.
                write_only: true,
                description: element.description.clone(),
            }));
        }
        Ok(ConfigResolution::Resolved(ResolvedConfig {
            id: element.id.clone(),
            value: element.value.clone().unwrap_or_default(),
            write_only: element.secret,
            description: element.description.clone(),
        }))
    }
}

#[async_trait]
impl ReconcileSteps for ContextReconciler {
    type Object = ContextWork;
    type Record = ContextRecord;

    fn kind(&self) -> &'static str {
        "Context"
    }

    async fn fetch(&self, key: &ResourceKey) -> Result<Option<ContextWork>, StoreError> {
        Ok(self.store.get(key).await?.map(|context| ContextWork {
            context,
            resolved: ResolvedContext::default(),
        }))
    }

    async fn resolve_dependencies(&self, work: &mut ContextWork) -> Result<Gate, ReconcileError> {
        let namespace = work.context.meta.namespace.clone();
        let mut resolved = ResolvedContext::default();

        match &work.context.spec.space {
            None => {}
            Some(SpaceRef::Id(id)) => resolved.space_id = Some(id.clone()),
            Some(SpaceRef::Name(name)) => match self.resolver.space(&namespace, name).await? {
                Resolution::Missing => {
                    debug!(space = %name, context = %work.context.meta.name, "space not created yet");
                    return Ok(Gate::Requeue(MISSING_DEPENDENCY_REQUEUE));
                }
                Resolution::NotReady => {
                    info!(space = %name, context = %work.context.meta.name, "space not ready yet");
                    return Ok(Gate::Requeue(PENDING_DEPENDENCY_REQUEUE));
                }
                Resolution::Ready(space) => {
                    if !work.context.meta.has_owner() {
                        self.store
                            .set_owner(
                                &mut work.context,
                                OwnerRef::new("Space", space.meta.name.clone()),
                            )
                            .await?;
                    }
                    resolved.space_id = Some(space.status.id);
                }
            },
        }

        for attachment in &work.context.spec.attachments {
            let priority = attachment.priority.unwrap_or(0);
            if let Some(name) = &attachment.stack_name {
                match self.resolver.stack(&namespace, name).await? {
                    Resolution::Missing => {
                        debug!(stack = %name, context = %work.context.meta.name, "stack not created yet");
                        return Ok(Gate::Requeue(MISSING_DEPENDENCY_REQUEUE));
                    }
                    Resolution::NotReady => {
                        info!(stack = %name, context = %work.context.meta.name, "stack not ready yet");
                        return Ok(Gate::Requeue(PENDING_DEPENDENCY_REQUEUE));
                    }
                    Resolution::Ready(stack) => resolved.attachments.push(ResolvedAttachment {
                        target_id: stack.status.id,
                        priority,
                    }),
                }
            } else if let Some(id) = attachment.stack_id.clone().or_else(|| attachment.module_id.clone()) {
                resolved.attachments.push(ResolvedAttachment {
                    target_id: id,
                    priority,
                });
            }
        }

        for element in &work.context.spec.environment {
            match self.resolve_config(&namespace, element).await? {
                ConfigResolution::Resolved(config) => resolved.environment.push(config),
                ConfigResolution::SecretMissing(name) => {
                    info!(secret = %name, context = %work.context.meta.name, "secret not available yet");
                    return Ok(Gate::Requeue(PENDING_DEPENDENCY_REQUEUE));
                }
            }
        }
        for element in &work.context.spec.mounted_files {
            match self.resolve_config(&namespace, element).await? {
                ConfigResolution::Resolved(config) => resolved.mounted_files.push(config),
                ConfigResolution::SecretMissing(name) => {
                    info!(secret = %name, context = %work.context.meta.name, "secret not available yet");
                    return Ok(Gate::Requeue(PENDING_DEPENDENCY_REQUEUE));
                }
            }
        }

        work.resolved = resolved;
        Ok(Gate::Proceed)
    }

    async fn remote_get(&self, work: &ContextWork) -> Result<ContextRecord, RemoteError> {
        self.remote.get(&work.context).await
    }

    async fn remote_create(&self, work: &mut ContextWork) -> Result<ContextRecord, RemoteError> {
        self.remote.create(&work.context, &work.resolved).await
    }

    async fn remote_update(&self, work: &mut ContextWork) -> Result<ContextRecord, RemoteError> {
        self.remote.update(&work.context, &work.resolved).await
    }

    fn project_status(&self, work: &mut ContextWork, record: &ContextRecord) {
        work.context.apply_record(record);
    }

    async fn write_status(&self, work: &mut ContextWork) -> Result<(), StoreError> {
        self.store.update_status(&mut work.context).await
    }
}
