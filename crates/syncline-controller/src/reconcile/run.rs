//! Run reconciler.
//!
//! Runs do not converge like the other kinds; they are triggered once and
//! then observed. The first pass triggers the remote run and records its
//! identity; follow-up passes (delivered on status movement) hand the run
//! to the watcher, and once a run finishes, optionally materialize the
//! stack outputs into a secret.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, error, info, warn};

use syncline_core::{OwnerRef, ResourceKey, Run, Stack};

use crate::error::ReconcileError;
use crate::remote::{RunRemote, StackRemote};
use crate::resolver::{DependencyResolver, Resolution};
use crate::store::{ObjectStore, SecretStore};
use crate::watcher::RunWatcher;

use super::{
    Outcome, CONFLICT_REQUEUE, MISSING_DEPENDENCY_REQUEUE, PENDING_DEPENDENCY_REQUEUE,
};

/// Keys that can be stored in a secret; outputs not matching are skipped.
fn valid_secret_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-._a-zA-Z0-9]+$").unwrap())
}

pub struct RunReconciler {
    runs: Arc<dyn ObjectStore<Run>>,
    resolver: DependencyResolver,
    remote: Arc<dyn RunRemote>,
    stack_remote: Arc<dyn StackRemote>,
    secrets: Arc<dyn SecretStore>,
    watcher: Arc<RunWatcher>,
}

impl RunReconciler {
    pub fn new(
        runs: Arc<dyn ObjectStore<Run>>,
        resolver: DependencyResolver,
        remote: Arc<dyn RunRemote>,
        stack_remote: Arc<dyn StackRemote>,
        secrets: Arc<dyn SecretStore>,
        watcher: Arc<RunWatcher>,
    ) -> Self {
        Self {
            runs,
            resolver,
            remote,
            stack_remote,
            secrets,
            watcher,
        }
    }

    pub async fn reconcile(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        let Some(mut run) = self.runs.get(key).await? else {
            return Ok(Outcome::Done);
        };

        let stack = match self
            .resolver
            .stack(&run.meta.namespace, &run.spec.stack_name)
            .await?
        {
            Resolution::Missing => {
                debug!(stack = %run.spec.stack_name, run = %run.meta.name, "stack not created yet");
                return Ok(Outcome::RequeueAfter(MISSING_DEPENDENCY_REQUEUE));
            }
            Resolution::NotReady => {
                info!(stack = %run.spec.stack_name, run = %run.meta.name, "stack not ready yet");
                return Ok(Outcome::RequeueAfter(PENDING_DEPENDENCY_REQUEUE));
            }
            Resolution::Ready(stack) => stack,
        };

        if !run.meta.has_owner() {
            self.runs
                .set_owner(&mut run, OwnerRef::new("Stack", stack.meta.name.clone()))
                .await?;
        }

        if run.is_new() {
            self.trigger(run, &stack).await
        } else {
            self.follow_up(run, &stack).await
        }
    }

    async fn trigger(&self, mut run: Run, stack: &Stack) -> Result<Outcome, ReconcileError> {
        let record = match self.remote.trigger(&stack.status.id).await {
            Ok(record) => record,
            Err(err) => {
                // Not requeued; the next delivered event retries.
                error!(run = %run.meta.name, stack = %stack.status.id, error = %err, "failed to trigger run");
                return Ok(Outcome::Done);
            }
        };

        if let Some(url) = &record.url {
            run.meta.set_external_link(url);
            match self.runs.update(&mut run).await {
                Ok(()) => {}
                Err(err) if err.is_conflict() => {
                    return Ok(Outcome::RequeueAfter(CONFLICT_REQUEUE))
                }
                Err(err) => return Err(err.into()),
            }
        }

        run.status.stack_id = stack.status.id.clone();
        run.apply_record(&record);
        match self.runs.update_status(&mut run).await {
            Ok(()) => {}
            Err(err) if err.is_conflict() => return Ok(Outcome::RequeueAfter(CONFLICT_REQUEUE)),
            Err(err) => return Err(err.into()),
        }
        info!(
            run = %run.meta.name,
            run_id = %run.status.id,
            stack = %run.status.stack_id,
            "run triggered"
        );
        Ok(Outcome::Done)
    }

    async fn follow_up(&self, run: Run, stack: &Stack) -> Result<Outcome, ReconcileError> {
        if !run.is_terminated() {
            if !self.watcher.is_watched(&run.status.id) {
                self.watcher.start(&run)?;
            }
            return Ok(Outcome::Done);
        }
        if run.is_finished() && run.spec.create_secret_from_stack_output {
            self.write_output_secret(&run, stack).await?;
        }
        Ok(Outcome::Done)
    }

    async fn write_output_secret(&self, run: &Run, stack: &Stack) -> Result<(), ReconcileError> {
        let record = self.stack_remote.get(stack).await?;
        let mut data = BTreeMap::new();
        for output in record.outputs {
            if !valid_secret_key().is_match(&output.id) {
                warn!(run = %run.meta.name, output = %output.id, "skipping output with invalid key");
                continue;
            }
            data.insert(output.id, output.value);
        }
        let key = ResourceKey::new(
            run.meta.namespace.clone(),
            format!("{}-outputs", stack.meta.name),
        );
        self.secrets.upsert(&key, data).await?;
        info!(run = %run.meta.name, secret = %key, "stack outputs written to secret");
        Ok(())
    }
}
