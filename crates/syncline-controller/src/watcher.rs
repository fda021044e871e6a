//! Background watcher following runs until they terminate.
//!
//! Each non-terminal run gets at most one polling task. The watched set is
//! claimed before the task spawns and released by a drop guard, so every
//! exit path (terminal state, run deleted, timeout, panic) frees the slot
//! and a later event can start a fresh watch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use syncline_core::{ResourceKey, Run};

use crate::error::WatchError;
use crate::remote::RunRemote;
use crate::store::ObjectStore;

/// No run should take this long; a watch still alive after it is abandoned.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(70 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_ERROR_INTERVAL: Duration = Duration::from_secs(10);

pub struct RunWatcher {
    runs: Arc<dyn ObjectStore<Run>>,
    remote: Arc<dyn RunRemote>,
    watched: Mutex<HashSet<String>>,
    poll_interval: Duration,
    error_interval: Duration,
    timeout: Duration,
}

struct WatchGuard {
    watcher: Arc<RunWatcher>,
    run_id: String,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.watcher.watched.lock().unwrap().remove(&self.run_id);
    }
}

impl RunWatcher {
    pub fn new(runs: Arc<dyn ObjectStore<Run>>, remote: Arc<dyn RunRemote>) -> Self {
        Self {
            runs,
            remote,
            watched: Mutex::new(HashSet::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_interval: DEFAULT_ERROR_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Shrink the timings, for tests.
    pub fn with_intervals(
        mut self,
        poll_interval: Duration,
        error_interval: Duration,
        timeout: Duration,
    ) -> Self {
        self.poll_interval = poll_interval;
        self.error_interval = error_interval;
        self.timeout = timeout;
        self
    }

    pub fn is_watched(&self, run_id: &str) -> bool {
        self.watched.lock().unwrap().contains(run_id)
    }

    /// Claim the run and spawn its polling task. Fails when the run has no
    /// remote id yet or a watch is already active.
    pub fn start(self: &Arc<Self>, run: &Run) -> Result<(), WatchError> {
        if run.status.id.is_empty() {
            return Err(WatchError::MissingRemoteId);
        }
        let run_id = run.status.id.clone();
        {
            let mut watched = self.watched.lock().unwrap();
            if !watched.insert(run_id.clone()) {
                return Err(WatchError::AlreadyWatched(run_id));
            }
        }
        info!(run_id = %run_id, "starting run watch");

        let watcher = Arc::clone(self);
        let key = run.meta.key();
        tokio::spawn(async move {
            let _guard = WatchGuard {
                watcher: Arc::clone(&watcher),
                run_id: run_id.clone(),
            };
            if tokio::time::timeout(watcher.timeout, watcher.poll_until_terminal(&key, &run_id))
                .await
                .is_err()
            {
                warn!(run_id = %run_id, "timed out watching run");
            }
        });
        Ok(())
    }

    async fn poll_until_terminal(&self, key: &ResourceKey, run_id: &str) {
        loop {
            let mut run = match self.runs.get(key).await {
                Ok(Some(run)) => run,
                Ok(None) => {
                    info!(run_id = %run_id, "run removed from store, stopping watch");
                    return;
                }
                Err(err) => {
                    error!(run_id = %run_id, error = %err, "failed to read run from store");
                    tokio::time::sleep(self.error_interval).await;
                    continue;
                }
            };

            let record = match self.remote.get(&run.status.stack_id, run_id).await {
                Ok(record) => record,
                Err(err) if err.is_not_found() => {
                    info!(run_id = %run_id, "run no longer exists remotely, stopping watch");
                    return;
                }
                Err(err) => {
                    error!(run_id = %run_id, error = %err, "failed to poll run");
                    tokio::time::sleep(self.error_interval).await;
                    continue;
                }
            };

            run.apply_record(&record);
            match self.runs.update_status(&mut run).await {
                Ok(()) => {}
                Err(err) if err.is_conflict() => {
                    // Someone else wrote in between; re-read and re-apply
                    // right away.
                    debug!(run_id = %run_id, "conflict writing run status, retrying");
                    continue;
                }
                Err(err) => {
                    error!(run_id = %run_id, error = %err, "failed to write run status");
                    tokio::time::sleep(self.error_interval).await;
                    continue;
                }
            }

            if run.is_terminated() {
                info!(run_id = %run_id, state = %run.status.state.map(|s| s.as_str()).unwrap_or("?"), "run terminated, stopping watch");
                return;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
