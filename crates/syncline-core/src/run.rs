//! Runs: triggered executions against a stack, observed until terminal.

use serde::{Deserialize, Serialize};

use crate::health::{self, Health};
use crate::meta::{ObjectMeta, Resource};
use crate::record::RunRecord;

/// Remote execution state of a run.
///
/// The remote backend owns this vocabulary and may grow it; states this
/// controller does not know about deserialize as `Unknown` and project to
/// `Progressing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Queued,
    Ready,
    Initializing,
    Planning,
    Unconfirmed,
    Confirmed,
    Applying,
    Performing,
    Finished,
    Failed,
    Stopped,
    Canceled,
    Discarded,
    Skipped,
    #[serde(other)]
    Unknown,
}

impl RunState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Finished
                | RunState::Failed
                | RunState::Stopped
                | RunState::Canceled
                | RunState::Discarded
                | RunState::Skipped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Queued => "QUEUED",
            RunState::Ready => "READY",
            RunState::Initializing => "INITIALIZING",
            RunState::Planning => "PLANNING",
            RunState::Unconfirmed => "UNCONFIRMED",
            RunState::Confirmed => "CONFIRMED",
            RunState::Applying => "APPLYING",
            RunState::Performing => "PERFORMING",
            RunState::Finished => "FINISHED",
            RunState::Failed => "FAILED",
            RunState::Stopped => "STOPPED",
            RunState::Canceled => "CANCELED",
            RunState::Discarded => "DISCARDED",
            RunState::Skipped => "SKIPPED",
            RunState::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of a run. Runs are immutable after creation; only status
/// movement re-triggers reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSpec {
    /// Name of the Stack object this run executes against.
    pub stack_name: String,
    /// Materialize the stack outputs into a secret once the run finishes.
    #[serde(default)]
    pub create_secret_from_stack_output: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    /// Remote run id. Never cleared once set.
    #[serde(default)]
    pub id: String,
    /// Remote id of the stack the run was triggered on.
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub url: String,
    pub state: Option<RunState>,
    /// Derived from `state` on every status write, see [`crate::health`].
    pub health: Option<Health>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub meta: ObjectMeta,
    pub spec: RunSpec,
    #[serde(default)]
    pub status: RunStatus,
}

impl Run {
    /// A run the controller has not handled yet has no observed state.
    pub fn is_new(&self) -> bool {
        self.status.state.is_none()
    }

    pub fn is_terminated(&self) -> bool {
        self.status.state.is_some_and(|s| s.is_terminal())
    }

    pub fn is_finished(&self) -> bool {
        self.status.state == Some(RunState::Finished)
    }

    /// Fold a remote record into the status and recompute health. Fields
    /// absent from the record leave the status untouched; the id is write-once.
    pub fn apply_record(&mut self, record: &RunRecord) {
        if let Some(id) = &record.id {
            if self.status.id.is_empty() && !id.is_empty() {
                self.status.id = id.clone();
            }
        }
        if let Some(url) = &record.url {
            if !url.is_empty() {
                self.status.url = url.clone();
            }
        }
        if let Some(state) = record.state {
            self.status.state = Some(state);
        }
        if let Some(state) = self.status.state {
            self.status.health = Some(health::project(state));
        }
    }
}

impl Resource for Run {
    const KIND: &'static str = "Run";

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> Run {
        Run {
            meta: ObjectMeta::new("infra", "deploy-1"),
            spec: RunSpec {
                stack_name: "core".into(),
                create_secret_from_stack_output: false,
            },
            status: RunStatus::default(),
        }
    }

    #[test]
    fn test_new_until_state_observed() {
        let mut r = run();
        assert!(r.is_new());
        r.apply_record(&RunRecord {
            id: Some("01HX".into()),
            url: None,
            state: Some(RunState::Queued),
        });
        assert!(!r.is_new());
        assert!(!r.is_terminated());
        assert_eq!(r.status.health, Some(Health::Progressing));
    }

    #[test]
    fn test_id_is_write_once() {
        let mut r = run();
        r.apply_record(&RunRecord {
            id: Some("01HX".into()),
            url: None,
            state: Some(RunState::Queued),
        });
        r.apply_record(&RunRecord {
            id: Some("OTHER".into()),
            url: None,
            state: Some(RunState::Finished),
        });
        assert_eq!(r.status.id, "01HX");
        assert!(r.is_finished());
        assert_eq!(r.status.health, Some(Health::Healthy));
    }

    #[test]
    fn test_poll_without_state_keeps_previous() {
        let mut r = run();
        r.apply_record(&RunRecord {
            id: Some("01HX".into()),
            url: None,
            state: Some(RunState::Applying),
        });
        r.apply_record(&RunRecord::default());
        assert_eq!(r.status.state, Some(RunState::Applying));
    }

    #[test]
    fn test_unknown_remote_state_deserializes() {
        let state: RunState = serde_json::from_str("\"REPLAN_REQUESTED\"").unwrap();
        assert_eq!(state, RunState::Unknown);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_terminal_set() {
        for state in [
            RunState::Finished,
            RunState::Failed,
            RunState::Stopped,
            RunState::Canceled,
            RunState::Discarded,
            RunState::Skipped,
        ] {
            assert!(state.is_terminal(), "{state} should be terminal");
        }
        for state in [RunState::Queued, RunState::Unconfirmed, RunState::Applying] {
            assert!(!state.is_terminal(), "{state} should not be terminal");
        }
    }
}
