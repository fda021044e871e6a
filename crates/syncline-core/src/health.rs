//! Health projection for runs.
//!
//! Maps remote run states onto the small health vocabulary consumed by
//! external health-check integrations (GitOps-style sync gates). The
//! projection is total over [`RunState`] and recomputed on every status
//! write rather than cached.

use serde::{Deserialize, Serialize};

use crate::run::RunState;

/// Externally-consumed health of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    /// The run reached a successful terminal state.
    Healthy,
    /// The run is still moving and may become healthy.
    Progressing,
    /// The run is waiting on an external event (e.g. manual confirmation).
    Suspended,
    /// The run reached an unsuccessful terminal state.
    Degraded,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Healthy => "Healthy",
            Health::Progressing => "Progressing",
            Health::Suspended => "Suspended",
            Health::Degraded => "Degraded",
        }
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project a run state onto its health.
pub fn project(state: RunState) -> Health {
    match state {
        RunState::Finished | RunState::Skipped => Health::Healthy,
        RunState::Unconfirmed => Health::Suspended,
        RunState::Failed | RunState::Stopped | RunState::Canceled | RunState::Discarded => {
            Health::Degraded
        }
        _ => Health::Progressing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_is_total_and_matches_table() {
        let cases = [
            (RunState::Finished, Health::Healthy),
            (RunState::Skipped, Health::Healthy),
            (RunState::Unconfirmed, Health::Suspended),
            (RunState::Failed, Health::Degraded),
            (RunState::Stopped, Health::Degraded),
            (RunState::Canceled, Health::Degraded),
            (RunState::Discarded, Health::Degraded),
            (RunState::Queued, Health::Progressing),
            (RunState::Ready, Health::Progressing),
            (RunState::Initializing, Health::Progressing),
            (RunState::Planning, Health::Progressing),
            (RunState::Confirmed, Health::Progressing),
            (RunState::Applying, Health::Progressing),
            (RunState::Performing, Health::Progressing),
            (RunState::Unknown, Health::Progressing),
        ];
        for (state, expected) in cases {
            assert_eq!(project(state), expected, "state {state}");
        }
    }
}
