//! Records returned by the remote backend.
//!
//! These are the controller-side projections of remote objects, produced by
//! the remote repositories and folded into resource statuses. Optional
//! fields are only applied when present so a partial read (e.g. a run poll
//! that only returns the state) never clears previously observed values.

use serde::{Deserialize, Serialize};

use crate::run::RunState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRecord {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRecord {
    pub id: String,
    pub url: Option<String>,
    /// Commit the remote stack currently tracks, when reported.
    pub tracked_commit: Option<String>,
    pub outputs: Vec<StackOutput>,
}

/// One output exported by a stack after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Absent on poll reads, which only return the state.
    pub id: Option<String>,
    pub url: Option<String>,
    pub state: Option<RunState>,
}
