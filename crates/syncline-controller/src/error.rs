//! Error types for stores, remote repositories and reconcilers.

use thiserror::Error;

/// Failure talking to the desired-state store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Optimistic-concurrency failure: the object changed between read and
    /// write. Reconcilers map this to a short requeue, never to a failure.
    #[error("conflict writing {kind} {key}: object changed since read")]
    Conflict { kind: &'static str, key: String },

    #[error("desired-state store failure: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Failure talking to the remote backend.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The queried object does not exist on the remote. This is a sentinel,
    /// not a failure: reconcilers branch to the create path on it.
    #[error("{kind} not found on remote")]
    NotFound { kind: &'static str },

    #[error("remote transport failure: {0}")]
    Transport(String),

    /// The remote answered, but with a payload we could not make sense of.
    #[error("unexpected remote payload: {0}")]
    Payload(String),

    /// The desired state cannot be expressed as a remote mutation.
    #[error("invalid {kind} spec: {reason}")]
    InvalidSpec { kind: &'static str, reason: String },
}

impl RemoteError {
    pub fn not_found(kind: &'static str) -> Self {
        RemoteError::NotFound { kind }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// Failure of a single reconcile pass. Surfaced errors are logged by the
/// caller and redelivered by the event source; recoverable situations
/// (conflicts, unready dependencies) become requeue outcomes instead.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A config element points at a key its secret does not carry. Unlike a
    /// missing secret object this does not heal by waiting, so it fails the
    /// pass outright.
    #[error("secret {secret} has no key {key}")]
    SecretKeyMissing { secret: String, key: String },
}

/// Failure starting a run watch.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("run has no remote id yet")]
    MissingRemoteId,

    #[error("run {0} is already being watched")]
    AlreadyWatched(String),
}
