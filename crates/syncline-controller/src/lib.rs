//! Reconciliation machinery for syncline.
//!
//! This crate connects the pure domain model in `syncline-core` to the two
//! systems of record: the desired-state store (declarative objects edited by
//! users) and the remote IaC backend. Each resource kind gets a reconciler
//! that drives the remote towards the desired state, plus a background
//! watcher that follows runs until they terminate.
//!
//! Event delivery is an external concern: something feeds `(kind, key)`
//! pairs into [`Controller::dispatch`], filtered by the predicates in
//! `syncline_core::trigger`.

pub mod controller;
pub mod error;
pub mod fakes;
pub mod memory;
pub mod reconcile;
pub mod remote;
pub mod resolver;
pub mod store;
pub mod watcher;

pub use controller::{Controller, ResourceKind};
pub use error::{ReconcileError, RemoteError, StoreError, WatchError};
pub use memory::{MemorySecretStore, MemoryStore};
pub use reconcile::Outcome;
pub use resolver::{DependencyResolver, Resolution};
pub use store::{ObjectStore, SecretStore};
pub use watcher::RunWatcher;
