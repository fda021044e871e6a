//! Desired-state store traits.
//!
//! The store is the system of record for what users declared. Reconcilers
//! only ever read objects, write status subresources, install owner links
//! and stamp annotations; they never touch specs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use syncline_core::{OwnerRef, Resource, ResourceKey};

use crate::error::StoreError;

/// Store access for one resource kind.
///
/// All writes are optimistically concurrent: the object's `resource_version`
/// must match the stored one or the write fails with
/// [`StoreError::Conflict`]. Successful writes refresh the version on the
/// passed object so follow-up writes in the same pass do not self-conflict.
#[async_trait]
pub trait ObjectStore<T: Resource>: Send + Sync {
    async fn get(&self, key: &ResourceKey) -> Result<Option<T>, StoreError>;

    /// Write metadata (annotations). Spec edits come from users, not from
    /// here.
    async fn update(&self, object: &mut T) -> Result<(), StoreError>;

    /// Write the status subresource.
    async fn update_status(&self, object: &mut T) -> Result<(), StoreError>;

    /// Install the owner link, once. A no-op when the object already has an
    /// owner; the link is never re-pointed.
    async fn set_owner(&self, object: &mut T, owner: OwnerRef) -> Result<(), StoreError>;
}

/// Store access for opaque secrets (string key/value maps).
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<BTreeMap<String, String>>, StoreError>;

    /// Create or replace a secret's data wholesale.
    async fn upsert(
        &self,
        key: &ResourceKey,
        data: BTreeMap<String, String>,
    ) -> Result<(), StoreError>;
}
