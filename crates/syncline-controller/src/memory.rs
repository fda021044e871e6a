//! In-memory desired-state store.
//!
//! Backs the single-process deployment and every test in this crate. Writes
//! enforce optimistic concurrency on `resource_version` exactly like a
//! networked store would, and tests can inject status-write conflicts to
//! exercise the retry paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use syncline_core::{OwnerRef, Resource, ResourceKey};

use crate::error::StoreError;
use crate::store::{ObjectStore, SecretStore};

pub struct MemoryStore<T: Resource> {
    objects: Mutex<HashMap<ResourceKey, T>>,
    /// Every accepted status write, in order. Tests use this to assert on
    /// intermediate states the final object no longer shows.
    status_history: Mutex<Vec<T>>,
    /// Number of upcoming status writes to reject with a conflict.
    injected_conflicts: Mutex<u32>,
}

impl<T: Resource> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            status_history: Mutex::new(Vec::new()),
            injected_conflicts: Mutex::new(0),
        }
    }

    /// Seed an object, as if a user had applied it.
    pub fn insert(&self, mut object: T) {
        if object.meta().resource_version == 0 {
            object.meta_mut().resource_version = 1;
        }
        let key = object.key();
        self.objects.lock().unwrap().insert(key, object);
    }

    /// Drop an object, as if a user had deleted it. Later reads return
    /// `None` and in-flight writes against the old version fail.
    pub fn remove(&self, key: &ResourceKey) -> Option<T> {
        self.objects.lock().unwrap().remove(key)
    }

    /// Make the next `count` status writes fail with a conflict.
    pub fn inject_status_conflicts(&self, count: u32) {
        *self.injected_conflicts.lock().unwrap() = count;
    }

    pub fn status_history(&self) -> Vec<T> {
        self.status_history.lock().unwrap().clone()
    }

    fn write(&self, object: &mut T, record_status: bool) -> Result<(), StoreError> {
        let key = object.key();
        let mut objects = self.objects.lock().unwrap();
        let stored = objects.get_mut(&key).ok_or_else(|| {
            StoreError::Internal(format!("{} {key} does not exist", T::KIND))
        })?;
        if stored.meta().resource_version != object.meta().resource_version {
            return Err(StoreError::Conflict {
                kind: T::KIND,
                key: key.to_string(),
            });
        }
        object.meta_mut().resource_version += 1;
        *stored = object.clone();
        if record_status {
            self.status_history.lock().unwrap().push(object.clone());
        }
        Ok(())
    }
}

impl<T: Resource> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Resource> ObjectStore<T> for MemoryStore<T> {
    async fn get(&self, key: &ResourceKey) -> Result<Option<T>, StoreError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn update(&self, object: &mut T) -> Result<(), StoreError> {
        self.write(object, false)
    }

    async fn update_status(&self, object: &mut T) -> Result<(), StoreError> {
        {
            let mut injected = self.injected_conflicts.lock().unwrap();
            if *injected > 0 {
                *injected -= 1;
                return Err(StoreError::Conflict {
                    kind: T::KIND,
                    key: object.key().to_string(),
                });
            }
        }
        self.write(object, true)
    }

    async fn set_owner(&self, object: &mut T, owner: OwnerRef) -> Result<(), StoreError> {
        let key = object.key();
        let mut objects = self.objects.lock().unwrap();
        let stored = objects.get_mut(&key).ok_or_else(|| {
            StoreError::Internal(format!("{} {key} does not exist", T::KIND))
        })?;
        if stored.meta().owner.is_none() {
            stored.meta_mut().owner = Some(owner);
            stored.meta_mut().resource_version += 1;
        }
        object.meta_mut().owner = stored.meta().owner.clone();
        object.meta_mut().resource_version = stored.meta().resource_version;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<ResourceKey, BTreeMap<String, String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: ResourceKey, data: BTreeMap<String, String>) {
        self.secrets.lock().unwrap().insert(key, data);
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<BTreeMap<String, String>>, StoreError> {
        Ok(self.secrets.lock().unwrap().get(key).cloned())
    }

    async fn upsert(
        &self,
        key: &ResourceKey,
        data: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.secrets.lock().unwrap().insert(key.clone(), data);
        Ok(())
    }
}
