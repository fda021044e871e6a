//! Space reconciliation through the shared driver: create, annotate,
//! project status, and the update path on later passes.

use std::sync::Arc;

use syncline_controller::fakes::FakeSpaceRemote;
use syncline_controller::memory::MemoryStore;
use syncline_controller::reconcile::{Outcome, SpaceReconciler};
use syncline_controller::ObjectStore;
use syncline_core::{ObjectMeta, ResourceKey, Space, SpaceSpec, SpaceStatus};

fn space() -> Space {
    Space {
        meta: ObjectMeta::new("infra", "prod"),
        spec: SpaceSpec {
            name: None,
            parent_space: "root".into(),
            description: "prod workloads".into(),
            inherit_entities: true,
            labels: None,
        },
        status: SpaceStatus::default(),
    }
}

#[tokio::test]
async fn test_create_projects_status_and_annotation() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeSpaceRemote::new());
    let reconciler = SpaceReconciler::new(store.clone(), remote.clone());
    store.insert(space());
    let key = ResourceKey::new("infra", "prod");

    let outcome = reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert_eq!(remote.creates(), 1);

    let stored = store.get(&key).await.unwrap().unwrap();
    assert!(stored.ready());
    assert!(stored.status.ready);
    assert!(stored.status.url.contains(&stored.status.id));
    assert_eq!(stored.meta.external_link(), Some(stored.status.url.as_str()));
}

#[tokio::test]
async fn test_later_passes_update_in_place() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeSpaceRemote::new());
    let reconciler = SpaceReconciler::new(store.clone(), remote.clone());
    store.insert(space());
    let key = ResourceKey::new("infra", "prod");

    reconciler.reconcile(&key).await.unwrap();
    let first_id = store.get(&key).await.unwrap().unwrap().status.id;

    reconciler.reconcile(&key).await.unwrap();
    assert_eq!(remote.creates(), 1);
    assert_eq!(remote.updates(), 1);
    // The remote id is stable across passes.
    assert_eq!(store.get(&key).await.unwrap().unwrap().status.id, first_id);
}

#[tokio::test]
async fn test_create_failure_leaves_status_untouched() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeSpaceRemote::new());
    let reconciler = SpaceReconciler::new(store.clone(), remote.clone());
    remote.fail_create();
    store.insert(space());
    let key = ResourceKey::new("infra", "prod");

    let outcome = reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert!(!store.get(&key).await.unwrap().unwrap().ready());
}
