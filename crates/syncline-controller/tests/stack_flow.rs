//! End-to-end stack reconciliation against in-memory stores and a fake
//! remote: dependency gating, owner links, annotation stamping and the
//! create/update split.

use std::sync::Arc;

use syncline_controller::fakes::FakeStackRemote;
use syncline_controller::memory::MemoryStore;
use syncline_controller::reconcile::{
    Outcome, StackReconciler, MISSING_DEPENDENCY_REQUEUE, PENDING_DEPENDENCY_REQUEUE,
};
use syncline_controller::resolver::DependencyResolver;
use syncline_controller::ObjectStore;
use syncline_core::{
    ObjectMeta, OwnerRef, ResourceKey, Space, SpaceRef, SpaceSpec, SpaceStatus, Stack, StackSpec,
    StackStatus,
};

struct Env {
    spaces: Arc<MemoryStore<Space>>,
    stacks: Arc<MemoryStore<Stack>>,
    remote: Arc<FakeStackRemote>,
    reconciler: StackReconciler,
}

fn env() -> Env {
    let spaces = Arc::new(MemoryStore::new());
    let stacks = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeStackRemote::new());
    let resolver = DependencyResolver::new(spaces.clone(), stacks.clone());
    let reconciler = StackReconciler::new(stacks.clone(), resolver, remote.clone());
    Env {
        spaces,
        stacks,
        remote,
        reconciler,
    }
}

fn space(name: &str, remote_id: &str) -> Space {
    Space {
        meta: ObjectMeta::new("infra", name),
        spec: SpaceSpec {
            name: None,
            parent_space: "root".into(),
            description: String::new(),
            inherit_entities: false,
            labels: None,
        },
        status: SpaceStatus {
            id: remote_id.into(),
            url: String::new(),
            ready: !remote_id.is_empty(),
        },
    }
}

fn stack(name: &str, space: Option<SpaceRef>) -> Stack {
    Stack {
        meta: ObjectMeta::new("infra", name),
        spec: StackSpec {
            repository: "acme/core-infra".into(),
            space,
            ..StackSpec::default()
        },
        status: StackStatus::default(),
    }
}

#[tokio::test]
async fn test_stack_waits_for_space_then_creates() {
    let env = env();
    env.stacks
        .insert(stack("core", Some(SpaceRef::Name("prod".into()))));
    let key = ResourceKey::new("infra", "core");

    // No space object at all: poll lazily.
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::RequeueAfter(MISSING_DEPENDENCY_REQUEUE));

    // Space exists but has no remote id yet: retry sooner.
    env.spaces.insert(space("prod", ""));
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::RequeueAfter(PENDING_DEPENDENCY_REQUEUE));
    assert_eq!(env.remote.creates(), 0);

    env.spaces.insert(space("prod", "prod-01HX"));
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert_eq!(env.remote.creates(), 1);

    let stored = env.stacks.get(&key).await.unwrap().unwrap();
    assert_eq!(stored.status.id, "core");
    assert!(stored.status.ready);
    assert_eq!(stored.meta.owner, Some(OwnerRef::new("Space", "prod")));
    assert_eq!(
        stored.meta.external_link(),
        Some("https://backend.example.com/stack/core")
    );
}

#[tokio::test]
async fn test_second_pass_updates_instead_of_recreating() {
    let env = env();
    env.spaces.insert(space("prod", "prod-01HX"));
    env.stacks
        .insert(stack("core", Some(SpaceRef::Name("prod".into()))));
    let key = ResourceKey::new("infra", "core");

    env.reconciler.reconcile(&key).await.unwrap();
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert_eq!(env.remote.creates(), 1);
    assert_eq!(env.remote.updates(), 1);

    // The owner link was installed once and stayed put.
    let stored = env.stacks.get(&key).await.unwrap().unwrap();
    assert_eq!(stored.meta.owner, Some(OwnerRef::new("Space", "prod")));
}

#[tokio::test]
async fn test_space_by_id_needs_no_gating() {
    let env = env();
    env.stacks
        .insert(stack("core", Some(SpaceRef::Id("ops-01HX".into()))));
    let key = ResourceKey::new("infra", "core");

    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    let stored = env.stacks.get(&key).await.unwrap().unwrap();
    // A remote id reference is not a local parent; no owner link.
    assert_eq!(stored.meta.owner, None);
    assert!(stored.status.ready);
}

#[tokio::test]
async fn test_status_write_conflict_requeues() {
    let env = env();
    env.stacks.insert(stack("core", None));
    let key = ResourceKey::new("infra", "core");
    env.stacks.inject_status_conflicts(1);

    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert!(matches!(outcome, Outcome::RequeueAfter(_)));

    // The retry pass converges.
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert!(env.stacks.get(&key).await.unwrap().unwrap().status.ready);
}

#[tokio::test]
async fn test_remote_create_failure_ends_pass() {
    let env = env();
    env.remote.fail_create();
    env.stacks.insert(stack("core", None));
    let key = ResourceKey::new("infra", "core");

    // Deliberately no requeue: the next delivered event retries.
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    let stored = env.stacks.get(&key).await.unwrap().unwrap();
    assert!(stored.status.id.is_empty());
    assert!(!stored.status.ready);
}

#[tokio::test]
async fn test_vanished_object_is_a_noop() {
    let env = env();
    let outcome = env
        .reconciler
        .reconcile(&ResourceKey::new("infra", "ghost"))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert_eq!(env.remote.creates(), 0);
}
