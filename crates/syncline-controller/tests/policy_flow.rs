//! Policy reconciliation: stack gating, attachment convergence and the
//! auto-attachment guarantee.

use std::sync::Arc;

use syncline_controller::fakes::FakePolicyRemote;
use syncline_controller::memory::MemoryStore;
use syncline_controller::reconcile::{
    Outcome, PolicyReconciler, MISSING_DEPENDENCY_REQUEUE, PENDING_DEPENDENCY_REQUEUE,
};
use syncline_controller::resolver::DependencyResolver;
use syncline_controller::ObjectStore;
use syncline_core::{
    ObjectMeta, OwnerRef, Policy, PolicySpec, PolicyType, ResourceKey, Space, SpaceRef, SpaceSpec,
    SpaceStatus, Stack, StackSpec, StackStatus,
};

struct Env {
    spaces: Arc<MemoryStore<Space>>,
    stacks: Arc<MemoryStore<Stack>>,
    policies: Arc<MemoryStore<Policy>>,
    remote: Arc<FakePolicyRemote>,
    reconciler: PolicyReconciler,
}

fn env() -> Env {
    let spaces = Arc::new(MemoryStore::new());
    let stacks = Arc::new(MemoryStore::new());
    let policies = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakePolicyRemote::new());
    let resolver = DependencyResolver::new(spaces.clone(), stacks.clone());
    let reconciler = PolicyReconciler::new(policies.clone(), resolver, remote.clone());
    Env {
        spaces,
        stacks,
        policies,
        remote,
        reconciler,
    }
}

fn ready_stack(name: &str, remote_id: &str) -> Stack {
    Stack {
        meta: ObjectMeta::new("infra", name),
        spec: StackSpec::default(),
        status: StackStatus {
            id: remote_id.into(),
            url: String::new(),
            tracked_commit: None,
            ready: true,
        },
    }
}

fn policy(names: Vec<String>, ids: Vec<String>) -> Policy {
    Policy {
        meta: ObjectMeta::new("infra", "require-approval"),
        spec: PolicySpec {
            name: None,
            body: "package spacelift".into(),
            policy_type: PolicyType::Approval,
            description: None,
            labels: vec![],
            space: None,
            attached_stack_names: names,
            attached_stack_ids: ids,
        },
        status: Default::default(),
    }
}

#[tokio::test]
async fn test_policy_gates_on_every_named_stack() {
    let env = env();
    env.policies.insert(policy(vec!["core".into()], vec![]));
    let key = ResourceKey::new("infra", "require-approval");

    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::RequeueAfter(MISSING_DEPENDENCY_REQUEUE));

    env.stacks.insert(ready_stack("core", ""));
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::RequeueAfter(PENDING_DEPENDENCY_REQUEUE));
    assert_eq!(env.remote.creates(), 0);

    env.stacks.insert(ready_stack("core", "core-infra"));
    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert_eq!(env.remote.attach_calls(), vec!["core-infra"]);
    assert!(env.policies.get(&key).await.unwrap().unwrap().ready());
}

#[tokio::test]
async fn test_duplicate_references_attach_once() {
    let env = env();
    env.stacks.insert(ready_stack("core", "core-infra"));
    // Same stack referenced by name and by remote id.
    env.policies
        .insert(policy(vec!["core".into()], vec!["core-infra".into()]));
    let key = ResourceKey::new("infra", "require-approval");

    env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(env.remote.attach_calls(), vec!["core-infra"]);
}

#[tokio::test]
async fn test_auto_attached_stacks_survive_convergence() {
    let env = env();
    env.remote.seed_auto_attachment("labelled-stack");
    env.policies.insert(policy(vec![], vec![]));
    let key = ResourceKey::new("infra", "require-approval");

    env.reconciler.reconcile(&key).await.unwrap();
    env.reconciler.reconcile(&key).await.unwrap();

    assert_eq!(env.remote.updates(), 1);
    assert!(env.remote.detach_calls().is_empty());
    let attachments = env.remote.attachments();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].target_id, "labelled-stack");
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let env = env();
    env.stacks.insert(ready_stack("core", "core-infra"));
    env.policies.insert(policy(vec!["core".into()], vec![]));
    let key = ResourceKey::new("infra", "require-approval");

    env.reconciler.reconcile(&key).await.unwrap();
    env.reconciler.reconcile(&key).await.unwrap();
    env.reconciler.reconcile(&key).await.unwrap();

    // Attached once on create; the update passes found nothing to change.
    assert_eq!(env.remote.creates(), 1);
    assert_eq!(env.remote.updates(), 2);
    assert_eq!(env.remote.attach_calls(), vec!["core-infra"]);
    assert!(env.remote.detach_calls().is_empty());
}

#[tokio::test]
async fn test_space_reference_installs_owner() {
    let env = env();
    env.spaces.insert(Space {
        meta: ObjectMeta::new("infra", "prod"),
        spec: SpaceSpec {
            name: None,
            parent_space: "root".into(),
            description: String::new(),
            inherit_entities: false,
            labels: None,
        },
        status: SpaceStatus {
            id: "prod-01HX".into(),
            url: String::new(),
            ready: true,
        },
    });
    let mut owned = policy(vec![], vec![]);
    owned.spec.space = Some(SpaceRef::Name("prod".into()));
    env.policies.insert(owned);
    let key = ResourceKey::new("infra", "require-approval");

    let outcome = env.reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    let stored = env.policies.get(&key).await.unwrap().unwrap();
    assert_eq!(stored.meta.owner, Some(OwnerRef::new("Space", "prod")));
}
