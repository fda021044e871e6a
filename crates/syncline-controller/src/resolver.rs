//! Dependency resolution against the desired-state store.
//!
//! References by object name gate on the referenced object existing *and*
//! being ready (remote id known). The two failure modes requeue at
//! different cadences: a missing object may never appear, so we poll
//! lazily; an unready one is usually seconds away from its id.

use std::sync::Arc;

use syncline_core::{Space, Stack};

use crate::error::StoreError;
use crate::store::ObjectStore;

/// Outcome of resolving one by-name reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Ready(T),
    /// The object exists but has no remote id yet.
    NotReady,
    /// No such object in the store.
    Missing,
}

/// Context payload after all references and secrets were resolved, ready to
/// be mapped onto a remote mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedContext {
    pub space_id: Option<String>,
    pub attachments: Vec<ResolvedAttachment>,
    pub environment: Vec<ResolvedConfig>,
    pub mounted_files: Vec<ResolvedConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    /// Remote id of the attached stack or module.
    pub target_id: String,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub id: String,
    pub value: String,
    /// Write-only values can never be read back through the remote API.
    /// Always set for values sourced from secrets.
    pub write_only: bool,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct DependencyResolver {
    spaces: Arc<dyn ObjectStore<Space>>,
    stacks: Arc<dyn ObjectStore<Stack>>,
}

impl DependencyResolver {
    pub fn new(spaces: Arc<dyn ObjectStore<Space>>, stacks: Arc<dyn ObjectStore<Stack>>) -> Self {
        Self { spaces, stacks }
    }

    pub async fn space(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Resolution<Space>, StoreError> {
        let key = syncline_core::ResourceKey::new(namespace, name);
        Ok(match self.spaces.get(&key).await? {
            None => Resolution::Missing,
            Some(space) if !space.ready() => Resolution::NotReady,
            Some(space) => Resolution::Ready(space),
        })
    }

    pub async fn stack(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Resolution<Stack>, StoreError> {
        let key = syncline_core::ResourceKey::new(namespace, name);
        Ok(match self.stacks.get(&key).await? {
            None => Resolution::Missing,
            Some(stack) if !stack.ready() => Resolution::NotReady,
            Some(stack) => Resolution::Ready(stack),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use syncline_core::{ObjectMeta, SpaceSpec, SpaceStatus, StackSpec, StackStatus};

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

    #[tokio::test]
    async fn test_space_resolution_states() {
        let spaces = Arc::new(MemoryStore::new());
        let stacks: Arc<MemoryStore<Stack>> = Arc::new(MemoryStore::new());
        spaces.insert(space("pending", ""));
        spaces.insert(space("prod", "prod-01HX"));
        let resolver = DependencyResolver::new(spaces, stacks);

        assert_eq!(
            resolver.space("infra", "absent").await.unwrap(),
            Resolution::Missing
        );
        assert_eq!(
            resolver.space("infra", "pending").await.unwrap(),
            Resolution::NotReady
        );
        match resolver.space("infra", "prod").await.unwrap() {
            Resolution::Ready(space) => assert_eq!(space.status.id, "prod-01HX"),
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stack_resolution_requires_remote_id() {
        let spaces: Arc<MemoryStore<Space>> = Arc::new(MemoryStore::new());
        let stacks = Arc::new(MemoryStore::new());
        stacks.insert(Stack {
            meta: ObjectMeta::new("infra", "core"),
            spec: StackSpec::default(),
            status: StackStatus::default(),
        });
        let resolver = DependencyResolver::new(spaces, stacks);
        assert_eq!(
            resolver.stack("infra", "core").await.unwrap(),
            Resolution::NotReady
        );
    }
}
