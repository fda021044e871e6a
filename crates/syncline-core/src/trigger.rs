//! Event filter predicates.
//!
//! The event source feeding reconcile keys is an external collaborator; these
//! predicates define which update events it must deliver. Creations always
//! trigger, deletions never do (removal is not reconciled). For updates,
//! most kinds re-trigger on spec changes only, while runs are immutable
//! after creation and re-trigger on status movement only.

use crate::meta::ObjectMeta;
use crate::run::RunStatus;

/// True when a spec edit bumped the generation. Status-only writes keep the
/// generation stable and are filtered out.
pub fn generation_changed(old: &ObjectMeta, new: &ObjectMeta) -> bool {
    old.generation != new.generation
}

/// True when the observed run status moved. This is what hands a freshly
/// created run over to the watcher on the follow-up reconcile.
pub fn run_status_changed(old: &RunStatus, new: &RunStatus) -> bool {
    old != new
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunState;

    #[test]
    fn test_generation_filter() {
        let mut old = ObjectMeta::new("infra", "core");
        let mut new = old.clone();
        assert!(!generation_changed(&old, &new));
        new.generation = 2;
        assert!(generation_changed(&old, &new));
        old.generation = 2;
        assert!(!generation_changed(&old, &new));
    }

    #[test]
    fn test_run_status_filter() {
        let old = RunStatus::default();
        let mut new = old.clone();
        assert!(!run_status_changed(&old, &new));
        new.state = Some(RunState::Queued);
        assert!(run_status_changed(&old, &new));
    }
}
