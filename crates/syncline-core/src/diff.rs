//! Attachment diff engine.
//!
//! Pure set arithmetic between a desired attachment list and the
//! remote-reported one. Used on the update path for policy-to-stack
//! attachments and stack-to-cloud-integration attachments.
//!
//! Two different ids are in play: the *target* id (the stack or integration
//! being linked) and the *attachment* id (the link object the remote minted).
//! Attach operations take target ids, detach operations take attachment ids.

use crate::stack::AwsIntegration;

/// One attachment as reported by the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAttachment {
    /// Id of the link object itself.
    pub attachment_id: String,
    /// Id of the attached target (stack, module).
    pub target_id: String,
    /// Created by the remote system itself; never detached by this engine.
    pub auto_attached: bool,
}

/// Result of diffing desired target ids against remote attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentDiff {
    /// Target ids to attach.
    pub to_attach: Vec<String>,
    /// Attachment ids to detach.
    pub to_detach: Vec<String>,
}

impl AttachmentDiff {
    pub fn is_empty(&self) -> bool {
        self.to_attach.is_empty() && self.to_detach.is_empty()
    }
}

/// Compute the attach/detach sets for a many-to-many attachment family.
///
/// Matching is by target id. Auto-attached remote entries are never
/// detached, whatever the desired set says. Re-running against the
/// post-mutation remote state yields an empty diff.
pub fn diff_attachments(desired: &[String], remote: &[RemoteAttachment]) -> AttachmentDiff {
    let mut diff = AttachmentDiff::default();

    for target in desired {
        if diff.to_attach.contains(target) {
            continue;
        }
        if !remote.iter().any(|a| a.target_id == *target) {
            diff.to_attach.push(target.clone());
        }
    }

    for attachment in remote {
        if attachment.auto_attached {
            continue;
        }
        if !desired.contains(&attachment.target_id) {
            diff.to_detach.push(attachment.attachment_id.clone());
        }
    }

    diff
}

/// One cloud-integration attachment as reported by the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationAttachment {
    pub attachment_id: String,
    pub integration_id: String,
    pub read: bool,
    pub write: bool,
}

impl IntegrationAttachment {
    fn matches(&self, desired: &AwsIntegration) -> bool {
        // Equality is on the full attribute tuple; a flipped read/write flag
        // means detach-then-reattach.
        self.integration_id == desired.id
            && self.read == desired.read
            && self.write == desired.write
    }
}

/// Result of diffing the (at most one) desired integration against remote
/// integration attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrationDiff {
    /// Attachment ids to detach.
    pub to_detach: Vec<String>,
    /// The desired integration must be (re)attached.
    pub needs_attach: bool,
}

impl IntegrationDiff {
    pub fn is_empty(&self) -> bool {
        self.to_detach.is_empty() && !self.needs_attach
    }
}

pub fn diff_integrations(
    desired: Option<&AwsIntegration>,
    remote: &[IntegrationAttachment],
) -> IntegrationDiff {
    let mut diff = IntegrationDiff::default();
    let mut matched = false;

    for attachment in remote {
        match desired {
            Some(want) if attachment.matches(want) => matched = true,
            _ => diff.to_detach.push(attachment.attachment_id.clone()),
        }
    }

    diff.needs_attach = desired.is_some() && !matched;
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(attachment_id: &str, target_id: &str, auto: bool) -> RemoteAttachment {
        RemoteAttachment {
            attachment_id: attachment_id.into(),
            target_id: target_id.into(),
            auto_attached: auto,
        }
    }

    #[test]
    fn test_attach_only_missing_targets() {
        let desired = vec!["stack-a".to_string(), "stack-b".to_string()];
        let diff = diff_attachments(&desired, &[remote("att-1", "stack-a", false)]);
        assert_eq!(diff.to_attach, vec!["stack-b"]);
        assert!(diff.to_detach.is_empty());
    }

    #[test]
    fn test_detach_unwanted_non_auto() {
        let desired = vec!["stack-a".to_string()];
        let diff = diff_attachments(
            &desired,
            &[
                remote("att-1", "stack-a", false),
                remote("att-2", "stack-b", false),
                remote("att-3", "stack-c", true),
            ],
        );
        assert!(diff.to_attach.is_empty());
        // stack-c is auto-attached and must survive.
        assert_eq!(diff.to_detach, vec!["att-2"]);
    }

    #[test]
    fn test_duplicate_desired_ids_attach_once() {
        let desired = vec!["stack-a".to_string(), "stack-a".to_string()];
        let diff = diff_attachments(&desired, &[]);
        assert_eq!(diff.to_attach, vec!["stack-a"]);
    }

    #[test]
    fn test_diff_is_idempotent_after_apply() {
        let desired = vec!["stack-a".to_string(), "stack-b".to_string()];
        let before = [remote("att-1", "stack-a", false), remote("att-2", "stack-x", false)];
        let diff = diff_attachments(&desired, &before);
        assert_eq!(diff.to_attach, vec!["stack-b"]);
        assert_eq!(diff.to_detach, vec!["att-2"]);

        // Simulate the remote after applying the diff.
        let after = [remote("att-1", "stack-a", false), remote("att-9", "stack-b", false)];
        assert!(diff_attachments(&desired, &after).is_empty());
    }

    fn integration(attachment_id: &str, integration_id: &str, read: bool, write: bool) -> IntegrationAttachment {
        IntegrationAttachment {
            attachment_id: attachment_id.into(),
            integration_id: integration_id.into(),
            read,
            write,
        }
    }

    #[test]
    fn test_integration_flag_change_detaches_and_reattaches() {
        let want = AwsIntegration {
            id: "aws-1".into(),
            read: true,
            write: true,
        };
        let diff = diff_integrations(Some(&want), &[integration("att-1", "aws-1", true, false)]);
        assert_eq!(diff.to_detach, vec!["att-1"]);
        assert!(diff.needs_attach);
    }

    #[test]
    fn test_integration_unchanged_is_noop() {
        let want = AwsIntegration {
            id: "aws-1".into(),
            read: true,
            write: false,
        };
        let diff = diff_integrations(Some(&want), &[integration("att-1", "aws-1", true, false)]);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_integration_removed_from_spec_detaches_all() {
        let diff = diff_integrations(None, &[integration("att-1", "aws-1", true, false)]);
        assert_eq!(diff.to_detach, vec!["att-1"]);
        assert!(!diff.needs_attach);
    }
}
