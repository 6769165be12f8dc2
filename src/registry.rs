//! Group registry
//!
//! Maps group names to member sets. Groups are created on first join and
//! deleted the instant their member set empties; an existing group always
//! has at least one member.

use std::collections::{HashMap, HashSet};

use crate::types::{GroupName, Username};

/// Result of removing a member from a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipChange {
    /// The username was actually in the group
    pub removed: bool,
    /// The group's member set emptied and the group record was deleted
    pub group_deleted: bool,
}

/// Group name → member set
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<GroupName, HashSet<Username>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member, creating the group if this is its first join.
    ///
    /// Returns true if the username was newly added, false if it was
    /// already a member.
    pub fn add_member(&mut self, group: &GroupName, username: &Username) -> bool {
        self.groups
            .entry(group.clone())
            .or_default()
            .insert(username.clone())
    }

    /// Remove a member, deleting the group when its member set empties.
    pub fn remove_member(&mut self, group: &GroupName, username: &Username) -> MembershipChange {
        let Some(members) = self.groups.get_mut(group) else {
            return MembershipChange {
                removed: false,
                group_deleted: false,
            };
        };

        let removed = members.remove(username);
        let group_deleted = members.is_empty();
        if group_deleted {
            self.groups.remove(group);
        }
        MembershipChange {
            removed,
            group_deleted,
        }
    }

    pub fn is_member(&self, group: &GroupName, username: &Username) -> bool {
        self.groups
            .get(group)
            .is_some_and(|members| members.contains(username))
    }

    pub fn members(&self, group: &GroupName) -> Option<&HashSet<Username>> {
        self.groups.get(group)
    }

    /// Snapshot of the member list, or None for a nonexistent group.
    ///
    /// Order is whatever the set yields; member lists are snapshots, not
    /// ordered logs.
    pub fn member_list(&self, group: &GroupName) -> Option<Vec<Username>> {
        self.groups
            .get(group)
            .map(|members| members.iter().cloned().collect())
    }

    /// Number of existing groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> GroupName {
        GroupName::new("lobby")
    }

    #[test]
    fn test_add_member_creates_group() {
        let mut registry = GroupRegistry::new();
        let alice = Username::new("alice");

        assert!(registry.add_member(&lobby(), &alice));
        assert!(registry.is_member(&lobby(), &alice));
        assert_eq!(registry.len(), 1);

        // Second add is a no-op
        assert!(!registry.add_member(&lobby(), &alice));
    }

    #[test]
    fn test_remove_last_member_deletes_group() {
        let mut registry = GroupRegistry::new();
        let alice = Username::new("alice");
        let bob = Username::new("bob");
        registry.add_member(&lobby(), &alice);
        registry.add_member(&lobby(), &bob);

        let change = registry.remove_member(&lobby(), &alice);
        assert!(change.removed);
        assert!(!change.group_deleted);
        assert_eq!(registry.len(), 1);

        let change = registry.remove_member(&lobby(), &bob);
        assert!(change.removed);
        assert!(change.group_deleted);
        assert!(registry.is_empty());
        assert!(registry.member_list(&lobby()).is_none());
    }

    #[test]
    fn test_remove_from_unknown_group() {
        let mut registry = GroupRegistry::new();
        let change = registry.remove_member(&lobby(), &Username::new("alice"));
        assert!(!change.removed);
        assert!(!change.group_deleted);
    }

    #[test]
    fn test_member_list_snapshot() {
        let mut registry = GroupRegistry::new();
        registry.add_member(&lobby(), &Username::new("alice"));
        registry.add_member(&lobby(), &Username::new("bob"));

        let mut list = registry.member_list(&lobby()).unwrap();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(list, vec![Username::new("alice"), Username::new("bob")]);
    }
}
