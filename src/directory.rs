//! Session directory
//!
//! Bijective mapping between usernames and live connections, plus each
//! identity's joined-group set. Enforces at-most-one-connection-per-username
//! and decides the reject-vs-evict outcome for conflicting joins.

use std::collections::{HashMap, HashSet};

use crate::types::{ConnectionId, GroupName, Username};

/// A joined user: the username bound to a connection and its memberships
#[derive(Debug)]
pub struct Identity {
    pub username: Username,
    /// Groups this identity has joined; always a subset of the registry's
    /// groups whose member set contains the username
    pub groups: HashSet<GroupName>,
}

impl Identity {
    fn new(username: Username) -> Self {
        Self {
            username,
            groups: HashSet::new(),
        }
    }
}

/// Outcome of checking whether a connection may claim a username
#[derive(Debug, PartialEq, Eq)]
pub enum NameClaim {
    /// Username unbound, claim freely
    Free,
    /// This connection already owns the username
    OwnedBySelf,
    /// Bound to a different connection the transport reports alive: reject
    Held(ConnectionId),
    /// Bound to a dead connection: evict the stale binding, then claim
    Stale(ConnectionId),
}

/// Username ↔ connection directory
///
/// Exclusively owns the identity-to-connection mapping. Mutated only from
/// the relay actor's event loop, so no interior locking.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    identities: HashMap<ConnectionId, Identity>,
    by_username: HashMap<Username, ConnectionId>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide how a claim of `username` by `connection_id` must be handled.
    ///
    /// `is_alive` is the transport's view of whether a connection can still
    /// receive events; the directory itself has no notion of liveness.
    pub fn check_claim(
        &self,
        connection_id: ConnectionId,
        username: &Username,
        is_alive: impl Fn(ConnectionId) -> bool,
    ) -> NameClaim {
        match self.by_username.get(username) {
            None => NameClaim::Free,
            Some(&owner) if owner == connection_id => NameClaim::OwnedBySelf,
            Some(&owner) if is_alive(owner) => NameClaim::Held(owner),
            Some(&owner) => NameClaim::Stale(owner),
        }
    }

    /// Install a fresh identity for `connection_id`.
    ///
    /// Callers must have resolved the claim first; binding over an existing
    /// foreign binding would break the one-connection-per-username invariant.
    pub fn bind(&mut self, connection_id: ConnectionId, username: Username) {
        self.by_username.insert(username.clone(), connection_id);
        self.identities
            .insert(connection_id, Identity::new(username));
    }

    /// Erase the identity bound to `connection_id`, returning it for cleanup.
    ///
    /// Safe no-op on connections with no identity, so disconnect cleanup is
    /// idempotent.
    pub fn unbind(&mut self, connection_id: ConnectionId) -> Option<Identity> {
        let identity = self.identities.remove(&connection_id)?;
        // Only drop the name mapping if it still points at us; a newer
        // join may already have reclaimed the username.
        if self.by_username.get(&identity.username) == Some(&connection_id) {
            self.by_username.remove(&identity.username);
        }
        Some(identity)
    }

    pub fn resolve(&self, connection_id: ConnectionId) -> Option<&Identity> {
        self.identities.get(&connection_id)
    }

    pub fn username_of(&self, connection_id: ConnectionId) -> Option<&Username> {
        self.identities.get(&connection_id).map(|i| &i.username)
    }

    pub fn connection_of(&self, username: &Username) -> Option<ConnectionId> {
        self.by_username.get(username).copied()
    }

    /// Record a group membership on the identity. No-op for unknown
    /// connections.
    pub fn add_group(&mut self, connection_id: ConnectionId, group: GroupName) {
        if let Some(identity) = self.identities.get_mut(&connection_id) {
            identity.groups.insert(group);
        }
    }

    /// Drop a group membership from the identity.
    pub fn remove_group(&mut self, connection_id: ConnectionId, group: &GroupName) {
        if let Some(identity) = self.identities.get_mut(&connection_id) {
            identity.groups.remove(group);
        }
    }

    /// Number of currently bound identities
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_resolve() {
        let mut directory = SessionDirectory::new();
        let conn = ConnectionId::new();
        let alice = Username::new("alice");

        directory.bind(conn, alice.clone());

        assert_eq!(directory.username_of(conn), Some(&alice));
        assert_eq!(directory.connection_of(&alice), Some(conn));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_claim_outcomes() {
        let mut directory = SessionDirectory::new();
        let held = ConnectionId::new();
        let newcomer = ConnectionId::new();
        let alice = Username::new("alice");

        assert_eq!(
            directory.check_claim(newcomer, &alice, |_| true),
            NameClaim::Free
        );

        directory.bind(held, alice.clone());

        assert_eq!(
            directory.check_claim(held, &alice, |_| true),
            NameClaim::OwnedBySelf
        );
        assert_eq!(
            directory.check_claim(newcomer, &alice, |_| true),
            NameClaim::Held(held)
        );
        assert_eq!(
            directory.check_claim(newcomer, &alice, |_| false),
            NameClaim::Stale(held)
        );
    }

    #[test]
    fn test_unbind_is_idempotent() {
        let mut directory = SessionDirectory::new();
        let conn = ConnectionId::new();
        directory.bind(conn, Username::new("alice"));

        assert!(directory.unbind(conn).is_some());
        assert!(directory.unbind(conn).is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_unbind_keeps_reclaimed_username() {
        let mut directory = SessionDirectory::new();
        let old = ConnectionId::new();
        let new = ConnectionId::new();
        let alice = Username::new("alice");

        directory.bind(old, alice.clone());
        // A newer connection reclaims the name before the old identity is
        // torn down (eviction path).
        directory.bind(new, alice.clone());

        directory.unbind(old);
        assert_eq!(directory.connection_of(&alice), Some(new));
    }

    #[test]
    fn test_group_membership_tracking() {
        let mut directory = SessionDirectory::new();
        let conn = ConnectionId::new();
        let lobby = GroupName::new("lobby");
        directory.bind(conn, Username::new("alice"));

        directory.add_group(conn, lobby.clone());
        assert!(directory.resolve(conn).unwrap().groups.contains(&lobby));

        directory.remove_group(conn, &lobby);
        assert!(directory.resolve(conn).unwrap().groups.is_empty());
    }
}
