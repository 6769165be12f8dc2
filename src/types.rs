//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based unique connection identifier
//! - `Username`: user-visible identity, unique while bound
//! - `GroupName`: name of a chat group
//! - `TypingTarget`: the single channel an identity is typing toward

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Username (case-sensitive, non-empty while bound)
///
/// A username is bound to at most one live connection at a time.
/// Emptiness is validated at join time by the relay, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group name
///
/// Groups are created lazily on first join and deleted when the last
/// member leaves, so a `GroupName` value does not imply the group exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(pub String);

impl GroupName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for GroupName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The channel an identity is currently typing toward
///
/// An identity has at most one typing target at any instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingTarget {
    /// Typing in a group
    Group(GroupName),
    /// Typing to a direct-message peer
    User(Username),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_username_display() {
        let name = Username::new("alice");
        assert_eq!(name.to_string(), "alice");
        assert!(!name.is_empty());
        assert!(Username::new("").is_empty());
    }

    #[test]
    fn test_usernames_case_sensitive() {
        assert_ne!(Username::new("Alice"), Username::new("alice"));
    }

    #[test]
    fn test_group_name_transparent_serde() {
        let group = GroupName::new("lobby");
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(json, "\"lobby\"");
        let back: GroupName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
    }
}
