//! Typing tracker
//!
//! Per-identity typing state machine: `Idle → TypingIn(target) → Idle`,
//! with at most one active target per identity. Pure state transitions;
//! the relay turns the returned transitions into wire notifications.

use std::collections::HashMap;

use crate::types::{ConnectionId, TypingTarget};

/// Result of a start-typing transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTyping {
    /// Already typing at this target; nothing to announce
    Unchanged,
    /// Now typing at the new target; `stopped` is the previous target whose
    /// audience must receive a stop notification first
    Started { stopped: Option<TypingTarget> },
}

/// Connection → active typing target
#[derive(Debug, Default)]
pub struct TypingTracker {
    active: HashMap<ConnectionId, TypingTarget>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition to `TypingIn(target)`.
    ///
    /// Retargeting implicitly stops the previous target; the caller emits
    /// the stop notification before the start notification.
    pub fn start(&mut self, connection_id: ConnectionId, target: TypingTarget) -> StartTyping {
        match self.active.get(&connection_id) {
            Some(current) if *current == target => StartTyping::Unchanged,
            _ => {
                let stopped = self.active.insert(connection_id, target);
                StartTyping::Started { stopped }
            }
        }
    }

    /// Transition to `Idle`, returning the target that was active.
    pub fn stop(&mut self, connection_id: ConnectionId) -> Option<TypingTarget> {
        self.active.remove(&connection_id)
    }

    /// Transition to `Idle` only if the active target matches.
    ///
    /// Returns true if a stop actually happened. Used by the leave and
    /// send hooks, which must not cancel typing aimed at another channel.
    pub fn stop_if(&mut self, connection_id: ConnectionId, target: &TypingTarget) -> bool {
        if self.active.get(&connection_id) == Some(target) {
            self.active.remove(&connection_id);
            true
        } else {
            false
        }
    }

    pub fn target(&self, connection_id: ConnectionId) -> Option<&TypingTarget> {
        self.active.get(&connection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupName, Username};

    fn in_lobby() -> TypingTarget {
        TypingTarget::Group(GroupName::new("lobby"))
    }

    fn to_bob() -> TypingTarget {
        TypingTarget::User(Username::new("bob"))
    }

    #[test]
    fn test_start_from_idle() {
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::new();

        let transition = tracker.start(conn, in_lobby());
        assert_eq!(transition, StartTyping::Started { stopped: None });
        assert_eq!(tracker.target(conn), Some(&in_lobby()));
    }

    #[test]
    fn test_start_same_target_is_noop() {
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::new();
        tracker.start(conn, in_lobby());

        assert_eq!(tracker.start(conn, in_lobby()), StartTyping::Unchanged);
    }

    #[test]
    fn test_retarget_reports_previous() {
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::new();
        tracker.start(conn, in_lobby());

        let transition = tracker.start(conn, to_bob());
        assert_eq!(
            transition,
            StartTyping::Started {
                stopped: Some(in_lobby())
            }
        );
        assert_eq!(tracker.target(conn), Some(&to_bob()));
    }

    #[test]
    fn test_stop_when_idle() {
        let mut tracker = TypingTracker::new();
        assert!(tracker.stop(ConnectionId::new()).is_none());
    }

    #[test]
    fn test_stop_if_matches_only() {
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::new();
        tracker.start(conn, in_lobby());

        assert!(!tracker.stop_if(conn, &to_bob()));
        assert_eq!(tracker.target(conn), Some(&in_lobby()));

        assert!(tracker.stop_if(conn, &in_lobby()));
        assert!(tracker.target(conn).is_none());
    }
}
