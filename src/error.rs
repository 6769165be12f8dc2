//! Error types for the chat relay
//!
//! Splits transport-level failures (logged, may end a connection) from
//! relay-level failures (converted into wire events for the requester).
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::protocol::ServerEvent;
use crate::types::Username;

/// Transport and setup errors
///
/// These never originate in the relay core; they surface in connection
/// handler tasks and end at a log line.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal for the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal for the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal command channel broken (relay actor gone)
    #[error("Channel send error")]
    ChannelSend,
}

/// Relay-level request failures
///
/// Never fatal; each maps to exactly one wire event sent back to the
/// requester, with no state mutated.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Username bound to a different live connection
    #[error("Username \"{0}\" is already taken.")]
    UsernameTaken(Username),

    /// Join with an empty username
    #[error("Username cannot be empty.")]
    EmptyUsername,

    /// Join with an empty group name
    #[error("Group name cannot be empty.")]
    EmptyGroup,

    /// Send with neither a group nor a recipient
    #[error("Invalid message format: Must specify group or recipient.")]
    MissingTarget,
}

/// Convert a RelayError to the wire event delivered to the requester
impl From<RelayError> for ServerEvent {
    fn from(err: RelayError) -> Self {
        let text = err.to_string();
        match err {
            RelayError::UsernameTaken(_) | RelayError::EmptyUsername | RelayError::EmptyGroup => {
                ServerEvent::JoinError { message: text }
            }
            RelayError::MissingTarget => ServerEvent::MessageError { error: text },
        }
    }
}

/// Event send errors
///
/// Occurs when attempting to send events through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_taken_maps_to_join_error() {
        let event: ServerEvent = RelayError::UsernameTaken(Username::new("alice")).into();
        match event {
            ServerEvent::JoinError { message } => {
                assert_eq!(message, "Username \"alice\" is already taken.");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_missing_target_maps_to_message_error() {
        let event: ServerEvent = RelayError::MissingTarget.into();
        assert!(matches!(event, ServerEvent::MessageError { .. }));
    }
}
