//! Connection handle definition
//!
//! The relay-side handle for one open transport link: the connection id
//! plus the outbound event channel feeding its write task.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::protocol::ServerEvent;
use crate::types::ConnectionId;

/// Outbound handle for a connected client
///
/// Owned exclusively by the relay actor. Dropping it closes the outbound
/// channel, which ends the connection's write task and closes the socket;
/// this is how evictions are carried out.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Server → Client event channel
    sender: mpsc::Sender<ServerEvent>,
}

impl Connection {
    /// Create a new connection handle with the given ID and sender channel
    pub fn new(id: ConnectionId, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self { id, sender }
    }

    /// Send an event to this connection
    ///
    /// Returns an error if the channel is closed (client disconnected).
    /// Callers treat delivery as fire-and-forget and ignore the result.
    pub async fn send(&self, event: ServerEvent) -> Result<(), SendError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Whether the transport still reports this connection as alive
    ///
    /// False once the connection's receive side has been dropped, i.e. the
    /// write task has ended. Drives the reject-vs-evict policy on join.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessagePayload;

    #[tokio::test]
    async fn test_connection_send() {
        let (tx, mut rx) = mpsc::channel(32);
        let conn = Connection::new(ConnectionId::new(), tx);

        assert!(conn.is_alive());
        conn.send(ServerEvent::Message(MessagePayload::system("hello")))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(ServerEvent::Message(_))));
    }

    #[tokio::test]
    async fn test_connection_dead_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(32);
        let conn = Connection::new(ConnectionId::new(), tx);
        drop(rx);

        assert!(!conn.is_alive());
        let result = conn
            .send(ServerEvent::Message(MessagePayload::system("hello")))
            .await;
        assert!(matches!(result, Err(SendError::ChannelClosed)));
    }
}
