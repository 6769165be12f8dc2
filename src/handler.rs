//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, event
//! parsing, and bidirectional communication with the relay actor. Contains
//! no relay logic of its own.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::relay::RelayCommand;
use crate::types::ConnectionId;

/// Buffer size for the server → client event channel
const EVENT_BUFFER_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers the connection with the
/// relay, then pumps events both ways until either side closes.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<RelayCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = ConnectionId::new();
    info!("Connection {} opened from {}", connection_id, peer_addr);

    // Channel for relay -> client events
    let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(EVENT_BUFFER_SIZE);

    // Register with the relay
    if cmd_tx
        .send(RelayCommand::Connect {
            connection_id,
            sender: event_tx,
        })
        .await
        .is_err()
    {
        error!(
            "Failed to register connection {} - relay closed",
            connection_id
        );
        return Err(AppError::ChannelSend);
    }

    // Clone cmd_tx for the read task
    let cmd_tx_read = cmd_tx.clone();

    // Read task (WebSocket -> RelayCommand)
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        let cmd = client_event_to_command(connection_id, event);
                        if cmd_tx_read.send(cmd).await.is_err() {
                            debug!("Relay closed, ending read task for {}", connection_id);
                            break;
                        }
                    }
                    Err(e) => {
                        // Malformed frames are dropped; the client is not
                        // notified from this task.
                        warn!("Invalid JSON from {}: {}", connection_id, e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", connection_id);
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", connection_id);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", connection_id);
    });

    // Write task (ServerEvent -> WebSocket). Ends when the relay drops the
    // connection's sender, which is how evictions close the socket.
    let write_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    // Continue - don't break on serialization errors
                }
            }
        }
        debug!("Write task ended for connection");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", connection_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", connection_id);
        }
    }

    // Send disconnect command; cleanup on the relay side is idempotent
    let _ = cmd_tx
        .send(RelayCommand::Disconnect { connection_id })
        .await;

    info!("Connection {} closed", connection_id);

    Ok(())
}

/// Convert a ClientEvent to a RelayCommand
fn client_event_to_command(connection_id: ConnectionId, event: ClientEvent) -> RelayCommand {
    match event {
        ClientEvent::Join { username, group } => RelayCommand::Join {
            connection_id,
            username,
            group,
        },
        ClientEvent::Leave { username, group } => RelayCommand::Leave {
            connection_id,
            username,
            group,
        },
        ClientEvent::StartTyping {
            group,
            recipient_username,
        } => RelayCommand::StartTyping {
            connection_id,
            group,
            recipient: recipient_username,
        },
        ClientEvent::StopTyping {
            group,
            recipient_username,
        } => RelayCommand::StopTyping {
            connection_id,
            group,
            recipient: recipient_username,
        },
        ClientEvent::SendMessage {
            group,
            recipient_username,
            message,
        } => RelayCommand::SendMessage {
            connection_id,
            group,
            recipient: recipient_username,
            message,
        },
    }
}
