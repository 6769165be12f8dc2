//! Group Chat Relay Library
//!
//! A real-time chat relay over WebSockets built with tokio-tungstenite,
//! using the Actor pattern for state management. Clients join named groups
//! or message each other directly; the relay tracks presence, membership,
//! and typing state while routing messages. All state is ephemeral and
//! lost on restart.
//!
//! # Features
//! - Username claiming with last-writer-wins eviction of stale bindings
//! - Named groups, created on first join and deleted on last leave
//! - Presence broadcasts (member lists, join/leave notices)
//! - Direct messages with sender echo
//! - Typing indicators, one target per identity
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Relay` is the central actor owning all state (session directory,
//!   group registry, typing tracker, connection handles)
//! - Each connection has a `handler` task pair communicating with the relay
//! - No locks needed - all state access goes through message passing, one
//!   command at a time
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_relay::{Relay, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:3001").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(Relay::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod connection;
pub mod directory;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod typing;
pub mod types;

// Re-export main types for convenience
pub use connection::Connection;
pub use directory::{Identity, NameClaim, SessionDirectory};
pub use error::{AppError, RelayError, SendError};
pub use handler::handle_connection;
pub use protocol::{ChatMessage, ClientEvent, MessagePayload, ServerEvent, TypingNotice};
pub use registry::GroupRegistry;
pub use relay::{Relay, RelayCommand};
pub use typing::TypingTracker;
pub use types::{ConnectionId, GroupName, TypingTarget, Username};
