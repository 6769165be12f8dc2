//! Relay actor implementation
//!
//! The central actor that owns all state: the session directory, the group
//! registry, the typing tracker, and the per-connection outbound channels.
//! Uses the Actor pattern with mpsc channels for message passing; commands
//! are handled to completion one at a time, so no mutation of shared state
//! ever interleaves with another.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::directory::{NameClaim, SessionDirectory};
use crate::error::RelayError;
use crate::protocol::{ChatMessage, MessagePayload, ServerEvent, TypingNotice};
use crate::registry::GroupRegistry;
use crate::typing::{StartTyping, TypingTracker};
use crate::types::{ConnectionId, GroupName, TypingTarget, Username};

/// Commands sent from connection handlers to the relay actor
#[derive(Debug)]
pub enum RelayCommand {
    /// New connection opened
    Connect {
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerEvent>,
    },
    /// Connection closed
    Disconnect { connection_id: ConnectionId },
    /// Claim a username and join a group
    Join {
        connection_id: ConnectionId,
        username: Username,
        group: GroupName,
    },
    /// Leave a group
    Leave {
        connection_id: ConnectionId,
        username: Username,
        group: GroupName,
    },
    /// Typing started toward a group or a peer
    StartTyping {
        connection_id: ConnectionId,
        group: Option<GroupName>,
        recipient: Option<Username>,
    },
    /// Typing stopped
    StopTyping {
        connection_id: ConnectionId,
        group: Option<GroupName>,
        recipient: Option<Username>,
    },
    /// Route a chat message
    SendMessage {
        connection_id: ConnectionId,
        group: Option<GroupName>,
        recipient: Option<Username>,
        message: ChatMessage,
    },
}

/// The relay actor
///
/// Single writer for the directory, registry and typing tracker; handlers
/// push commands in and the actor pushes finished events out through the
/// per-connection channels. Delivery is fire-and-forget.
pub struct Relay {
    /// All open connections: ConnectionId -> outbound handle
    connections: HashMap<ConnectionId, Connection>,
    /// Username <-> connection bindings and per-identity group sets
    directory: SessionDirectory,
    /// Group name -> member set
    registry: GroupRegistry,
    /// Connection -> active typing target
    typing: TypingTracker,
    /// Command receiver channel
    receiver: mpsc::Receiver<RelayCommand>,
}

impl Relay {
    /// Create a new relay with the given command receiver
    pub fn new(receiver: mpsc::Receiver<RelayCommand>) -> Self {
        Self {
            connections: HashMap::new(),
            directory: SessionDirectory::new(),
            registry: GroupRegistry::new(),
            typing: TypingTracker::new(),
            receiver,
        }
    }

    /// Run the relay event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("Relay started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Relay shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Connect {
                connection_id,
                sender,
            } => {
                self.handle_connect(connection_id, sender);
            }
            RelayCommand::Disconnect { connection_id } => {
                self.handle_disconnect(connection_id).await;
            }
            RelayCommand::Join {
                connection_id,
                username,
                group,
            } => {
                self.handle_join(connection_id, username, group).await;
            }
            RelayCommand::Leave {
                connection_id,
                username,
                group,
            } => {
                self.handle_leave(connection_id, username, group).await;
            }
            RelayCommand::StartTyping {
                connection_id,
                group,
                recipient,
            } => {
                self.handle_start_typing(connection_id, group, recipient)
                    .await;
            }
            RelayCommand::StopTyping {
                connection_id,
                group,
                recipient,
            } => {
                self.handle_stop_typing(connection_id, group, recipient).await;
            }
            RelayCommand::SendMessage {
                connection_id,
                group,
                recipient,
                message,
            } => {
                self.handle_send_message(connection_id, group, recipient, message)
                    .await;
            }
        }
    }

    /// Handle new connection
    fn handle_connect(&mut self, connection_id: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        info!("Connection {} opened", connection_id);
        self.connections
            .insert(connection_id, Connection::new(connection_id, sender));
        debug!(
            "Total connections: {}, identities: {}, groups: {}",
            self.connections.len(),
            self.directory.len(),
            self.registry.len()
        );
    }

    /// Handle connection close
    ///
    /// Idempotent: a second disconnect for an already-cleaned connection is
    /// a no-op.
    async fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        info!("Connection {} disconnected", connection_id);
        self.cleanup_connection(connection_id).await;
        debug!(
            "Total connections: {}, identities: {}, groups: {}",
            self.connections.len(),
            self.directory.len(),
            self.registry.len()
        );
    }

    /// Handle a join request: claim the username, then join the group
    async fn handle_join(
        &mut self,
        connection_id: ConnectionId,
        username: Username,
        group: GroupName,
    ) {
        // Events referencing an unregistered connection are torn-down
        // clients; ignore them.
        if !self.connections.contains_key(&connection_id) {
            return;
        }

        if username.is_empty() {
            self.send_to(connection_id, RelayError::EmptyUsername.into())
                .await;
            return;
        }
        if group.is_empty() {
            self.send_to(connection_id, RelayError::EmptyGroup.into())
                .await;
            return;
        }

        let claim = self.directory.check_claim(connection_id, &username, |id| {
            self.connections.get(&id).is_some_and(Connection::is_alive)
        });
        match claim {
            NameClaim::Held(owner) => {
                warn!(
                    "Username conflict: \"{}\" attempted by {} but held by live connection {}",
                    username, connection_id, owner
                );
                self.send_to(connection_id, RelayError::UsernameTaken(username).into())
                    .await;
                return;
            }
            NameClaim::Stale(victim) => {
                debug!(
                    "Evicting stale connection {} holding username \"{}\"",
                    victim, username
                );
                self.cleanup_connection(victim).await;
            }
            NameClaim::Free | NameClaim::OwnedBySelf => {}
        }

        // A connection re-joining under a new name sheds its old identity
        // first, so no membership or typing state leaks across names.
        if self
            .directory
            .username_of(connection_id)
            .is_some_and(|current| *current != username)
        {
            self.cleanup_identity(connection_id).await;
        }
        if self.directory.resolve(connection_id).is_none() {
            self.directory.bind(connection_id, username.clone());
        }

        let newly_joined = self.registry.add_member(&group, &username);
        self.directory.add_group(connection_id, group.clone());
        info!("{} ({}) joined group: {}", username, connection_id, group);

        if newly_joined {
            self.broadcast_group(
                &group,
                Some(&username),
                ServerEvent::Message(MessagePayload::system(format!(
                    "{username} has joined the group"
                ))),
            )
            .await;
            self.notify_user_list(&group).await;
        } else {
            // Duplicate join: refresh this client's snapshot only
            if let Some(list) = self.registry.member_list(&group) {
                self.send_to(connection_id, ServerEvent::UpdateUserList(list))
                    .await;
            }
        }
    }

    /// Handle a leave request
    async fn handle_leave(
        &mut self,
        connection_id: ConnectionId,
        username: Username,
        group: GroupName,
    ) {
        // The binding is authoritative; the payload username is only
        // informational.
        let Some(bound) = self.directory.username_of(connection_id).cloned() else {
            debug!(
                "Leave from connection {} with no identity, ignoring",
                connection_id
            );
            return;
        };
        if bound != username {
            debug!(
                "Leave payload names \"{}\" but connection {} is bound to \"{}\"",
                username, connection_id, bound
            );
        }

        info!("{} ({}) is leaving group: {}", bound, connection_id, group);
        self.leave_group(connection_id, &bound, &group).await;
    }

    /// Handle typing start
    async fn handle_start_typing(
        &mut self,
        connection_id: ConnectionId,
        group: Option<GroupName>,
        recipient: Option<Username>,
    ) {
        let Some(username) = self.directory.username_of(connection_id).cloned() else {
            return;
        };

        let target = if let Some(group) = group {
            // Typing toward a group you are not in is ignored
            if !self.registry.is_member(&group, &username) {
                return;
            }
            TypingTarget::Group(group)
        } else if let Some(recipient) = recipient {
            if self.connection_to(&recipient).is_none() {
                return;
            }
            TypingTarget::User(recipient)
        } else {
            return;
        };

        match self.typing.start(connection_id, target.clone()) {
            StartTyping::Unchanged => {}
            StartTyping::Started { stopped } => {
                // Retargeting: the old audience hears the stop first
                if let Some(previous) = stopped {
                    self.emit_typing_stopped(&username, &previous).await;
                }
                debug!("{} started typing toward {:?}", username, target);
                self.emit_typing_started(&username, &target).await;
            }
        }
    }

    /// Handle typing stop
    async fn handle_stop_typing(
        &mut self,
        connection_id: ConnectionId,
        group: Option<GroupName>,
        recipient: Option<Username>,
    ) {
        let Some(username) = self.directory.username_of(connection_id).cloned() else {
            return;
        };

        let stopped = match (group, recipient) {
            (Some(group), _) => {
                let target = TypingTarget::Group(group);
                self.typing.stop_if(connection_id, &target).then_some(target)
            }
            (None, Some(recipient)) => {
                let target = TypingTarget::User(recipient);
                self.typing.stop_if(connection_id, &target).then_some(target)
            }
            // Bare stop: whatever is active
            (None, None) => self.typing.stop(connection_id),
        };

        if let Some(target) = stopped {
            debug!("{} stopped typing toward {:?}", username, target);
            self.emit_typing_stopped(&username, &target).await;
        }
    }

    /// Handle a send request: route to a peer, a group, or reject
    async fn handle_send_message(
        &mut self,
        connection_id: ConnectionId,
        group: Option<GroupName>,
        recipient: Option<Username>,
        message: ChatMessage,
    ) {
        let Some(username) = self.directory.username_of(connection_id).cloned() else {
            return;
        };

        // Peer target takes precedence over group target
        if let Some(recipient) = recipient {
            let Some(peer_id) = self.connection_to(&recipient) else {
                debug!("DM target \"{}\" not found/offline", recipient);
                self.send_to(
                    connection_id,
                    ServerEvent::Message(MessagePayload::system(format!(
                        "User \"{recipient}\" is not online."
                    ))),
                )
                .await;
                return;
            };

            self.stop_typing_on_send(connection_id, &username, TypingTarget::User(recipient.clone()))
                .await;

            debug!("DM from {} to {}: {}", username, recipient, message.text);
            self.send_to(
                peer_id,
                ServerEvent::Message(MessagePayload::direct(
                    message.clone(),
                    &username,
                    &recipient,
                )),
            )
            .await;
            // Second unicast back to the sender, rendered as self-authored
            self.send_to(
                connection_id,
                ServerEvent::Message(MessagePayload::direct_echo(message, &username, &recipient)),
            )
            .await;
        } else if let Some(group) = group {
            self.stop_typing_on_send(connection_id, &username, TypingTarget::Group(group.clone()))
                .await;

            debug!("Group message from {} to {}: {}", username, group, message.text);
            // The sender renders its own copy locally; no echo
            self.broadcast_group(
                &group,
                Some(&username),
                ServerEvent::Message(MessagePayload::group(message, &username)),
            )
            .await;
        } else {
            debug!("Invalid sendMessage from {}: no group or recipient", username);
            self.send_to(connection_id, RelayError::MissingTarget.into())
                .await;
        }
    }

    /// Pre-send hook: a message on a channel cancels typing on that same
    /// channel, with the stop notification emitted strictly before the
    /// message.
    async fn stop_typing_on_send(
        &mut self,
        connection_id: ConnectionId,
        username: &Username,
        channel: TypingTarget,
    ) {
        if self.typing.stop_if(connection_id, &channel) {
            self.emit_typing_stopped(username, &channel).await;
        }
    }

    /// Remove one group membership, cascading typing stop and presence
    /// notifications
    async fn leave_group(
        &mut self,
        connection_id: ConnectionId,
        username: &Username,
        group: &GroupName,
    ) {
        // Typing in this group stops before the membership changes
        let target = TypingTarget::Group(group.clone());
        if self.typing.stop_if(connection_id, &target) {
            self.emit_typing_stopped(username, &target).await;
        }

        self.directory.remove_group(connection_id, group);
        let change = self.registry.remove_member(group, username);
        if !change.removed {
            return;
        }

        self.broadcast_group(
            group,
            None,
            ServerEvent::Message(MessagePayload::system(format!(
                "{username} has left the group"
            ))),
        )
        .await;
        self.notify_user_list(group).await;

        if change.group_deleted {
            debug!("Group {} is now empty and removed", group);
        }
    }

    /// Tear down a connection entirely: outbound channel, identity,
    /// memberships, typing state
    async fn cleanup_connection(&mut self, connection_id: ConnectionId) {
        // Dropping the handle closes the outbound channel, which ends the
        // write task and closes the socket. This is also the eviction
        // mechanism.
        self.connections.remove(&connection_id);
        self.cleanup_identity(connection_id).await;
    }

    /// Erase the identity bound to a connection and cascade group leaves
    async fn cleanup_identity(&mut self, connection_id: ConnectionId) {
        let Some(identity) = self.directory.unbind(connection_id) else {
            debug!("Connection {} had no identity", connection_id);
            return;
        };

        if let Some(target) = self.typing.stop(connection_id) {
            self.emit_typing_stopped(&identity.username, &target).await;
        }

        for group in &identity.groups {
            let change = self.registry.remove_member(group, &identity.username);
            if change.removed {
                self.broadcast_group(
                    group,
                    None,
                    ServerEvent::Message(MessagePayload::system(format!(
                        "{} has left the group",
                        identity.username
                    ))),
                )
                .await;
                self.notify_user_list(group).await;
            }
        }

        info!(
            "Cleaned up user {} ({})",
            identity.username, connection_id
        );
    }

    /// Helper: live connection id for a username, if any
    fn connection_to(&self, username: &Username) -> Option<ConnectionId> {
        self.directory
            .connection_of(username)
            .filter(|id| self.connections.get(id).is_some_and(Connection::is_alive))
    }

    /// Helper: fire-and-forget send to one connection
    async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(conn) = self.connections.get(&connection_id) {
            let _ = conn.send(event).await;
        }
    }

    /// Helper: fire-and-forget send to a username's connection
    async fn send_to_user(&self, username: &Username, event: ServerEvent) {
        if let Some(connection_id) = self.directory.connection_of(username) {
            self.send_to(connection_id, event).await;
        }
    }

    /// Helper: deliver an event to every member of a group, optionally
    /// excluding one username
    async fn broadcast_group(
        &self,
        group: &GroupName,
        except: Option<&Username>,
        event: ServerEvent,
    ) {
        let Some(members) = self.registry.members(group) else {
            return;
        };
        for member in members {
            if except == Some(member) {
                continue;
            }
            if let Some(connection_id) = self.directory.connection_of(member) {
                if let Some(conn) = self.connections.get(&connection_id) {
                    let _ = conn.send(event.clone()).await;
                }
            }
        }
    }

    /// Presence notifier: push the current member snapshot to the whole
    /// group
    async fn notify_user_list(&self, group: &GroupName) {
        if let Some(list) = self.registry.member_list(group) {
            self.broadcast_group(group, None, ServerEvent::UpdateUserList(list))
                .await;
        }
    }

    /// Helper: typing start notification to the target's audience
    async fn emit_typing_started(&self, username: &Username, target: &TypingTarget) {
        match target {
            TypingTarget::Group(group) => {
                self.broadcast_group(
                    group,
                    Some(username),
                    ServerEvent::UserTyping(TypingNotice::in_group(username, group)),
                )
                .await;
            }
            TypingTarget::User(peer) => {
                self.send_to_user(peer, ServerEvent::UserTyping(TypingNotice::private(username)))
                    .await;
            }
        }
    }

    /// Helper: typing stop notification to the target's audience
    async fn emit_typing_stopped(&self, username: &Username, target: &TypingTarget) {
        match target {
            TypingTarget::Group(group) => {
                self.broadcast_group(
                    group,
                    Some(username),
                    ServerEvent::UserStoppedTyping(TypingNotice::in_group(username, group)),
                )
                .await;
            }
            TypingTarget::User(peer) => {
                self.send_to_user(
                    peer,
                    ServerEvent::UserStoppedTyping(TypingNotice::private(username)),
                )
                .await;
            }
        }
    }
}
