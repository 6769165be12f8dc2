//! Wire protocol definitions
//!
//! JSON-based bidirectional event protocol using Serde's adjacently
//! tagged enums: every frame is `{"event": <name>, "data": <payload>}`
//! with camelCase event and field names.

use serde::{Deserialize, Serialize};

use crate::types::{GroupName, Username};

/// Client → Server event
///
/// All events from client to server. Optional `group` / `recipientUsername`
/// fields select between a group channel and a direct-message channel.
#[derive(Debug, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Join a group under a username (also claims the username)
    Join {
        username: Username,
        group: GroupName,
    },
    /// Leave a group
    Leave {
        username: Username,
        group: GroupName,
    },
    /// Typing indicator started toward a group or a peer
    StartTyping {
        group: Option<GroupName>,
        recipient_username: Option<Username>,
    },
    /// Typing indicator stopped
    StopTyping {
        group: Option<GroupName>,
        recipient_username: Option<Username>,
    },
    /// Send a chat message to a group or a peer
    SendMessage {
        group: Option<GroupName>,
        recipient_username: Option<Username>,
        message: ChatMessage,
    },
}

/// Client-authored message body as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name the client rendered the message under
    pub user: String,
    /// Message text
    pub text: String,
}

/// Server → Client event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Chat or system message
    Message(MessagePayload),
    /// Join request failed
    JoinError { message: String },
    /// Send request failed
    MessageError { error: String },
    /// Snapshot of a group's current member list
    UpdateUserList(Vec<Username>),
    /// Someone started typing
    UserTyping(TypingNotice),
    /// Someone stopped typing
    UserStoppedTyping(TypingNotice),
}

/// Payload of a `message` event
///
/// Group messages carry `senderUsername` and `timestamp`; direct messages
/// additionally carry `recipientUsername` and `isPrivate`; system notices
/// carry only `type: "system"` and `user: "System"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub user: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<Username>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_username: Option<Username>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
}

/// Message category tag; absent for ordinary chat messages
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    System,
}

impl MessagePayload {
    /// Server-generated system notice
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            user: "System".to_string(),
            text: text.into(),
            sender_username: None,
            recipient_username: None,
            is_private: None,
            timestamp: None,
            kind: Some(MessageKind::System),
        }
    }

    /// Group broadcast copy of a client message
    pub fn group(message: ChatMessage, sender: &Username) -> Self {
        Self {
            user: message.user,
            text: message.text,
            sender_username: Some(sender.clone()),
            recipient_username: None,
            is_private: None,
            timestamp: Some(wall_clock_timestamp()),
            kind: None,
        }
    }

    /// Direct-message copy delivered to the peer
    pub fn direct(message: ChatMessage, sender: &Username, recipient: &Username) -> Self {
        Self {
            user: message.user,
            text: message.text,
            sender_username: Some(sender.clone()),
            recipient_username: Some(recipient.clone()),
            is_private: Some(true),
            timestamp: Some(wall_clock_timestamp()),
            kind: None,
        }
    }

    /// Direct-message copy echoed back to the sender
    ///
    /// Same envelope as the peer's copy, with `user` replaced so the
    /// sender's client renders it as self-authored.
    pub fn direct_echo(message: ChatMessage, sender: &Username, recipient: &Username) -> Self {
        Self {
            user: "You".to_string(),
            ..Self::direct(message, sender, recipient)
        }
    }
}

/// Payload of `userTyping` / `userStoppedTyping` events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    pub username: Username,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

impl TypingNotice {
    /// Notice scoped to a group channel
    pub fn in_group(username: &Username, group: &GroupName) -> Self {
        Self {
            username: username.clone(),
            group: Some(group.clone()),
            is_private: None,
        }
    }

    /// Notice scoped to a direct-message channel
    pub fn private(username: &Username) -> Self {
        Self {
            username: username.clone(),
            group: None,
            is_private: Some(true),
        }
    }
}

/// Localized hour:minute timestamp (12-hour, zero-padded), taken at the
/// moment of send on the server clock.
pub fn wall_clock_timestamp() -> String {
    chrono::Local::now().format("%I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_deserialize_join() {
        let json = r#"{"event": "join", "data": {"username": "alice", "group": "lobby"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::Join { username, group } => {
                assert_eq!(username, Username::new("alice"));
                assert_eq!(group, GroupName::new("lobby"));
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_client_event_optional_fields_default() {
        let json = r#"{"event": "startTyping", "data": {"group": "lobby"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::StartTyping {
                group,
                recipient_username,
            } => {
                assert_eq!(group, Some(GroupName::new("lobby")));
                assert!(recipient_username.is_none());
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_send_message_camel_case_fields() {
        let json = r#"{
            "event": "sendMessage",
            "data": {
                "recipientUsername": "bob",
                "message": {"user": "alice", "text": "hi"}
            }
        }"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::SendMessage {
                group,
                recipient_username,
                message,
            } => {
                assert!(group.is_none());
                assert_eq!(recipient_username, Some(Username::new("bob")));
                assert_eq!(message.text, "hi");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_system_message_serialize() {
        let event = ServerEvent::Message(MessagePayload::system("alice has joined the group"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"message\""));
        assert!(json.contains("\"type\":\"system\""));
        assert!(json.contains("\"user\":\"System\""));
        // Unused envelope fields stay off the wire
        assert!(!json.contains("isPrivate"));
        assert!(!json.contains("timestamp"));
    }

    #[test]
    fn test_direct_message_serialize() {
        let msg = ChatMessage {
            user: "alice".to_string(),
            text: "psst".to_string(),
        };
        let payload = MessagePayload::direct(msg, &Username::new("alice"), &Username::new("bob"));
        let json = serde_json::to_string(&ServerEvent::Message(payload)).unwrap();
        assert!(json.contains("\"senderUsername\":\"alice\""));
        assert!(json.contains("\"recipientUsername\":\"bob\""));
        assert!(json.contains("\"isPrivate\":true"));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn test_direct_echo_rewrites_user() {
        let msg = ChatMessage {
            user: "alice".to_string(),
            text: "psst".to_string(),
        };
        let payload =
            MessagePayload::direct_echo(msg, &Username::new("alice"), &Username::new("bob"));
        assert_eq!(payload.user, "You");
        assert_eq!(payload.sender_username, Some(Username::new("alice")));
    }

    #[test]
    fn test_user_list_serializes_as_array() {
        let event =
            ServerEvent::UpdateUserList(vec![Username::new("alice"), Username::new("bob")]);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"updateUserList\""));
        assert!(json.contains("\"data\":[\"alice\",\"bob\"]"));
    }

    #[test]
    fn test_typing_notice_serialize() {
        let notice = TypingNotice::in_group(&Username::new("alice"), &GroupName::new("lobby"));
        let json = serde_json::to_string(&ServerEvent::UserTyping(notice)).unwrap();
        assert!(json.contains("\"event\":\"userTyping\""));
        assert!(json.contains("\"group\":\"lobby\""));
        assert!(!json.contains("isPrivate"));

        let private = TypingNotice::private(&Username::new("alice"));
        let json = serde_json::to_string(&ServerEvent::UserStoppedTyping(private)).unwrap();
        assert!(json.contains("\"event\":\"userStoppedTyping\""));
        assert!(json.contains("\"isPrivate\":true"));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = wall_clock_timestamp();
        // "hh:mm AM" / "hh:mm PM"
        assert_eq!(ts.len(), 8);
        assert_eq!(&ts[2..3], ":");
        assert!(ts.ends_with("AM") || ts.ends_with("PM"));
    }
}
