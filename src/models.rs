//! Data models for Chiota.
//!
//! This module defines the messages exchanged through the messenger and the
//! contact and chat types the interactors hand back to callers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SIGNATURE_LENGTH;

/// Kind of a message sent through the messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Encrypted contact descriptor sent to a request address.
    RequestContact,
    /// Encrypted chat message part.
    ChatMessage,
    /// Chat password records at a chat key address.
    KeyExchange,
    /// Encrypted contact descriptor answering a request.
    AcceptContact,
    /// Public key upload.
    CreateUser,
    /// Anything else. Never sent.
    Unknown,
}

impl MessageType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::RequestContact => "RequestContact",
            MessageType::ChatMessage => "ChatMessage",
            MessageType::KeyExchange => "KeyExchange",
            MessageType::AcceptContact => "AcceptContact",
            MessageType::CreateUser => "CreateUser",
            MessageType::Unknown => "Unknown",
        }
    }

    /// Whether the messenger accepts this type for sending.
    pub fn is_known(&self) -> bool {
        !matches!(self, MessageType::Unknown)
    }
}

impl FromStr for MessageType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RequestContact" => MessageType::RequestContact,
            "ChatMessage" => MessageType::ChatMessage,
            "KeyExchange" => MessageType::KeyExchange,
            "AcceptContact" => MessageType::AcceptContact,
            "CreateUser" => MessageType::CreateUser,
            _ => MessageType::Unknown,
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message sent to, or recovered from, an address on the ledger.
///
/// Messages recovered from the ledger carry [`MessageType::Unknown`], since
/// the type is not recorded on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message type.
    pub message_type: MessageType,
    /// Tryte-encoded payload.
    pub payload: String,
    /// Address the message is sent to.
    pub receiver_address: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(
        message_type: MessageType,
        payload: impl Into<String>,
        receiver_address: impl Into<String>,
    ) -> Self {
        Self {
            message_type,
            payload: payload.into(),
            receiver_address: receiver_address.into(),
        }
    }

    /// Creates a message from a wire type name.
    pub fn with_type_name(
        type_name: &str,
        payload: impl Into<String>,
        receiver_address: impl Into<String>,
    ) -> Self {
        let message_type = type_name.parse().unwrap_or(MessageType::Unknown);
        Self::new(message_type, payload, receiver_address)
    }
}

/// A contact, as exchanged in encrypted descriptors.
///
/// Two contacts are the same contact when their chat addresses match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Display name.
    pub name: String,
    /// Hash of the avatar image.
    pub image_hash: String,
    /// Address of the private chat channel.
    pub chat_address: String,
    /// Address of the chat key exchange.
    pub chat_key_address: String,
    /// Address of the contact's public key upload.
    pub public_key_address: String,
    /// Address to answer the contact at (their request address).
    pub contact_address: String,
    /// Whether the contact is still an open request.
    pub requested: bool,
    /// Whether the request was declined.
    pub rejected: bool,
    /// The contact's public key, as trytes.
    pub public_key: Option<String>,
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.chat_address == other.chat_address
    }
}

impl Eq for Contact {}

impl Hash for Contact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chat_address.hash(state);
    }
}

/// A contact as stored by the local contact repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    /// Chat address identifying the contact.
    pub chat_address: String,
    /// Whether the contact was accepted (false means declined).
    pub accepted: bool,
    /// Public key address of the user owning the record.
    pub public_key_address: String,
}

/// A decrypted chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// When the sender created the message.
    pub date: DateTime<Utc>,
    /// Message text.
    pub message: String,
    /// First thirty trytes of the sender's public key.
    pub signature: String,
    /// Whether the message was assembled starting from its first part.
    pub is_first_part: bool,
}

impl ChatMessage {
    /// Whether the message was sent by the owner of this public key.
    pub fn is_from(&self, public_key_trytes: &str) -> bool {
        public_key_trytes.len() >= SIGNATURE_LENGTH
            && self.signature == public_key_trytes[..SIGNATURE_LENGTH]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn contact(chat_address: &str, name: &str) -> Contact {
        Contact {
            name: name.to_string(),
            image_hash: String::new(),
            chat_address: chat_address.to_string(),
            chat_key_address: "KEY".to_string(),
            public_key_address: "PK".to_string(),
            contact_address: "REQ".to_string(),
            requested: true,
            rejected: false,
            public_key: None,
        }
    }

    #[test]
    fn test_message_type_names() {
        for name in [
            "RequestContact",
            "ChatMessage",
            "KeyExchange",
            "AcceptContact",
            "CreateUser",
        ] {
            let parsed: MessageType = name.parse().unwrap();
            assert!(parsed.is_known());
            assert_eq!(parsed.as_str(), name);
        }

        let unknown: MessageType = "Gossip".parse().unwrap();
        assert_eq!(unknown, MessageType::Unknown);
        assert!(!unknown.is_known());
    }

    #[test]
    fn test_message_with_type_name() {
        let message = Message::with_type_name("KeyExchange", "ABC", "ADDR");
        assert_eq!(message.message_type, MessageType::KeyExchange);
        let message = Message::with_type_name("keyexchange", "ABC", "ADDR");
        assert_eq!(message.message_type, MessageType::Unknown);
    }

    #[test]
    fn test_contact_identity_is_chat_address() {
        let a = contact("CHAT", "Kevin");
        let mut b = contact("CHAT", "Someone else");
        b.requested = false;
        assert_eq!(a, b);
        assert_ne!(a, contact("OTHER", "Kevin"));

        let set: HashSet<Contact> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_contact_json_field_names() {
        let json = serde_json::to_string(&contact("CHAT", "Kevin")).unwrap();
        assert!(json.contains("\"chatAddress\":\"CHAT\""));
        assert!(json.contains("\"chatKeyAddress\""));

        let parsed: Contact = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "Kevin");
    }

    #[test]
    fn test_chat_message_is_from() {
        let key = "A".repeat(64);
        let message = ChatMessage {
            date: Utc::now(),
            message: "hi".to_string(),
            signature: "A".repeat(SIGNATURE_LENGTH),
            is_first_part: true,
        };
        assert!(message.is_from(&key));
        assert!(!message.is_from(&"B".repeat(64)));
        assert!(!message.is_from("A"));
    }
}
