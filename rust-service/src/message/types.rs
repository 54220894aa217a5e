//! Normalized message model for the platform's XML envelope.

use std::fmt;

/// Message type literal for plain text.
pub const TEXT_MSG_TYPE: &str = "text";

/// Kind of an inbound message.
///
/// Only text is handled; everything else is dropped without a reply.
/// The raw value is kept so it can be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Other(String),
}

impl MessageType {
    /// Map a raw `MsgType` value. Matching is exact and case-sensitive.
    pub fn parse(raw: &str) -> Self {
        if raw == TEXT_MSG_TYPE {
            MessageType::Text
        } else {
            MessageType::Other(raw.to_string())
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, MessageType::Text)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Text => f.write_str(TEXT_MSG_TYPE),
            MessageType::Other(raw) => f.write_str(raw),
        }
    }
}

/// A message pushed to us by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The bot's account (`ToUserName`)
    pub to_account: String,
    /// The sender's OpenID (`FromUserName`)
    pub from_user: String,
    /// `MsgType`
    pub message_type: MessageType,
    /// `Content`, empty when absent
    pub content: String,
}

/// A passive reply written back in the webhook response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient, the inbound sender
    pub to_account: String,
    /// Our account, the inbound recipient
    pub from_account: String,
    /// Epoch milliseconds
    pub created_at: i64,
    pub content: String,
}

impl OutboundMessage {
    /// Build the reply to `inbound`, swapping sender and recipient.
    ///
    /// Returns `None` for anything but text messages.
    pub fn reply_to(
        inbound: &InboundMessage,
        content: impl Into<String>,
        created_at: i64,
    ) -> Option<Self> {
        if !inbound.message_type.is_text() {
            return None;
        }

        Some(OutboundMessage {
            to_account: inbound.from_user.clone(),
            from_account: inbound.to_account.clone(),
            created_at,
            content: content.into(),
        })
    }

    /// Always `text`; only text replies are produced.
    pub fn message_type(&self) -> &'static str {
        TEXT_MSG_TYPE
    }
}
