//! Message envelope model and codec.
//!
//! ## Flow
//!
//! ```text
//! request body → decode() → InboundMessage → OutboundMessage::reply_to() → encode() → response body
//! ```

pub mod codec;
pub mod types;

pub use codec::{decode, decode_bytes, encode};
pub use types::{InboundMessage, MessageType, OutboundMessage, TEXT_MSG_TYPE};
