//! WeChat Dispatch - webhook endpoint for the official-account message protocol.
//!
//! The service answers two kinds of platform requests on a single path:
//! - the signature handshake that proves ownership of the endpoint
//! - message pushes, answered with a passive XML reply
//!
//! ## Architecture
//!
//! ```text
//! GET  → SignatureVerifier → echostr | empty
//! POST → decode → ReplyResolver → (fixed reply | reply source) → encode → XML | empty
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod reply;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, DecodeError, UpstreamError};
pub use message::{InboundMessage, MessageType, OutboundMessage};
pub use reply::{HttpReplySource, ReplyResolver, ReplySource, UpstreamReplyResult};
pub use web::{router, AppState, SignatureVerifier, DISPATCH_PATH};
