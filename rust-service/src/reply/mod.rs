//! Reply resolution for inbound text messages.

pub mod resolver;
pub mod source;

pub use resolver::{ReplyResolver, CELEBRATORY_REPLY, TRIGGER_PHRASE};
pub use source::{HttpReplySource, ReplySource, UpstreamReplyResult};
