//! Reply selection for inbound text messages.
//!
//! A fixed phrase gets a fixed reply without touching the network. Anything
//! else is forwarded to the [`ReplySource`]; any upstream failure means no
//! reply at all.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::source::ReplySource;
use crate::error::UpstreamError;
use crate::message::InboundMessage;

/// Exact, case-sensitive phrase that short-circuits the upstream lookup.
pub const TRIGGER_PHRASE: &str = "唐成靖文";

/// Reply sent for [`TRIGGER_PHRASE`].
pub const CELEBRATORY_REPLY: &str = "唐成靖文❤迪丽热巴迪力木拉提";

/// Decides what to answer to an inbound text message.
#[derive(Clone)]
pub struct ReplyResolver {
    source: Arc<dyn ReplySource>,
    timeout: Duration,
}

impl ReplyResolver {
    pub fn new(source: Arc<dyn ReplySource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Resolve the reply text. `None` means nothing should be sent.
    pub async fn resolve(&self, message: &InboundMessage) -> Option<String> {
        if !message.message_type.is_text() {
            debug!(msg_type = %message.message_type, "reply_skipped_non_text");
            return None;
        }

        if message.content == TRIGGER_PHRASE {
            info!(reply = CELEBRATORY_REPLY, "reply_fixed_phrase");
            return Some(CELEBRATORY_REPLY.to_string());
        }

        match self.query(&message.content).await {
            Ok(reply) if reply.is_empty() => {
                info!(from = %message.from_user, "reply_source_empty");
                None
            }
            Ok(reply) => {
                info!(from = %message.from_user, reply = %reply, "reply_source_answered");
                Some(reply)
            }
            Err(e) => {
                warn!(from = %message.from_user, error = %e, "reply_source_failed");
                None
            }
        }
    }

    async fn query(&self, content: &str) -> Result<String, UpstreamError> {
        let result = tokio::time::timeout(self.timeout, self.source.query(content))
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout.as_millis() as u64))??;

        result.into_reply()
    }
}
