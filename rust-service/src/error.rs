//! Error types for the dispatch service.
//!
//! Only [`ConfigError`] is ever fatal. Decode and upstream errors are
//! recovered inside the request flow and end in an empty response body.

use thiserror::Error;

/// Startup configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WECHAT_TOKEN is not set or is blank")]
    MissingToken,
}

/// Inbound message envelope could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("request body is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("no root element in request body")]
    MissingRoot,

    #[error("unclosed element in request body")]
    Unclosed,

    #[error("more than one root element in request body")]
    MultipleRoots,
}

/// Failure talking to the upstream reply source.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("reply source request failed: {0}")]
    Request(String),

    #[error("reply source timed out after {0}ms")]
    Timeout(u64),

    #[error("reply source returned an unreadable result: {0}")]
    Malformed(String),

    #[error("reply source returned status {0}")]
    Status(i64),
}
