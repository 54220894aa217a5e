//! Webhook endpoint handlers.
//!
//! The platform waits about five seconds for a response and treats an empty
//! body as "handled, do not retry". Every failure path therefore ends in an
//! empty `200 OK`, never in an error status.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::message::{self, OutboundMessage};
use crate::reply::{HttpReplySource, ReplyResolver, ReplySource};
use crate::web::signature::{HandshakeRequest, SignatureVerifier};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: SignatureVerifier,
    pub resolver: ReplyResolver,
}

impl AppState {
    /// State backed by the HTTP reply source from `config`.
    pub fn new(config: Config) -> Result<Self> {
        let source = HttpReplySource::new(&config)?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// State backed by an arbitrary reply source.
    pub fn with_source(config: Config, source: Arc<dyn ReplySource>) -> Self {
        let verifier = SignatureVerifier::new(config.token.clone());
        let resolver = ReplyResolver::new(source, config.reply_timeout());
        Self {
            config: Arc::new(config),
            verifier,
            resolver,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Handshake
// =============================================================================

/// Handshake endpoint (GET).
///
/// Echoes `echostr` back when the signature checks out, otherwise responds
/// with an empty body.
pub async fn handshake(
    State(state): State<AppState>,
    query: Option<Query<HandshakeRequest>>,
) -> Response {
    let request = query.map(|Query(q)| q).unwrap_or_default();

    if !state.verifier.verify_handshake(&request) {
        warn!(
            timestamp = %request.timestamp,
            nonce = %request.nonce,
            "handshake_rejected"
        );
        return empty_response();
    }

    info!(timestamp = %request.timestamp, "handshake_verified");

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        request.challenge().to_string(),
    )
        .into_response()
}

// =============================================================================
// Message
// =============================================================================

/// Message endpoint (POST).
///
/// Decodes the envelope, resolves a reply for text messages and writes it
/// back as XML. Non-text messages, decode failures and upstream failures
/// all produce an empty body.
pub async fn message(
    State(state): State<AppState>,
    query: Option<Query<HandshakeRequest>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request = query.map(|Query(q)| q).unwrap_or_default();

    // Oversized or unreadable bodies are dropped like any other bad payload
    let body = match body {
        Ok(b) => b,
        Err(rejection) => {
            warn!(
                status = rejection.status().as_u16(),
                error = %rejection.body_text(),
                "message_body_rejected"
            );
            return empty_response();
        }
    };

    if state.config.verify_message_signature && !state.verifier.verify(&request) {
        warn!(
            timestamp = %request.timestamp,
            nonce = %request.nonce,
            "message_signature_invalid"
        );
        return empty_response();
    }

    match dispatch(&state, &body).await {
        Some(xml) => (
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            xml,
        )
            .into_response(),
        None => empty_response(),
    }
}

/// Run one message through decode, resolve and encode.
async fn dispatch(state: &AppState, body: &[u8]) -> Option<String> {
    let inbound = match message::decode_bytes(body) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, body_length = body.len(), "message_decode_failed");
            return None;
        }
    };

    info!(
        to = %inbound.to_account,
        from = %inbound.from_user,
        msg_type = %inbound.message_type,
        content_length = inbound.content.len(),
        "message_received"
    );

    if !inbound.message_type.is_text() {
        info!(msg_type = %inbound.message_type, "message_dropped_unsupported_type");
        return None;
    }

    let content = state.resolver.resolve(&inbound).await?;
    let reply = OutboundMessage::reply_to(&inbound, content, now_millis())?;
    let xml = message::encode(&reply);

    info!(
        to = %reply.to_account,
        reply_length = reply.content.len(),
        "message_reply_sent"
    );

    Some(xml)
}

fn empty_response() -> Response {
    StatusCode::OK.into_response()
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
