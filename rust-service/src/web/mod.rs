//! Web server module for the platform webhook.
//!
//! One path serves both flows:
//! - `GET`: signature handshake, echoes the challenge
//! - `POST`: message push, answers with a passive XML reply or nothing

pub mod handlers;
pub mod signature;

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

pub use handlers::{handshake, health, message, AppState, HealthResponse};
pub use signature::{compute_signature, verify_signature, HandshakeRequest, SignatureVerifier};

/// Path registered with the platform as the server URL.
pub const DISPATCH_PATH: &str = "/dispatcherEndpoint";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(DISPATCH_PATH, get(handshake).post(message))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A panicking handler still answers with an empty body.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    error!(panic = %detail, "handler_panicked");
    StatusCode::OK.into_response()
}
