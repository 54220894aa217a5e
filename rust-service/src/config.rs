//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup. The shared handshake token is the only
//! required value; a missing token stops the process before it binds a port.

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::error::ConfigError;

/// Default upstream chatbot endpoint.
pub const DEFAULT_REPLY_API_URL: &str = "http://api.qingyunke.com/api.php";

/// Largest accepted reply source timeout. The platform gives up after ~5s.
pub const MAX_REPLY_TIMEOUT_MS: u64 = 4500;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret registered with the platform for the handshake
    pub token: String,

    /// Port for the web server to listen on
    pub port: u16,

    /// Base URL of the upstream reply source
    pub reply_api_url: String,

    /// `key` parameter sent to the reply source
    pub reply_api_key: String,

    /// `appid` parameter sent to the reply source
    pub reply_api_appid: String,

    /// Upper bound on the reply source round trip in milliseconds.
    /// The platform abandons a webhook after roughly five seconds.
    pub reply_timeout_ms: u64,

    /// Re-check the signature query parameters on message POSTs
    pub verify_message_signature: bool,
}

impl Config {
    /// Build a configuration with the given token and defaults for the rest.
    pub fn new(token: impl Into<String>) -> Self {
        Config {
            token: token.into(),
            port: 8080,
            reply_api_url: DEFAULT_REPLY_API_URL.to_string(),
            reply_api_key: "free".to_string(),
            reply_api_appid: "0".to_string(),
            reply_timeout_ms: 3000,
            verify_message_signature: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("WECHAT_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let mut config = Config::new(token);

        config.port = parse_or("PORT", lookup("PORT"), config.port);

        if let Some(url) = non_empty(lookup("REPLY_API_URL")) {
            config.reply_api_url = url;
        }
        if let Some(key) = non_empty(lookup("REPLY_API_KEY")) {
            config.reply_api_key = key;
        }
        if let Some(appid) = non_empty(lookup("REPLY_API_APPID")) {
            config.reply_api_appid = appid;
        }

        let reply_timeout_ms = parse_or(
            "REPLY_TIMEOUT_MS",
            lookup("REPLY_TIMEOUT_MS"),
            config.reply_timeout_ms,
        );
        config.reply_timeout_ms = if reply_timeout_ms > MAX_REPLY_TIMEOUT_MS {
            warn!(
                env_var = "REPLY_TIMEOUT_MS",
                value = reply_timeout_ms,
                max = MAX_REPLY_TIMEOUT_MS,
                "Timeout exceeds response budget, clamping"
            );
            MAX_REPLY_TIMEOUT_MS
        } else {
            reply_timeout_ms
        };

        config.verify_message_signature = parse_bool(
            "VERIFY_MESSAGE_SIGNATURE",
            lookup("VERIFY_MESSAGE_SIGNATURE"),
            config.verify_message_signature,
        );

        Ok(config)
    }

    /// Reply source timeout as a [`Duration`].
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a value, logging and falling back to `default` when it is invalid.
fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    let raw = match non_empty(raw) {
        Some(v) => v,
        None => return default,
    };

    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a boolean flag like "true", "1", "yes" or "false", "0", "no".
fn parse_bool(name: &str, raw: Option<String>, default: bool) -> bool {
    let raw = match non_empty(raw) {
        Some(v) => v,
        None => return default,
    };

    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid flag, using default");
            default
        }
    }
}
