//! Upstream reply source.
//!
//! The production source is a free chatbot API queried with
//! `GET <base>?key=..&appid=..&msg=<text>` that answers
//! `{"result": 0, "content": "..."}`. A non-zero `result` is an error.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use crate::error::UpstreamError;
use crate::Config;

/// Result payload returned by the reply source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpstreamReplyResult {
    /// `0` on success
    #[serde(rename = "result")]
    pub status_code: i64,
    /// Reply text, only meaningful on success
    #[serde(default)]
    pub content: Option<String>,
}

impl UpstreamReplyResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            content: Some(content.into()),
        }
    }

    pub fn failure(status_code: i64) -> Self {
        Self {
            status_code,
            content: None,
        }
    }

    /// Reply text for a successful result, `Status` error otherwise.
    pub fn into_reply(self) -> Result<String, UpstreamError> {
        if self.status_code != 0 {
            return Err(UpstreamError::Status(self.status_code));
        }
        Ok(self.content.unwrap_or_default())
    }
}

/// Anything that can produce a conversational reply for a piece of text.
#[async_trait]
pub trait ReplySource: Send + Sync {
    async fn query(&self, message: &str) -> Result<UpstreamReplyResult, UpstreamError>;
}

/// Reply source backed by the HTTP chatbot API.
#[derive(Debug, Clone)]
pub struct HttpReplySource {
    client: Client,
    base_url: String,
    key: String,
    appid: String,
    timeout: Duration,
}

impl HttpReplySource {
    /// Build a source from the service configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = config.reply_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build reply source HTTP client")?;

        Url::parse(&config.reply_api_url).context("REPLY_API_URL is not a valid URL")?;

        Ok(Self {
            client,
            base_url: config.reply_api_url.clone(),
            key: config.reply_api_key.clone(),
            appid: config.reply_api_appid.clone(),
            timeout,
        })
    }

    fn request_url(&self, message: &str) -> Result<Url, UpstreamError> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("key", self.key.as_str()),
                ("appid", self.appid.as_str()),
                ("msg", message),
            ],
        )
        .map_err(|e| UpstreamError::Request(e.to_string()))
    }
}

#[async_trait]
impl ReplySource for HttpReplySource {
    async fn query(&self, message: &str) -> Result<UpstreamReplyResult, UpstreamError> {
        let url = self.request_url(message)?;
        let timeout_ms = self.timeout.as_millis() as u64;

        info!(
            message_length = message.len(),
            timeout_ms = timeout_ms,
            "reply_source_request_starting"
        );

        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                error!(timeout_ms = timeout_ms, error = %e, "reply_source_timeout");
                return Err(UpstreamError::Timeout(timeout_ms));
            }
            Err(e) => {
                error!(error = %e, "reply_source_request_error");
                return Err(UpstreamError::Request(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(timeout_ms)
            } else {
                UpstreamError::Request(e.to_string())
            }
        })?;

        let result: UpstreamReplyResult = serde_json::from_str(&body).map_err(|e| {
            error!(
                status_code = status,
                body_length = body.len(),
                error = %e,
                "reply_source_malformed_result"
            );
            UpstreamError::Malformed(e.to_string())
        })?;

        info!(
            status_code = status,
            result = result.status_code,
            "reply_source_request_complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    use axum::{extract::Query, routing::get, Router};
    use tokio::net::TcpListener;

    async fn chatbot(Query(params): Query<HashMap<String, String>>) -> String {
        let msg = params.get("msg").cloned().unwrap_or_default();
        match msg.as_str() {
            "fail" => r#"{"result":40001}"#.to_string(),
            "garbage" => "<html>oops</html>".to_string(),
            "slow" => {
                tokio::time::sleep(Duration::from_millis(500)).await;
                r#"{"result":0,"content":"late"}"#.to_string()
            }
            _ => {
                let key = params.get("key").cloned().unwrap_or_default();
                let appid = params.get("appid").cloned().unwrap_or_default();
                serde_json::json!({
                    "result": 0,
                    "content": format!("{}|{}|{}", key, appid, msg),
                })
                .to_string()
            }
        }
    }

    async fn spawn_chatbot() -> SocketAddr {
        let app = Router::new().route("/api.php", get(chatbot));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn source_for(addr: SocketAddr, timeout_ms: u64) -> HttpReplySource {
        let mut config = Config::new("token");
        config.reply_api_url = format!("http://{}/api.php", addr);
        config.reply_timeout_ms = timeout_ms;
        HttpReplySource::new(&config).unwrap()
    }

    #[test]
    fn test_into_reply() {
        assert_eq!(
            UpstreamReplyResult::success("hello").into_reply().unwrap(),
            "hello"
        );
        assert!(matches!(
            UpstreamReplyResult::failure(40001).into_reply(),
            Err(UpstreamError::Status(40001))
        ));
    }

    #[test]
    fn test_result_deserialize() {
        let ok: UpstreamReplyResult =
            serde_json::from_str(r#"{"result":0,"content":"hello back"}"#).unwrap();
        assert_eq!(ok, UpstreamReplyResult::success("hello back"));

        let failed: UpstreamReplyResult = serde_json::from_str(r#"{"result":1}"#).unwrap();
        assert_eq!(failed, UpstreamReplyResult::failure(1));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = Config::new("token");
        config.reply_api_url = "not a url".to_string();
        assert!(HttpReplySource::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_query_encodes_parameters() {
        let addr = spawn_chatbot().await;
        let source = source_for(addr, 2000);

        let result = source.query("你好 & bye").await.unwrap();

        assert_eq!(result.status_code, 0);
        assert_eq!(result.content.as_deref(), Some("free|0|你好 & bye"));
    }

    #[tokio::test]
    async fn test_query_non_zero_status() {
        let addr = spawn_chatbot().await;
        let source = source_for(addr, 2000);

        let result = source.query("fail").await.unwrap();
        assert!(matches!(result.into_reply(), Err(UpstreamError::Status(40001))));
    }

    #[tokio::test]
    async fn test_query_malformed_body() {
        let addr = spawn_chatbot().await;
        let source = source_for(addr, 2000);

        let result = source.query("garbage").await;
        assert!(matches!(result, Err(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let addr = spawn_chatbot().await;
        let source = source_for(addr, 100);

        let result = source.query("slow").await;
        assert!(matches!(result, Err(UpstreamError::Timeout(100))));
    }

    #[tokio::test]
    async fn test_query_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = source_for(addr, 1000);
        let result = source.query("hi").await;
        assert!(matches!(result, Err(UpstreamError::Request(_))));
    }
}
