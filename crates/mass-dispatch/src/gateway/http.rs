//! 基于 HTTP 的推送网关实现
//!
//! `POST {url}`，请求体为消息数组，响应体为 `{"data": [ticket, ...]}`。

use std::time::Duration;

use async_trait::async_trait;
use push_shared::config::GatewayConfig;
use push_shared::error::PushError;
use serde::Deserialize;
use tracing::debug;

use super::{GatewayError, PushGateway, PushMessage, PushTicket};

#[derive(Debug, Deserialize)]
struct PushResponse {
    data: Vec<PushTicket>,
}

#[derive(Clone)]
pub struct HttpPushGateway {
    client: reqwest::Client,
    url: String,
    access_token: Option<String>,
    timeout_ms: u64,
}

impl HttpPushGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| PushError::GatewayClient(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            access_token: config.access_token.clone(),
            timeout_ms: config.request_timeout_ms,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_ms)
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send_batch(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, GatewayError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(messages);

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let parsed: PushResponse = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        debug!(
            messages = messages.len(),
            tickets = parsed.data.len(),
            "网关调用完成"
        );

        Ok(parsed.data)
    }
}
