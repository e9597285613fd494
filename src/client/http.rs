//! 阻塞 HTTP 客户端（ureq）的异步包装
//!
//! 请求在 `spawn_blocking` 中执行，Agent 统一设置全局超时。

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{trace, warn};
use ureq::Agent;

use super::ClientError;

/// Footprint API 客户端（`api_base_url` 指向 `/api`）
#[derive(Clone)]
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    admin_token: Option<String>,
}

fn map_ureq_error(url: &str, err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::StatusCode(status) => ClientError::Http {
            status,
            message: format!("request to {} failed", url),
        },
        other => ClientError::Network(format!("{}: {}", url, other)),
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, admin_token: Option<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_token: admin_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET 并解析 JSON
    pub async fn get_json<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(path);
        let auth = self.admin_token.as_ref().map(|t| format!("Bearer {}", t));

        tokio::task::spawn_blocking(move || {
            trace!("GET {}", url);
            let mut request = agent.get(&url);
            if let Some(auth) = auth {
                request = request.header("Authorization", auth);
            }
            let response = request.call().map_err(|e| map_ureq_error(&url, e))?;
            response
                .into_body()
                .read_json::<T>()
                .map_err(|e| ClientError::Decode(format!("{}: {}", url, e)))
        })
        .await
        .map_err(|e| {
            warn!("HTTP spawn_blocking failed: {}", e);
            ClientError::Network(format!("request task failed: {}", e))
        })?
    }

    /// POST JSON，返回响应体（解析失败时为 `Null`）
    pub async fn post_json<B>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, ClientError>
    where
        B: Serialize,
    {
        let payload = serde_json::to_value(body)?;
        let agent = self.agent.clone();
        let url = self.url(path);
        let auth = self.admin_token.as_ref().map(|t| format!("Bearer {}", t));

        tokio::task::spawn_blocking(move || {
            trace!("POST {}", url);
            let mut request = agent.post(&url);
            if let Some(auth) = auth {
                request = request.header("Authorization", auth);
            }
            let response = request
                .send_json(&payload)
                .map_err(|e| map_ureq_error(&url, e))?;
            Ok(response
                .into_body()
                .read_json::<serde_json::Value>()
                .unwrap_or(serde_json::Value::Null))
        })
        .await
        .map_err(|e| {
            warn!("HTTP spawn_blocking failed: {}", e);
            ClientError::Network(format!("request task failed: {}", e))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new("http://127.0.0.1:3000/api/", Duration::from_secs(1), None);
        assert_eq!(client.url("/visitors"), "http://127.0.0.1:3000/api/visitors");
        assert_eq!(client.base_url(), "http://127.0.0.1:3000/api");
    }

    #[test]
    fn test_empty_admin_token_is_dropped() {
        let client = ApiClient::new("http://x/api", Duration::from_secs(1), Some(String::new()));
        assert!(client.admin_token.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // 端口 9 (discard) 通常没有监听
        let client = ApiClient::new("http://127.0.0.1:9/api", Duration::from_secs(1), None);
        let result: Result<serde_json::Value, _> = client.get_json("/visitors/count").await;
        assert!(matches!(result, Err(ClientError::Network(_))));
    }
}
