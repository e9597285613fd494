//! Client layer: visitor recorder and admin dashboard
//!
//! Rust 版的浏览器端埋点与仪表盘。浏览器 localStorage 由 `KeyValueStore`
//! 抽象，网络调用全部带超时，失败只记日志并回退到本地存储。
//!
//! # Architecture
//!
//! ```text
//! Recorder ──→ FallbackSink ──→ RemoteSink (POST /api/*)
//!                           └→ LocalSink  (portfolio_* keys)
//!
//! Dashboard ──→ ApiClient (GET /api/admin/*)
//!           └→ LocalSink records → analytics::aggregate (offline)
//! ```
//!
//! 所有状态都挂在显式构造的 `ClientContext` 上，没有全局可变状态。

pub mod dashboard;
pub mod fingerprint;
mod http;
pub mod identity;
pub mod recorder;
pub mod sink;

pub use dashboard::{DashboardClient, DashboardPoller, DashboardState, DataSource, Panel};
pub use fingerprint::{Fingerprint, Viewport, detect_browser, detect_device, screen_size};
pub use http::ApiClient;
pub use identity::{
    JsonFileStore, KeyValueStore, MemoryStore, SESSION_START_KEY, VISITOR_ID_KEY,
    get_or_create_visitor_id,
};
pub use recorder::{MIN_SESSION_SECONDS, PageSession, Recorder, SessionOutcome};
pub use sink::{EventSink, FallbackSink, LocalRecords, LocalSink, RemoteSink};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::errors::FootprintError;

// ============ ClientError ============

/// Errors from the client layer
#[derive(Debug)]
pub enum ClientError {
    /// Local key/value store read or write failed
    Storage(String),
    /// Transport failure (connect, timeout, DNS)
    Network(String),
    /// Server answered with a non-success status
    Http { status: u16, message: String },
    /// Response or stored value could not be decoded
    Decode(String),
    /// Beacon transport not available, event must be buffered
    Unavailable,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Storage(msg) => write!(f, "Storage error: {}", msg),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http { status, message } => write!(f, "HTTP {}: {}", status, message),
            ClientError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ClientError::Unavailable => write!(f, "Transport unavailable"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<ClientError> for FootprintError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Storage(msg) => FootprintError::file_operation(msg),
            ClientError::Network(msg) => FootprintError::network(msg),
            ClientError::Http { status, message } => {
                FootprintError::network(format!("HTTP {}: {}", status, message))
            }
            ClientError::Decode(msg) => FootprintError::serialization(msg),
            ClientError::Unavailable => FootprintError::network("transport unavailable"),
        }
    }
}

// ============ ClientContext ============

/// 记录器与仪表盘共用的上下文
///
/// 持有本地存储、上报通道和 API 客户端；克隆开销是几个 `Arc`。
#[derive(Clone)]
pub struct ClientContext {
    config: ClientConfig,
    store: Arc<dyn KeyValueStore>,
    local: Arc<LocalSink>,
    sink: Arc<dyn EventSink>,
    api: ApiClient,
}

impl ClientContext {
    /// 按配置组装：JSON 文件存储 + 本地镜像、远程上报
    pub fn from_config(config: &ClientConfig) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.storage_path));
        Self::with_store(config.clone(), store)
    }

    /// 使用指定的本地存储（测试、嵌入式前端）
    pub fn with_store(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let api = ApiClient::new(
            &config.api_base_url,
            Duration::from_secs(config.timeout_secs),
            config.admin_token.clone(),
        );
        let local = Arc::new(LocalSink::new(store.clone()));
        let remote = Arc::new(RemoteSink::new(api.clone()));
        let sink: Arc<dyn EventSink> = Arc::new(FallbackSink::mirrored(remote, local.clone()));
        Self {
            config,
            store,
            local,
            sink,
            api,
        }
    }

    /// 替换上报通道（测试中注入假的 sink）
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn local(&self) -> &Arc<LocalSink> {
        &self.local
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.config.poll_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Http {
            status: 404,
            message: "Visitor not found".into(),
        };
        assert_eq!(format!("{}", err), "HTTP 404: Visitor not found");
        assert_eq!(
            format!("{}", ClientError::Network("timed out".into())),
            "Network error: timed out"
        );
    }

    #[test]
    fn test_client_error_into_footprint_error() {
        let err: FootprintError = ClientError::Decode("bad json".into()).into();
        assert!(matches!(err, FootprintError::Serialization(_)));
        let err: FootprintError = ClientError::Unavailable.into();
        assert!(matches!(err, FootprintError::Network(_)));
    }

    #[test]
    fn test_context_poll_interval_never_zero() {
        let config = ClientConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        let ctx = ClientContext::with_store(config, Arc::new(MemoryStore::new()));
        assert_eq!(ctx.poll_interval(), Duration::from_secs(1));
    }
}
