//! 事件上报通道
//!
//! - `RemoteSink`: POST 到 Ingestion API；`beacon` 在后台任务里发送，不等待响应
//! - `LocalSink`: 写入本地键值存储（`portfolio_*`），格式与浏览器版一致
//! - `FallbackSink`: 组合两者

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ClientError;
use super::http::ApiClient;
use super::identity::{KeyValueStore, PAGE_VIEWS_KEY, SESSION_DURATIONS_KEY, VISITORS_KEY};
use crate::storage::{PageView, SessionDuration, TrackingEvent, Visitor, VisitorEvent};

/// 事件上报通道
#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// 发送并等待结果
    async fn send(&self, event: &TrackingEvent) -> Result<(), ClientError>;

    /// 发后即忘；不支持时返回 `ClientError::Unavailable`，调用方负责缓冲
    fn beacon(&self, _event: TrackingEvent) -> Result<(), ClientError> {
        Err(ClientError::Unavailable)
    }

    /// 等待已发出的 beacon 完成（进程退出前调用）
    async fn drain(&self) {}
}

/// 请求体只包含事件本身的字段（不带 `kind` 标签）
fn event_body(event: &TrackingEvent) -> Result<serde_json::Value, ClientError> {
    let value = match event {
        TrackingEvent::Visitor(e) => serde_json::to_value(e)?,
        TrackingEvent::PageView(e) => serde_json::to_value(e)?,
        TrackingEvent::Session(e) => serde_json::to_value(e)?,
    };
    Ok(value)
}

// ============ RemoteSink ============

pub struct RemoteSink {
    api: ApiClient,
    inflight: Mutex<Vec<JoinHandle<()>>>,
}

impl RemoteSink {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            inflight: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EventSink for RemoteSink {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn send(&self, event: &TrackingEvent) -> Result<(), ClientError> {
        let body = event_body(event)?;
        self.api.post_json(event.endpoint(), &body).await?;
        debug!("Sent {} for {}", event.endpoint(), event.visitor_id());
        Ok(())
    }

    fn beacon(&self, event: TrackingEvent) -> Result<(), ClientError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| ClientError::Unavailable)?;
        let api = self.api.clone();
        let task = handle.spawn(async move {
            let result = match event_body(&event) {
                Ok(body) => api.post_json(event.endpoint(), &body).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("Beacon {} dropped: {}", event.endpoint(), e);
            }
        });

        let mut inflight = self.inflight.lock();
        inflight.retain(|t| !t.is_finished());
        inflight.push(task);
        Ok(())
    }

    async fn drain(&self) {
        let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inflight.lock());
        for task in pending {
            if let Err(e) = task.await {
                warn!("Beacon task failed: {}", e);
            }
        }
    }
}

// ============ LocalSink ============

/// 本地会话时长：浏览器版只存秒数，新版存完整记录，两种都接受
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSession {
    Record(SessionDuration),
    Seconds(f64),
}

impl From<StoredSession> for SessionDuration {
    fn from(stored: StoredSession) -> Self {
        match stored {
            StoredSession::Record(record) => record,
            StoredSession::Seconds(secs) => SessionDuration {
                id: None,
                visitor_id: None,
                duration: secs.max(0.0).min(i32::MAX as f64) as i32,
                timestamp: 0,
            },
        }
    }
}

/// 本地回退存储中的全部原始记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalRecords {
    pub visitors: Vec<Visitor>,
    pub page_views: Vec<PageView>,
    pub sessions: Vec<SessionDuration>,
}

impl LocalRecords {
    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty() && self.page_views.is_empty() && self.sessions.is_empty()
    }
}

pub struct LocalSink {
    store: Arc<dyn KeyValueStore>,
    // 串行化整个读-改-写
    write_lock: Mutex<()>,
}

impl LocalSink {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn load_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ClientError> {
        match self.store.get(key)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    fn save_list<T: serde::Serialize>(&self, key: &str, items: &[T]) -> Result<(), ClientError> {
        let raw = serde_json::to_string(items)?;
        self.store.set(key, &raw)
    }

    /// 按 id 合并：已存在则 `visits + 1` 并覆盖其余字段
    fn merge_visitor(&self, event: &VisitorEvent) -> Result<(), ClientError> {
        let mut visitors: Vec<Visitor> = self.load_list(VISITORS_KEY)?;
        match visitors.iter_mut().find(|v| v.id == event.id) {
            Some(existing) => {
                existing.timestamp = event.timestamp;
                existing.visits = existing.visits.saturating_add(1);
                existing.browser = Some(event.browser.clone());
                existing.device = Some(event.device.to_string());
                existing.screen_size = Some(event.screen_size.clone());
            }
            None => visitors.push(Visitor {
                id: event.id.clone(),
                timestamp: event.timestamp,
                visits: 1,
                browser: Some(event.browser.clone()),
                device: Some(event.device.to_string()),
                screen_size: Some(event.screen_size.clone()),
            }),
        }
        self.save_list(VISITORS_KEY, &visitors)
    }

    /// 同步写入（无需运行时）
    pub fn record(&self, event: &TrackingEvent) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock();
        match event {
            TrackingEvent::Visitor(e) => self.merge_visitor(e),
            TrackingEvent::PageView(e) => {
                let mut views: Vec<PageView> = self.load_list(PAGE_VIEWS_KEY)?;
                views.push(PageView::from(e));
                self.save_list(PAGE_VIEWS_KEY, &views)
            }
            TrackingEvent::Session(e) => {
                let mut sessions = self.load_sessions()?;
                sessions.push(SessionDuration::from(e));
                self.save_list(SESSION_DURATIONS_KEY, &sessions)
            }
        }
    }

    fn load_sessions(&self) -> Result<Vec<SessionDuration>, ClientError> {
        let stored: Vec<StoredSession> = self.load_list(SESSION_DURATIONS_KEY)?;
        Ok(stored.into_iter().map(SessionDuration::from).collect())
    }

    /// 读出全部本地记录（仪表盘离线回退）
    pub fn records(&self) -> Result<LocalRecords, ClientError> {
        let _guard = self.write_lock.lock();
        Ok(LocalRecords {
            visitors: self.load_list(VISITORS_KEY)?,
            page_views: self.load_list(PAGE_VIEWS_KEY)?,
            sessions: self.load_sessions()?,
        })
    }
}

#[async_trait]
impl EventSink for LocalSink {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn send(&self, event: &TrackingEvent) -> Result<(), ClientError> {
        self.record(event)
    }
}

// ============ FallbackSink ============

/// 远程优先，失败时写本地
///
/// `mirrored()` 模式下每个事件都先写本地，再尝试远程；远程失败只记日志。
pub struct FallbackSink {
    remote: Arc<dyn EventSink>,
    local: Arc<LocalSink>,
    mirror: bool,
}

impl FallbackSink {
    pub fn new(remote: Arc<dyn EventSink>, local: Arc<LocalSink>) -> Self {
        Self {
            remote,
            local,
            mirror: false,
        }
    }

    pub fn mirrored(remote: Arc<dyn EventSink>, local: Arc<LocalSink>) -> Self {
        Self {
            remote,
            local,
            mirror: true,
        }
    }
}

#[async_trait]
impl EventSink for FallbackSink {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn send(&self, event: &TrackingEvent) -> Result<(), ClientError> {
        let local_result = if self.mirror {
            Some(self.local.record(event))
        } else {
            None
        };

        match self.remote.send(event).await {
            Ok(()) => Ok(()),
            Err(remote_err) => {
                warn!(
                    "{} via {} failed, keeping local copy: {}",
                    event.endpoint(),
                    self.remote.name(),
                    remote_err
                );
                match local_result {
                    Some(result) => result,
                    None => self.local.record(event),
                }
            }
        }
    }

    fn beacon(&self, event: TrackingEvent) -> Result<(), ClientError> {
        let mirror_copy = self.mirror.then(|| event.clone());
        self.remote.beacon(event)?;
        if let Some(copy) = mirror_copy
            && let Err(e) = self.local.record(&copy)
        {
            warn!("Local mirror of beacon failed: {}", e);
        }
        Ok(())
    }

    async fn drain(&self) {
        self.remote.drain().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::identity::MemoryStore;
    use crate::storage::{DeviceClass, PageViewEvent, SessionEvent};

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn send(&self, _event: &TrackingEvent) -> Result<(), ClientError> {
            Err(ClientError::Network("connection refused".into()))
        }
    }

    fn visitor_event(id: &str, ts: i64) -> TrackingEvent {
        TrackingEvent::Visitor(VisitorEvent {
            id: id.into(),
            timestamp: ts,
            browser: "Chrome".into(),
            device: DeviceClass::Desktop,
            screen_size: "1920x1080".into(),
        })
    }

    #[tokio::test]
    async fn test_local_sink_merges_visitors() {
        let local = LocalSink::new(Arc::new(MemoryStore::new()));
        local.send(&visitor_event("v1", 1)).await.unwrap();
        local.send(&visitor_event("v1", 2)).await.unwrap();
        local.send(&visitor_event("v2", 3)).await.unwrap();

        let records = local.records().unwrap();
        assert_eq!(records.visitors.len(), 2);
        let v1 = records.visitors.iter().find(|v| v.id == "v1").unwrap();
        assert_eq!(v1.visits, 2);
        assert_eq!(v1.timestamp, 2);
    }

    #[tokio::test]
    async fn test_fallback_writes_local_on_remote_error() {
        let local = Arc::new(LocalSink::new(Arc::new(MemoryStore::new())));
        let sink = FallbackSink::new(Arc::new(FailingSink), local.clone());

        sink.send(&TrackingEvent::PageView(PageViewEvent {
            visitor_id: "v1".into(),
            page: "/".into(),
            timestamp: 10,
        }))
        .await
        .unwrap();

        let records = local.records().unwrap();
        assert_eq!(records.page_views.len(), 1);
        assert_eq!(records.page_views[0].visitor_id.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_mirrored_fallback_does_not_double_write() {
        let local = Arc::new(LocalSink::new(Arc::new(MemoryStore::new())));
        let sink = FallbackSink::mirrored(Arc::new(FailingSink), local.clone());

        sink.send(&visitor_event("v1", 1)).await.unwrap();

        let records = local.records().unwrap();
        assert_eq!(records.visitors.len(), 1);
        assert_eq!(records.visitors[0].visits, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_all_kept() {
        let local = Arc::new(LocalSink::new(Arc::new(MemoryStore::new())));

        let tasks: Vec<_> = (0..200)
            .map(|i| {
                let local = local.clone();
                tokio::spawn(async move {
                    local
                        .record(&TrackingEvent::PageView(PageViewEvent {
                            visitor_id: format!("v{}", i % 7),
                            page: format!("/p/{}", i),
                            timestamp: i,
                        }))
                        .unwrap();
                    local.record(&visitor_event(&format!("v{}", i % 7), i)).unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let records = local.records().unwrap();
        assert_eq!(records.page_views.len(), 200);
        assert_eq!(records.visitors.len(), 7);
        let visits: i32 = records.visitors.iter().map(|v| v.visits).sum();
        assert_eq!(visits, 200);
    }

    #[test]
    fn test_legacy_session_numbers_are_accepted() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_DURATIONS_KEY, "[12.5, 300]").unwrap();
        let local = LocalSink::new(store);
        local
            .record(&TrackingEvent::Session(SessionEvent {
                visitor_id: "v1".into(),
                duration: 42,
                timestamp: 7,
            }))
            .unwrap();

        let durations: Vec<i32> = local
            .records()
            .unwrap()
            .sessions
            .iter()
            .map(|s| s.duration)
            .collect();
        assert_eq!(durations, vec![12, 300, 42]);
    }

    #[test]
    fn test_default_beacon_is_unavailable() {
        let local = LocalSink::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            local.beacon(visitor_event("v1", 1)),
            Err(ClientError::Unavailable)
        ));
    }

    #[test]
    fn test_remote_beacon_without_runtime_is_unavailable() {
        let api = ApiClient::new("http://127.0.0.1:9/api", std::time::Duration::from_secs(1), None);
        let remote = RemoteSink::new(api);
        assert!(matches!(
            remote.beacon(visitor_event("v1", 1)),
            Err(ClientError::Unavailable)
        ));
    }
}
