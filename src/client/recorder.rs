//! 页面访问记录器
//!
//! 一次页面加载：
//! 1. 取得（或生成）访客 ID，采集指纹
//! 2. 在同一个后台任务中依次上报访客、页面浏览（不阻塞调用方）
//! 3. 写入会话开始标记，返回 `PageSession`
//!
//! `PageSession::end()` 计算停留秒数，不足 5 秒直接丢弃；
//! 否则通过 beacon 发出，beacon 不可用时缓冲到下次 `flush_buffered()`。

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::fingerprint::{Fingerprint, Viewport};
use super::identity::{SESSION_START_KEY, get_or_create_visitor_id};
use super::{ClientContext, ClientError, EventSink};
use crate::storage::{PageViewEvent, SessionEvent, TrackingEvent};
use crate::utils::now_millis;

/// 会话最短计入时长（秒）
pub const MIN_SESSION_SECONDS: i64 = 5;

type EventBuffer = Arc<Mutex<Vec<TrackingEvent>>>;

/// 会话结束的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// 太短，未上报
    Discarded { duration: i64 },
    /// 已交给 beacon
    Sent { duration: i64 },
    /// beacon 不可用，已缓冲
    Buffered { duration: i64 },
}

impl SessionOutcome {
    pub fn duration(&self) -> i64 {
        match self {
            SessionOutcome::Discarded { duration }
            | SessionOutcome::Sent { duration }
            | SessionOutcome::Buffered { duration } => *duration,
        }
    }
}

pub struct Recorder {
    ctx: ClientContext,
    fingerprint: Fingerprint,
    buffer: EventBuffer,
}

impl Recorder {
    pub fn new(ctx: ClientContext, user_agent: &str, viewport: Viewport) -> Self {
        Self {
            ctx,
            fingerprint: Fingerprint::collect(user_agent, viewport),
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// 记录一次页面加载
    pub fn on_page_load(&self, path: &str) -> PageSession {
        self.on_page_load_at(path, now_millis())
    }

    pub fn on_page_load_at(&self, path: &str, now: i64) -> PageSession {
        let store = self.ctx.store().clone();
        let visitor_id = get_or_create_visitor_id(store.as_ref());
        let page = if path.is_empty() { "/" } else { path };

        let visitor = TrackingEvent::Visitor(self.fingerprint.to_visitor_event(&visitor_id, now));
        let page_view = TrackingEvent::PageView(PageViewEvent {
            visitor_id: visitor_id.clone(),
            page: page.to_string(),
            timestamp: now,
        });

        let submission = self.submit(vec![visitor, page_view]);

        if let Err(e) = store.set(SESSION_START_KEY, &now.to_string()) {
            warn!("Session start marker not stored: {}", e);
        }
        debug!("Page load recorded: {} ({})", page, visitor_id);

        PageSession {
            visitor_id,
            page: page.to_string(),
            started_at: now,
            sink: self.ctx.sink().clone(),
            buffer: self.buffer.clone(),
            submission,
        }
    }

    /// 按顺序上报；没有运行时的话只写本地
    fn submit(&self, events: Vec<TrackingEvent>) -> Option<JoinHandle<()>> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let sink = self.ctx.sink().clone();
                Some(handle.spawn(async move {
                    for event in &events {
                        if let Err(e) = sink.send(event).await {
                            warn!("Failed to record {}: {}", event.endpoint(), e);
                        }
                    }
                }))
            }
            Err(_) => {
                for event in &events {
                    if let Err(e) = self.ctx.local().record(event) {
                        warn!("Failed to record {} locally: {}", event.endpoint(), e);
                    }
                }
                None
            }
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// 重发缓冲的事件，返回成功条数；失败的留在缓冲区
    pub async fn flush_buffered(&self) -> usize {
        let pending: Vec<TrackingEvent> = std::mem::take(&mut *self.buffer.lock());
        if pending.is_empty() {
            return 0;
        }

        let mut sent = 0;
        let mut failed = Vec::new();
        for event in pending {
            match self.ctx.sink().send(&event).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("Buffered {} still failing: {}", event.endpoint(), e);
                    failed.push(event);
                }
            }
        }

        if !failed.is_empty() {
            self.buffer.lock().extend(failed);
        }
        info!("Flushed {} buffered event(s)", sent);
        sent
    }

    /// 进程退出前：重发缓冲事件，等待在途 beacon
    pub async fn shutdown(&self) {
        self.flush_buffered().await;
        self.ctx.sink().drain().await;
    }
}

/// 一次页面停留
pub struct PageSession {
    visitor_id: String,
    page: String,
    started_at: i64,
    sink: Arc<dyn EventSink>,
    buffer: EventBuffer,
    submission: Option<JoinHandle<()>>,
}

impl PageSession {
    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// 等待页面加载时的上报任务结束
    pub async fn submitted(&mut self) {
        if let Some(handle) = self.submission.take()
            && let Err(e) = handle.await
        {
            warn!("Page load submission task failed: {}", e);
        }
    }

    pub fn end(self) -> SessionOutcome {
        self.end_at(now_millis())
    }

    /// 按整秒计时（向下取整）
    pub fn end_at(self, now: i64) -> SessionOutcome {
        let duration = (now - self.started_at).max(0) / 1000;
        if duration < MIN_SESSION_SECONDS {
            debug!("Session of {}s discarded", duration);
            return SessionOutcome::Discarded { duration };
        }

        let event = TrackingEvent::Session(SessionEvent {
            visitor_id: self.visitor_id.clone(),
            duration,
            timestamp: now,
        });

        match self.sink.beacon(event.clone()) {
            Ok(()) => SessionOutcome::Sent { duration },
            Err(e) => {
                if !matches!(e, ClientError::Unavailable) {
                    warn!("Session beacon failed: {}", e);
                }
                self.buffer.lock().push(event);
                SessionOutcome::Buffered { duration }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::identity::{KeyValueStore, MemoryStore, VISITOR_ID_KEY};
    use crate::config::ClientConfig;
    use async_trait::async_trait;

    const UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    /// 记录所有事件；`beacon_ok` 控制 beacon 是否可用
    #[derive(Default)]
    struct CapturingSink {
        events: Mutex<Vec<TrackingEvent>>,
        beacon_ok: bool,
    }

    #[async_trait]
    impl EventSink for CapturingSink {
        fn name(&self) -> &'static str {
            "capture"
        }

        async fn send(&self, event: &TrackingEvent) -> Result<(), ClientError> {
            self.events.lock().push(event.clone());
            Ok(())
        }

        fn beacon(&self, event: TrackingEvent) -> Result<(), ClientError> {
            if self.beacon_ok {
                self.events.lock().push(event);
                Ok(())
            } else {
                Err(ClientError::Unavailable)
            }
        }
    }

    fn recorder_with(sink: Arc<CapturingSink>) -> (Recorder, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ctx = ClientContext::with_store(ClientConfig::default(), store.clone()).with_sink(sink);
        (Recorder::new(ctx, UA, Viewport::new(1280, 720)), store)
    }

    #[tokio::test]
    async fn test_page_load_sends_visitor_before_page_view() {
        let sink = Arc::new(CapturingSink::default());
        let (recorder, store) = recorder_with(sink.clone());

        let mut session = recorder.on_page_load_at("/projects", 1_000);
        session.submitted().await;

        let events = sink.events.lock().clone();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], TrackingEvent::Visitor(v) if v.browser == "Firefox" && v.screen_size == "1280x720"));
        assert!(matches!(&events[1], TrackingEvent::PageView(p) if p.page == "/projects"));

        assert_eq!(
            store.get(VISITOR_ID_KEY).unwrap().as_deref(),
            Some(session.visitor_id())
        );
        assert_eq!(store.get(SESSION_START_KEY).unwrap().as_deref(), Some("1000"));
    }

    #[tokio::test]
    async fn test_short_session_is_discarded() {
        let sink = Arc::new(CapturingSink {
            beacon_ok: true,
            ..Default::default()
        });
        let (recorder, _) = recorder_with(sink.clone());
        let mut session = recorder.on_page_load_at("/", 0);
        session.submitted().await;

        assert_eq!(session.end_at(4_999), SessionOutcome::Discarded { duration: 4 });
        assert_eq!(sink.events.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_five_second_session_is_sent() {
        let sink = Arc::new(CapturingSink {
            beacon_ok: true,
            ..Default::default()
        });
        let (recorder, _) = recorder_with(sink.clone());
        let start = 20_000;
        let mut session = recorder.on_page_load_at("/", start);
        session.submitted().await;

        assert_eq!(session.end_at(start + 5_000), SessionOutcome::Sent { duration: 5 });
        let events = sink.events.lock().clone();
        assert_eq!(events.len(), 3);
        assert!(matches!(events.last(), Some(TrackingEvent::Session(s)) if s.duration == 5));
    }

    #[tokio::test]
    async fn test_session_duration_is_floored() {
        let sink = Arc::new(CapturingSink {
            beacon_ok: true,
            ..Default::default()
        });
        let (recorder, _) = recorder_with(sink.clone());
        let mut session = recorder.on_page_load_at("/", 10_000);
        session.submitted().await;

        assert_eq!(session.end_at(17_900), SessionOutcome::Sent { duration: 7 });
        let events = sink.events.lock().clone();
        assert!(matches!(events.last(), Some(TrackingEvent::Session(s)) if s.duration == 7));
    }

    #[tokio::test]
    async fn test_unavailable_beacon_is_buffered_then_flushed() {
        let sink = Arc::new(CapturingSink::default());
        let (recorder, _) = recorder_with(sink.clone());
        let mut session = recorder.on_page_load_at("/", 0);
        session.submitted().await;

        assert_eq!(session.end_at(60_000), SessionOutcome::Buffered { duration: 60 });
        assert_eq!(recorder.buffered_len(), 1);

        assert_eq!(recorder.flush_buffered().await, 1);
        assert_eq!(recorder.buffered_len(), 0);
        assert!(matches!(
            sink.events.lock().last(),
            Some(TrackingEvent::Session(s)) if s.duration == 60
        ));
    }

    #[test]
    fn test_page_load_without_runtime_writes_locally() {
        let store = Arc::new(MemoryStore::new());
        let ctx = ClientContext::with_store(ClientConfig::default(), store.clone());
        let recorder = Recorder::new(ctx.clone(), UA, Viewport::new(800, 600));

        let session = recorder.on_page_load_at("", 5);
        assert_eq!(session.page(), "/");

        let records = ctx.local().records().unwrap();
        assert_eq!(records.visitors.len(), 1);
        assert_eq!(records.page_views.len(), 1);
        assert_eq!(records.page_views[0].page, "/");
    }
}
