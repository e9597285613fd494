//! Ingestion service
//!
//! Validates tracking events and writes them to storage. Shared by the HTTP
//! ingestion endpoints and the local recorder.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::errors::{FootprintError, Result};
use crate::storage::{PageViewEvent, SeaOrmStorage, SessionEvent, TrackingEvent, VisitorEvent};

/// 采集写入服务
pub struct IngestService {
    storage: Arc<SeaOrmStorage>,
    min_session_seconds: i64,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FootprintError::validation(format!(
            "Missing required field: {}",
            field
        )));
    }
    Ok(())
}

impl IngestService {
    pub fn new(storage: Arc<SeaOrmStorage>, min_session_seconds: i64) -> Self {
        Self {
            storage,
            min_session_seconds,
        }
    }

    /// 使用 `analytics.min_session_seconds` 配置
    pub fn from_config(storage: Arc<SeaOrmStorage>) -> Self {
        let min = crate::config::get_config().analytics.min_session_seconds;
        Self::new(storage, min)
    }

    pub fn min_session_seconds(&self) -> i64 {
        self.min_session_seconds
    }

    #[instrument(skip(self, event), fields(visitor_id = %event.id))]
    pub async fn record_visitor(&self, event: &VisitorEvent) -> Result<()> {
        require("id", &event.id)?;
        require("browser", &event.browser)?;
        require("screenSize", &event.screen_size)?;
        self.storage.upsert_visitor(event).await
    }

    #[instrument(skip(self, event), fields(visitor_id = %event.visitor_id, page = %event.page))]
    pub async fn record_page_view(&self, event: &PageViewEvent) -> Result<()> {
        require("visitorId", &event.visitor_id)?;
        require("page", &event.page)?;
        self.storage.insert_page_view(event).await
    }

    #[instrument(skip(self, event), fields(visitor_id = %event.visitor_id, duration = event.duration))]
    pub async fn record_session(&self, event: &SessionEvent) -> Result<()> {
        require("visitorId", &event.visitor_id)?;
        if event.duration < self.min_session_seconds {
            warn!(
                "Rejected session of {}s (minimum {}s)",
                event.duration, self.min_session_seconds
            );
            return Err(FootprintError::session_too_short(format!(
                "Session duration must be at least {} seconds",
                self.min_session_seconds
            )));
        }
        self.storage.insert_session(event).await
    }

    /// 按事件类型分派
    pub async fn record(&self, event: &TrackingEvent) -> Result<()> {
        match event {
            TrackingEvent::Visitor(e) => self.record_visitor(e).await,
            TrackingEvent::PageView(e) => self.record_page_view(e).await,
            TrackingEvent::Session(e) => self.record_session(e).await,
        }
    }
}
