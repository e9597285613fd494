//! Ingestion API（`/api/visitors`、`/api/pageviews`、`/api/sessions`）
//!
//! 请求体字段全部声明为 `Option`，缺失与空值统一在这里校验并返回 400，
//! 不会写入任何不完整的记录。

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::api::services::admin::{CountResponse, api_result, error_from_footprint, ok_response};
use crate::errors::{FootprintError, Result};
use crate::services::{AnalyticsService, IngestService};
use crate::storage::{DeviceClass, PageViewEvent, SessionEvent, VisitorEvent};

/// 与数据表列宽一致（`VARCHAR(255)` / `VARCHAR(100)`）
const ID_MAX_LEN: usize = 255;
const PAGE_MAX_LEN: usize = 255;
const SHORT_FIELD_MAX_LEN: usize = 100;

fn required_str(field: &str, value: Option<String>, max_len: usize) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => {
            if v.chars().count() > max_len {
                return Err(FootprintError::validation(format!(
                    "Field {} exceeds {} characters",
                    field, max_len
                )));
            }
            Ok(v)
        }
        _ => Err(FootprintError::validation(format!(
            "Missing required field: {}",
            field
        ))),
    }
}

fn required_timestamp(value: Option<i64>) -> Result<i64> {
    match value {
        Some(ts) if ts >= 0 => Ok(ts),
        Some(ts) => Err(FootprintError::validation(format!(
            "Invalid timestamp: {}",
            ts
        ))),
        None => Err(FootprintError::validation(
            "Missing required field: timestamp",
        )),
    }
}

/// `POST /api/visitors`
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VisitorPayload {
    pub id: Option<String>,
    pub timestamp: Option<i64>,
    pub browser: Option<String>,
    pub device: Option<String>,
    pub screen_size: Option<String>,
}

impl TryFrom<VisitorPayload> for VisitorEvent {
    type Error = FootprintError;

    fn try_from(payload: VisitorPayload) -> Result<Self> {
        let id = required_str("id", payload.id, ID_MAX_LEN)?;
        let timestamp = required_timestamp(payload.timestamp)?;
        let browser = required_str("browser", payload.browser, SHORT_FIELD_MAX_LEN)?;
        let device_raw = required_str("device", payload.device, SHORT_FIELD_MAX_LEN)?;
        let device = DeviceClass::from_str(device_raw.trim()).map_err(|_| {
            FootprintError::invalid_device(format!(
                "Invalid device: {} (expected Desktop, Mobile or Tablet)",
                device_raw
            ))
        })?;
        let screen_size = required_str("screenSize", payload.screen_size, SHORT_FIELD_MAX_LEN)?;

        Ok(VisitorEvent {
            id,
            timestamp,
            browser,
            device,
            screen_size,
        })
    }
}

/// `POST /api/pageviews`
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageViewPayload {
    pub visitor_id: Option<String>,
    pub page: Option<String>,
    pub timestamp: Option<i64>,
}

impl TryFrom<PageViewPayload> for PageViewEvent {
    type Error = FootprintError;

    fn try_from(payload: PageViewPayload) -> Result<Self> {
        Ok(PageViewEvent {
            visitor_id: required_str("visitorId", payload.visitor_id, ID_MAX_LEN)?,
            page: required_str("page", payload.page, PAGE_MAX_LEN)?,
            timestamp: required_timestamp(payload.timestamp)?,
        })
    }
}

/// `POST /api/sessions`
///
/// 浏览器端的时长可能带小数，按整秒截断。
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub visitor_id: Option<String>,
    pub duration: Option<f64>,
    pub timestamp: Option<i64>,
}

impl TryFrom<SessionPayload> for SessionEvent {
    type Error = FootprintError;

    fn try_from(payload: SessionPayload) -> Result<Self> {
        let visitor_id = required_str("visitorId", payload.visitor_id, ID_MAX_LEN)?;
        let duration = match payload.duration {
            Some(d) if d.is_finite() && d >= 0.0 && d <= i32::MAX as f64 => d.trunc() as i64,
            Some(d) => {
                return Err(FootprintError::validation(format!(
                    "Invalid duration: {}",
                    d
                )));
            }
            None => {
                return Err(FootprintError::validation(
                    "Missing required field: duration",
                ));
            }
        };
        let timestamp = required_timestamp(payload.timestamp)?;

        Ok(SessionEvent {
            visitor_id,
            duration,
            timestamp,
        })
    }
}

pub async fn post_visitor(
    service: web::Data<Arc<IngestService>>,
    payload: web::Json<VisitorPayload>,
) -> HttpResponse {
    trace!("Ingest: visitor");
    let result = async {
        let event = VisitorEvent::try_from(payload.into_inner())?;
        service.record_visitor(&event).await
    }
    .await;

    match result {
        Ok(()) => ok_response(),
        Err(e) => {
            debug!("Visitor rejected: {}", e);
            error_from_footprint(&e)
        }
    }
}

pub async fn post_page_view(
    service: web::Data<Arc<IngestService>>,
    payload: web::Json<PageViewPayload>,
) -> HttpResponse {
    trace!("Ingest: page view");
    let result = async {
        let event = PageViewEvent::try_from(payload.into_inner())?;
        service.record_page_view(&event).await
    }
    .await;

    match result {
        Ok(()) => ok_response(),
        Err(e) => {
            debug!("Page view rejected: {}", e);
            error_from_footprint(&e)
        }
    }
}

pub async fn post_session(
    service: web::Data<Arc<IngestService>>,
    payload: web::Json<SessionPayload>,
) -> HttpResponse {
    trace!("Ingest: session");
    let result = async {
        let event = SessionEvent::try_from(payload.into_inner())?;
        service.record_session(&event).await
    }
    .await;

    match result {
        Ok(()) => ok_response(),
        Err(e) => {
            debug!("Session rejected: {}", e);
            error_from_footprint(&e)
        }
    }
}

/// 落地页公开访客计数 `GET /api/visitors/count`
pub async fn visitor_count(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(
        service
            .total_visitors()
            .await
            .map(|count| CountResponse { count }),
    )
}

/// 采集路由（挂在 `/api` 下）
pub fn ingest_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/visitors", web::post().to(post_visitor))
        .route("/visitors/count", web::get().to(visitor_count))
        .route("/pageviews", web::post().to(post_page_view))
        .route("/sessions", web::post().to(post_session));
}
