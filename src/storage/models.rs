//! 访客统计领域模型
//!
//! 同一套类型同时用于：
//! - 数据库读出的记录（`Visitor` / `PageView` / `SessionDuration`）
//! - 采集端上报的事件（`VisitorEvent` / `PageViewEvent` / `SessionEvent`）
//! - 客户端本地回退存储（JSON，字段名 camelCase）

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use ts_rs::TS;

use crate::analytics::TS_EXPORT_PATH;
use migration::entities::{page_view, session_duration, visitor};

/// 设备类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
    TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
}

/// 浏览器家族
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub enum BrowserFamily {
    Firefox,
    Opera,
    #[strum(serialize = "Internet Explorer")]
    #[serde(rename = "Internet Explorer")]
    InternetExplorer,
    Edge,
    Chrome,
    Safari,
    Unknown,
}

/// 访客（每个浏览器身份一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: String,
    /// 最近一次访问（毫秒）
    #[ts(type = "number")]
    pub timestamp: i64,
    pub visits: i32,
    pub browser: Option<String>,
    pub device: Option<String>,
    pub screen_size: Option<String>,
}

/// 页面浏览记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number | null")]
    pub id: Option<i64>,
    pub visitor_id: Option<String>,
    pub page: String,
    #[ts(type = "number")]
    pub timestamp: i64,
}

/// 会话时长记录（秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct SessionDuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number | null")]
    pub id: Option<i64>,
    pub visitor_id: Option<String>,
    pub duration: i32,
    #[ts(type = "number")]
    pub timestamp: i64,
}

/// 访客上报（`POST /api/visitors` 的请求体）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorEvent {
    pub id: String,
    pub timestamp: i64,
    pub browser: String,
    pub device: DeviceClass,
    pub screen_size: String,
}

/// 页面浏览上报（`POST /api/pageviews`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewEvent {
    pub visitor_id: String,
    pub page: String,
    pub timestamp: i64,
}

/// 会话时长上报（`POST /api/sessions`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub visitor_id: String,
    pub duration: i64,
    pub timestamp: i64,
}

/// 采集端产生的任意一类事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TrackingEvent {
    Visitor(VisitorEvent),
    PageView(PageViewEvent),
    Session(SessionEvent),
}

impl TrackingEvent {
    /// 上报路径（相对 API 根）
    pub fn endpoint(&self) -> &'static str {
        match self {
            TrackingEvent::Visitor(_) => "/visitors",
            TrackingEvent::PageView(_) => "/pageviews",
            TrackingEvent::Session(_) => "/sessions",
        }
    }

    pub fn visitor_id(&self) -> &str {
        match self {
            TrackingEvent::Visitor(e) => &e.id,
            TrackingEvent::PageView(e) => &e.visitor_id,
            TrackingEvent::Session(e) => &e.visitor_id,
        }
    }
}

impl From<visitor::Model> for Visitor {
    fn from(model: visitor::Model) -> Self {
        Self {
            id: model.id,
            timestamp: model.timestamp,
            visits: model.visits,
            browser: model.browser,
            device: model.device,
            screen_size: model.screen_size,
        }
    }
}

impl From<page_view::Model> for PageView {
    fn from(model: page_view::Model) -> Self {
        Self {
            id: Some(model.id),
            visitor_id: model.visitor_id,
            page: model.page,
            timestamp: model.timestamp,
        }
    }
}

impl From<session_duration::Model> for SessionDuration {
    fn from(model: session_duration::Model) -> Self {
        Self {
            id: Some(model.id),
            visitor_id: model.visitor_id,
            duration: model.duration,
            timestamp: model.timestamp,
        }
    }
}

impl From<&PageViewEvent> for PageView {
    fn from(event: &PageViewEvent) -> Self {
        Self {
            id: None,
            visitor_id: Some(event.visitor_id.clone()),
            page: event.page.clone(),
            timestamp: event.timestamp,
        }
    }
}

impl From<&SessionEvent> for SessionDuration {
    fn from(event: &SessionEvent) -> Self {
        Self {
            id: None,
            visitor_id: Some(event.visitor_id.clone()),
            duration: i32::try_from(event.duration).unwrap_or(i32::MAX),
            timestamp: event.timestamp,
        }
    }
}
