//! API 请求 / 响应类型定义

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::analytics::TS_EXPORT_PATH;
use crate::storage::CleanupReport;

use super::error_code::ErrorCode;

/// 错误响应体 `{success: false, code, error}`
#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ErrorBody {
    pub success: bool,
    pub code: ErrorCode,
    pub error: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            error: error.into(),
        }
    }
}

/// 采集端点的成功响应 `{success: true}`
#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SuccessBody {
    pub success: bool,
}

impl SuccessBody {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// 计数响应 `{count}`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CountResponse {
    #[ts(type = "number")]
    pub count: u64,
}

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RecentVisitorsQuery {
    #[ts(type = "number | null")]
    pub limit: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    #[ts(type = "number")]
    pub retention_days: u64,
    pub deleted: CleanupReport,
    #[ts(type = "number")]
    pub total_deleted: u64,
}

impl CleanupResponse {
    pub fn new(retention_days: u64, deleted: CleanupReport) -> Self {
        Self {
            success: true,
            retention_days,
            deleted,
            total_deleted: deleted.total(),
        }
    }
}

/// `GET /health` 响应
#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: HealthStorageCheck,
    #[ts(type = "number")]
    pub uptime_secs: u64,
    #[ts(type = "number")]
    pub response_time_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
