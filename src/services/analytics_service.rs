//! Analytics service layer
//!
//! Aggregation queries behind `/api/admin/*`, the public visitor counter and
//! the CLI `stats` command. Every call recomputes from storage; nothing is
//! cached.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::analytics::aggregate::{
    self, AnalyticsSnapshot, AvgSession, BucketCount, DeviceShare, StatRow,
};
use crate::analytics::{DataRetentionTask, TS_EXPORT_PATH};
use crate::errors::Result;
use crate::storage::{
    CleanupReport, DeviceClass, GroupCount, PageView, SeaOrmStorage, Visitor,
};

/// `/api/admin/data` 的完整数据导出
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct AdminDataDump {
    pub visitors: Vec<Visitor>,
    pub page_views: Vec<PageView>,
    /// 只保留时长（秒），按记录时间降序
    pub session_durations: Vec<i32>,
}

/// Analytics 服务
pub struct AnalyticsService {
    storage: Arc<SeaOrmStorage>,
    recent_limit: u64,
    retention_days: u64,
}

fn pairs(rows: Vec<GroupCount>) -> impl Iterator<Item = (Option<String>, u64)> {
    rows.into_iter().map(GroupCount::into_pair)
}

impl AnalyticsService {
    pub fn new(storage: Arc<SeaOrmStorage>, recent_limit: u64, retention_days: u64) -> Self {
        Self {
            storage,
            recent_limit,
            retention_days,
        }
    }

    /// 使用 `[analytics]` 配置
    pub fn from_config(storage: Arc<SeaOrmStorage>) -> Self {
        let config = crate::config::get_config();
        Self::new(
            storage,
            config.analytics.recent_visitors_limit,
            config.analytics.retention_days,
        )
    }

    pub fn retention_days(&self) -> u64 {
        self.retention_days
    }

    pub fn storage(&self) -> &Arc<SeaOrmStorage> {
        &self.storage
    }

    pub async fn total_visitors(&self) -> Result<u64> {
        self.storage.count_visitors().await
    }

    pub async fn total_page_views(&self) -> Result<u64> {
        self.storage.count_page_views().await
    }

    /// 指定设备类型的访客占比
    pub async fn device_share(&self, device: DeviceClass) -> Result<DeviceShare> {
        let total = self.storage.count_visitors().await?;
        let count = if total == 0 {
            0
        } else {
            self.storage.count_visitors_by_device(device).await?
        };
        Ok(aggregate::device_share(count, total))
    }

    pub async fn recent_visitors(&self, limit: Option<u64>) -> Result<Vec<Visitor>> {
        let limit = limit.unwrap_or(self.recent_limit).clamp(1, 1000);
        self.storage.recent_visitors(limit).await
    }

    pub async fn browser_stats(&self) -> Result<Vec<StatRow>> {
        let rows = self.storage.browser_counts().await?;
        Ok(aggregate::rank_counts(pairs(rows)))
    }

    pub async fn page_stats(&self) -> Result<Vec<StatRow>> {
        let rows = self.storage.page_counts().await?;
        Ok(aggregate::rank_counts(pairs(rows)))
    }

    pub async fn device_stats(&self) -> Result<Vec<StatRow>> {
        let rows = self.storage.device_counts().await?;
        Ok(aggregate::device_distribution(pairs(rows)))
    }

    pub async fn session_buckets(&self) -> Result<Vec<BucketCount>> {
        let counts = self.storage.session_bucket_counts().await?;
        Ok(aggregate::buckets_from_counts(counts))
    }

    pub async fn avg_session(&self) -> Result<AvgSession> {
        let (total, count) = self.storage.session_totals().await?;
        Ok(aggregate::average_session(total, count))
    }

    pub async fn admin_data(&self) -> Result<AdminDataDump> {
        let visitors = self.storage.all_visitors().await?;
        let page_views = self.storage.all_page_views().await?;
        let session_durations = self
            .storage
            .all_sessions()
            .await?
            .into_iter()
            .map(|s| s.duration)
            .collect();

        Ok(AdminDataDump {
            visitors,
            page_views,
            session_durations,
        })
    }

    /// 全部聚合结果（CLI `stats`）
    pub async fn snapshot(&self) -> Result<AnalyticsSnapshot> {
        Ok(AnalyticsSnapshot {
            total_visitors: self.total_visitors().await?,
            total_page_views: self.total_page_views().await?,
            mobile: self.device_share(DeviceClass::Mobile).await?,
            desktop: self.device_share(DeviceClass::Desktop).await?,
            recent_visitors: self.recent_visitors(None).await?,
            browser_stats: self.browser_stats().await?,
            page_stats: self.page_stats().await?,
            device_stats: self.device_stats().await?,
            session_buckets: self.session_buckets().await?,
            avg_session: self.avg_session().await?,
        })
    }

    /// 删除保留窗口之外的数据
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        info!("Cleanup requested (retention {} days)", self.retention_days);
        DataRetentionTask::new(self.storage.clone(), self.retention_days)
            .run_cleanup()
            .await
    }
}
