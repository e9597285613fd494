//! 数据清理任务
//!
//! 删除保留窗口之外的访客、页面浏览和会话记录。只在显式调用时运行
//! （管理端点或 `footprint cleanup`），不在后台定时执行。

use std::sync::Arc;

use tracing::{info, instrument};

use crate::errors::Result;
use crate::storage::SeaOrmStorage;
use crate::storage::backend::CleanupReport;
use crate::utils::time::days_ago_millis;

/// 数据清理任务
pub struct DataRetentionTask {
    storage: Arc<SeaOrmStorage>,
    retention_days: u64,
}

impl DataRetentionTask {
    pub fn new(storage: Arc<SeaOrmStorage>, retention_days: u64) -> Self {
        Self {
            storage,
            retention_days,
        }
    }

    pub fn retention_days(&self) -> u64 {
        self.retention_days
    }

    /// 运行一次清理
    #[instrument(skip(self), fields(retention_days = self.retention_days))]
    pub async fn run_cleanup(&self) -> Result<CleanupReport> {
        let cutoff = days_ago_millis(self.retention_days);
        let report = self.storage.purge_before(cutoff).await?;

        info!(
            "Data cleanup completed: visitors {}, page views {}, sessions {}",
            report.visitors, report.page_views, report.session_durations
        );
        Ok(report)
    }
}
