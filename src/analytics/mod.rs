//! 访客统计口径
//!
//! - `buckets`: 会话时长分桶定义
//! - `aggregate`: 服务端与仪表盘共用的聚合函数
//! - `retention`: 过期数据清理

pub mod aggregate;
pub mod buckets;
pub mod retention;

pub use aggregate::{
    AnalyticsSnapshot, AvgSession, BucketCount, DeviceShare, StatRow, page_display_name, short_id,
};
pub use buckets::{SESSION_BUCKETS, SessionBucket};
pub use retention::DataRetentionTask;

/// ts-rs 类型导出文件（相对 `TS_RS_EXPORT_DIR`）
pub const TS_EXPORT_PATH: &str = "footprint.generated.ts";
