//! 时间工具
//!
//! 存储和线上格式统一使用毫秒级 Unix epoch。

use chrono::{DateTime, Duration, Utc};

/// 当前时间（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 距今 `days` 天的时间点（毫秒），用于数据保留窗口
pub fn days_ago_millis(days: u64) -> i64 {
    i64::try_from(days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .map(|cutoff| cutoff.timestamp_millis())
        .unwrap_or(i64::MIN)
}

/// 毫秒时间戳转 RFC3339（无法表示时返回原始数字）
pub fn millis_to_rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// 秒数格式化：`45s`、`2m 5s`、`1h 3m`
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
