//! 统计口径
//!
//! 服务端聚合接口和仪表盘本地回退共用这里的函数：数据库只负责
//! `GROUP BY` 计数，空值归并、排序、百分比都在这里完成，两条路径
//! 得到的结果逐项一致。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use ts_rs::TS;

use super::TS_EXPORT_PATH;
use super::buckets::{SESSION_BUCKETS, bucket_index};
use crate::storage::models::{DeviceClass, PageView, SessionDuration, Visitor};
use crate::utils::format_duration;

/// 空值 / 空字符串统一归入该分组
pub const UNKNOWN_LABEL: &str = "Unknown";

/// 分组统计的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct StatRow {
    pub name: String,
    #[ts(type = "number")]
    pub count: u64,
    /// 占比（四舍五入到整数）
    pub percentage: u32,
}

/// 会话时长分桶计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct BucketCount {
    pub label: String,
    #[ts(type = "number")]
    pub count: u64,
}

/// 某类设备的访客占比
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct DeviceShare {
    pub percentage: u32,
    #[ts(type = "number")]
    pub count: u64,
    #[ts(type = "number")]
    pub total: u64,
}

/// 平均会话时长
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct AvgSession {
    #[ts(type = "number")]
    pub seconds: i64,
    pub formatted: String,
}

impl Default for AvgSession {
    fn default() -> Self {
        average_session(0, 0)
    }
}

/// `round(100 * part / total)`，`total == 0` 时为 0
pub fn percentage(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 * 100.0 / total as f64).round() as u32
}

pub fn device_share(count: u64, total: u64) -> DeviceShare {
    DeviceShare {
        percentage: percentage(count, total),
        count,
        total,
    }
}

fn normalize_key(key: Option<String>) -> String {
    match key {
        Some(k) if !k.trim().is_empty() => k,
        _ => UNKNOWN_LABEL.to_string(),
    }
}

fn rank_with_seeds<I>(seeds: &[&str], rows: I) -> Vec<StatRow>
where
    I: IntoIterator<Item = (Option<String>, u64)>,
{
    let mut merged: BTreeMap<String, u64> = seeds.iter().map(|s| (s.to_string(), 0)).collect();
    for (key, count) in rows {
        *merged.entry(normalize_key(key)).or_insert(0) += count;
    }

    let total: u64 = merged.values().sum();
    let mut ranked: Vec<StatRow> = merged
        .into_iter()
        .map(|(name, count)| StatRow {
            name,
            count,
            percentage: percentage(count, total),
        })
        .collect();

    // BTreeMap 已按 key 升序，稳定排序后同计数保持字典序
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// 分组计数排序：计数降序，同计数按名称升序
pub fn rank_counts<I>(rows: I) -> Vec<StatRow>
where
    I: IntoIterator<Item = (Option<String>, u64)>,
{
    rank_with_seeds(&[], rows)
}

/// 设备分布：Desktop / Mobile / Tablet 始终出现（计数可为 0）
pub fn device_distribution<I>(rows: I) -> Vec<StatRow>
where
    I: IntoIterator<Item = (Option<String>, u64)>,
{
    let seeds: Vec<&'static str> = DeviceClass::iter().map(<&'static str>::from).collect();
    rank_with_seeds(&seeds, rows)
}

/// 按分桶顺序输出，空桶计数为 0
pub fn buckets_from_counts(counts: [u64; SESSION_BUCKETS.len()]) -> Vec<BucketCount> {
    SESSION_BUCKETS
        .iter()
        .zip(counts)
        .map(|(bucket, count)| BucketCount {
            label: bucket.label.to_string(),
            count,
        })
        .collect()
}

pub fn bucketize<I>(durations: I) -> Vec<BucketCount>
where
    I: IntoIterator<Item = i64>,
{
    let mut counts = [0u64; SESSION_BUCKETS.len()];
    for duration in durations {
        counts[bucket_index(duration)] += 1;
    }
    buckets_from_counts(counts)
}

/// `round(total / count)`，无记录时为 0
pub fn average_session(total_seconds: i64, count: u64) -> AvgSession {
    let seconds = if count == 0 {
        0
    } else {
        (total_seconds as f64 / count as f64).round() as i64
    };
    AvgSession {
        seconds,
        formatted: format_duration(seconds),
    }
}

/// 页面显示名：`/` 为 `Home`，其余取最后一段、去扩展名、首字母大写
pub fn page_display_name(path: &str) -> String {
    let segment = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let stem = segment
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(segment);

    if stem.is_empty() || stem.eq_ignore_ascii_case("index") {
        return "Home".to_string();
    }

    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Home".to_string(),
    }
}

/// 表格中显示的短访客 ID：前 8 个字符加 `...`
pub fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("{}...", prefix)
}

/// 最近访客：按时间降序取前 `limit` 个，同一时间按 id 升序（与数据库查询一致）
pub fn recent_visitors(visitors: &[Visitor], limit: usize) -> Vec<Visitor> {
    let mut sorted = visitors.to_vec();
    sorted.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted.truncate(limit);
    sorted
}

/// 仪表盘所需的全部聚合结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    #[ts(type = "number")]
    pub total_visitors: u64,
    #[ts(type = "number")]
    pub total_page_views: u64,
    pub mobile: DeviceShare,
    pub desktop: DeviceShare,
    pub recent_visitors: Vec<Visitor>,
    pub browser_stats: Vec<StatRow>,
    pub page_stats: Vec<StatRow>,
    pub device_stats: Vec<StatRow>,
    pub session_buckets: Vec<BucketCount>,
    pub avg_session: AvgSession,
}

impl AnalyticsSnapshot {
    /// 从原始记录计算（仪表盘离线回退）
    pub fn from_records(
        visitors: &[Visitor],
        page_views: &[PageView],
        sessions: &[SessionDuration],
        recent_limit: usize,
    ) -> Self {
        let total_visitors = visitors.len() as u64;
        let count_device = |class: DeviceClass| {
            visitors
                .iter()
                .filter(|v| v.device.as_deref() == Some(class.as_ref()))
                .count() as u64
        };

        let total_duration: i64 = sessions.iter().map(|s| i64::from(s.duration)).sum();

        Self {
            total_visitors,
            total_page_views: page_views.len() as u64,
            mobile: device_share(count_device(DeviceClass::Mobile), total_visitors),
            desktop: device_share(count_device(DeviceClass::Desktop), total_visitors),
            recent_visitors: recent_visitors(visitors, recent_limit),
            browser_stats: rank_counts(visitors.iter().map(|v| (v.browser.clone(), 1))),
            page_stats: rank_counts(page_views.iter().map(|p| (Some(p.page.clone()), 1))),
            device_stats: device_distribution(visitors.iter().map(|v| (v.device.clone(), 1))),
            session_buckets: bucketize(sessions.iter().map(|s| i64::from(s.duration))),
            avg_session: average_session(total_duration, sessions.len() as u64),
        }
    }
}
