//! 管理仪表盘
//!
//! `DashboardClient` 并发请求 `/api/admin/*`，结果合并进共享的 `DashboardState`。
//! 全部请求失败时读取本地回退存储，用 `analytics::aggregate` 重新计算；
//! 部分失败则保留对应面板的旧值。

use parking_lot::RwLock;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ClientContext, ClientError};
use crate::analytics::{
    AnalyticsSnapshot, AvgSession, BucketCount, DeviceShare, StatRow, page_display_name, short_id,
};
use crate::api::services::admin::{CleanupResponse, CountResponse};
use crate::services::AdminDataDump;
use crate::storage::Visitor;
use crate::utils::now_millis;
use crate::utils::time::millis_to_rfc3339;

/// 离线回退时最近访客的条数
const LOCAL_RECENT_LIMIT: usize = 50;
const BAR_WIDTH: usize = 30;
const DETAIL_ROWS: usize = 10;

/// 仪表盘面板（纯 UI 状态，切换不触发请求）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Panel {
    #[default]
    Overview,
    Visitors,
    Browsers,
    Pages,
    Sessions,
}

/// 当前数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum DataSource {
    /// 尚未刷新
    #[default]
    Empty,
    /// 来自 Aggregation API（可能部分面板是旧值）
    Remote,
    /// API 不可达，本地重新计算
    Local,
    /// 直接读数据库（CLI `stats`）
    Database,
}

/// 一次刷新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub source: DataSource,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub snapshot: AnalyticsSnapshot,
    /// `/admin/data` 明细（离线时为空）
    pub data: Option<AdminDataDump>,
    pub source: DataSource,
    pub panel: Panel,
    pub last_refresh: Option<i64>,
    pub last_error: Option<String>,
}

/// 成功则覆盖，失败保留旧值
fn merge<T>(slot: &mut T, result: Result<T, ClientError>, errors: &mut Vec<String>) {
    match result {
        Ok(value) => *slot = value,
        Err(e) => errors.push(e.to_string()),
    }
}

fn bar(percentage: u32) -> String {
    let filled = (percentage.min(100) as usize * BAR_WIDTH) / 100;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn bucket_percentage(count: u64, total: u64) -> u32 {
    crate::analytics::aggregate::percentage(count, total)
}

impl DashboardState {
    pub fn from_snapshot(snapshot: AnalyticsSnapshot, source: DataSource) -> Self {
        Self {
            snapshot,
            source,
            last_refresh: Some(now_millis()),
            ..Default::default()
        }
    }

    /// 渲染指定面板为纯文本
    pub fn render(&self, panel: Panel) -> String {
        let mut out = String::new();
        let tabs: Vec<String> = Panel::iter()
            .map(|p| {
                if p == panel {
                    format!("[{}]", p)
                } else {
                    p.to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "{}", tabs.join("  "));
        let _ = writeln!(
            out,
            "source: {}{}",
            self.source,
            self.last_refresh
                .map(|ts| format!(" | updated {}", millis_to_rfc3339(ts)))
                .unwrap_or_default()
        );
        if let Some(err) = &self.last_error {
            let _ = writeln!(out, "warning: {}", err);
        }
        out.push('\n');

        match panel {
            Panel::Overview => self.render_overview(&mut out),
            Panel::Visitors => self.render_visitors(&mut out),
            Panel::Browsers => {
                render_stat_rows(&mut out, "Browser", &self.snapshot.browser_stats, |n| {
                    n.to_string()
                })
            }
            Panel::Pages => self.render_pages(&mut out),
            Panel::Sessions => self.render_sessions(&mut out),
        }
        out
    }

    fn render_overview(&self, out: &mut String) {
        let s = &self.snapshot;
        let _ = writeln!(out, "Total visitors     {}", s.total_visitors);
        let _ = writeln!(out, "Total page views   {}", s.total_page_views);
        let _ = writeln!(out, "Mobile users       {}%", s.mobile.percentage);
        let _ = writeln!(out, "Desktop users      {}%", s.desktop.percentage);
        let _ = writeln!(out, "Avg. session       {}", s.avg_session.formatted);
        out.push('\n');
        render_stat_rows(out, "Device", &s.device_stats, |n| n.to_string());
    }

    fn render_visitors(&self, out: &mut String) {
        let visitors: &[Visitor] = &self.snapshot.recent_visitors;
        if visitors.is_empty() {
            let _ = writeln!(out, "No visitors yet");
            return;
        }
        let _ = writeln!(
            out,
            "{:<12} {:<20} {:>6}  {:<18} {:<8} {}",
            "Visitor", "Last visit", "Visits", "Browser", "Device", "Screen"
        );
        for v in visitors {
            let _ = writeln!(
                out,
                "{:<12} {:<20} {:>6}  {:<18} {:<8} {}",
                short_id(&v.id),
                millis_to_rfc3339(v.timestamp),
                v.visits,
                v.browser.as_deref().unwrap_or("Unknown"),
                v.device.as_deref().unwrap_or("Unknown"),
                v.screen_size.as_deref().unwrap_or("-"),
            );
        }
    }

    fn render_pages(&self, out: &mut String) {
        render_stat_rows(out, "Page", &self.snapshot.page_stats, page_display_name);

        if let Some(data) = &self.data
            && !data.page_views.is_empty()
        {
            let _ = writeln!(out, "\nRecent page views");
            for view in data.page_views.iter().take(DETAIL_ROWS) {
                let _ = writeln!(
                    out,
                    "  {:<20} {:<12} {}",
                    millis_to_rfc3339(view.timestamp),
                    view.visitor_id.as_deref().map(short_id).unwrap_or_default(),
                    view.page
                );
            }
        }
    }

    fn render_sessions(&self, out: &mut String) {
        let buckets: &[BucketCount] = &self.snapshot.session_buckets;
        let total: u64 = buckets.iter().map(|b| b.count).sum();
        let _ = writeln!(out, "Average session: {}", self.snapshot.avg_session.formatted);
        for bucket in buckets {
            let pct = bucket_percentage(bucket.count, total);
            let _ = writeln!(
                out,
                "{:<10} {} {:>5} ({}%)",
                bucket.label,
                bar(pct),
                bucket.count,
                pct
            );
        }
    }
}

fn render_stat_rows(
    out: &mut String,
    heading: &str,
    rows: &[StatRow],
    label: impl Fn(&str) -> String,
) {
    if rows.is_empty() {
        let _ = writeln!(out, "No data");
        return;
    }
    let _ = writeln!(out, "{:<20} {:<w$} {:>6}", heading, "", "Count", w = BAR_WIDTH);
    for row in rows {
        let _ = writeln!(
            out,
            "{:<20} {} {:>6} ({}%)",
            label(&row.name),
            bar(row.percentage),
            row.count,
            row.percentage
        );
    }
}

// ============ DashboardClient ============

/// 仪表盘数据客户端；克隆后共享同一份状态
#[derive(Clone)]
pub struct DashboardClient {
    ctx: ClientContext,
    state: Arc<RwLock<DashboardState>>,
}

impl DashboardClient {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            state: Arc::new(RwLock::new(DashboardState::default())),
        }
    }

    pub fn state(&self) -> DashboardState {
        self.state.read().clone()
    }

    pub fn panel(&self) -> Panel {
        self.state.read().panel
    }

    pub fn select(&self, panel: Panel) {
        self.state.write().panel = panel;
    }

    /// 渲染当前选中的面板
    pub fn render(&self) -> String {
        let state = self.state.read();
        state.render(state.panel)
    }

    /// 并发拉取全部聚合接口
    pub async fn refresh(&self) -> RefreshOutcome {
        let api = self.ctx.api();
        let (
            total_visitors,
            total_page_views,
            mobile,
            desktop,
            recent,
            browsers,
            pages,
            devices,
            buckets,
            avg,
            data,
        ) = tokio::join!(
            api.get_json::<CountResponse>("/admin/total-visitors"),
            api.get_json::<CountResponse>("/admin/total-page-views"),
            api.get_json::<DeviceShare>("/admin/mobile-users"),
            api.get_json::<DeviceShare>("/admin/pc-users"),
            api.get_json::<Vec<Visitor>>("/admin/recent-visitors"),
            api.get_json::<Vec<StatRow>>("/admin/browser-stats"),
            api.get_json::<Vec<StatRow>>("/admin/page-stats"),
            api.get_json::<Vec<StatRow>>("/admin/device-stats"),
            api.get_json::<Vec<BucketCount>>("/admin/session-buckets"),
            api.get_json::<AvgSession>("/admin/avg-session"),
            api.get_json::<AdminDataDump>("/admin/data"),
        );

        const REQUESTS: usize = 11;
        let mut errors = Vec::new();
        let mut state = self.state.write();
        let s = &mut state.snapshot;
        merge(&mut s.total_visitors, total_visitors.map(|c| c.count), &mut errors);
        merge(&mut s.total_page_views, total_page_views.map(|c| c.count), &mut errors);
        merge(&mut s.mobile, mobile, &mut errors);
        merge(&mut s.desktop, desktop, &mut errors);
        merge(&mut s.recent_visitors, recent, &mut errors);
        merge(&mut s.browser_stats, browsers, &mut errors);
        merge(&mut s.page_stats, pages, &mut errors);
        merge(&mut s.device_stats, devices, &mut errors);
        merge(&mut s.session_buckets, buckets, &mut errors);
        merge(&mut s.avg_session, avg, &mut errors);
        match data {
            Ok(dump) => state.data = Some(dump),
            Err(e) => errors.push(e.to_string()),
        }

        let failed = errors.len();
        if failed < REQUESTS {
            state.source = DataSource::Remote;
            state.last_refresh = Some(now_millis());
            state.last_error = errors.first().map(|e| format!("{} panel(s) stale: {}", failed, e));
            if failed > 0 {
                warn!("Dashboard refresh: {} of {} requests failed", failed, REQUESTS);
            } else {
                debug!("Dashboard refreshed from API");
            }
            return RefreshOutcome {
                source: DataSource::Remote,
                succeeded: REQUESTS - failed,
                failed,
            };
        }

        // 全部失败：本地重算
        let api_error = errors.first().cloned().unwrap_or_default();
        match self.ctx.local().records() {
            Ok(records) => {
                warn!("Analytics API unreachable, using local data: {}", api_error);
                state.snapshot = AnalyticsSnapshot::from_records(
                    &records.visitors,
                    &records.page_views,
                    &records.sessions,
                    LOCAL_RECENT_LIMIT,
                );
                state.data = None;
                state.source = DataSource::Local;
                state.last_refresh = Some(now_millis());
                state.last_error = Some(format!("API unreachable: {}", api_error));
            }
            Err(e) => {
                warn!("Analytics API and local store both unavailable: {}", e);
                state.last_error = Some(format!("API unreachable: {}; local: {}", api_error, e));
            }
        }

        RefreshOutcome {
            source: state.source,
            succeeded: 0,
            failed,
        }
    }

    /// 调用 Cleanup 接口后重新拉取；调用方负责事先确认
    pub async fn cleanup(&self) -> Result<CleanupResponse, ClientError> {
        let body = self
            .ctx
            .api()
            .post_json("/admin/cleanup", &serde_json::json!({}))
            .await?;
        let response: CleanupResponse = serde_json::from_value(body)?;
        info!(
            "Cleanup removed {} record(s) older than {} days",
            response.total_deleted, response.retention_days
        );
        self.refresh().await;
        Ok(response)
    }
}

// ============ DashboardPoller ============

/// 定时刷新任务：启动时立即刷新一次，之后按固定间隔
pub struct DashboardPoller {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    refreshed: watch::Receiver<u64>,
}

impl DashboardPoller {
    pub fn start(client: DashboardClient, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let (refreshed_tx, refreshed_rx) = watch::channel(0u64);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        client.refresh().await;
                        refreshed_tx.send_modify(|generation| *generation += 1);
                    }
                }
            }
            debug!("Dashboard poller stopped");
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            refreshed: refreshed_rx,
        }
    }

    /// 每次刷新完成后递增
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.refreshed.clone()
    }

    /// 停止轮询并等待任务退出
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!("Dashboard poller task failed: {}", e);
        }
    }
}

impl Drop for DashboardPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
