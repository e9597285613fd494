//! Aggregation API 处理器（`/api/admin/*`）
//!
//! 每次请求都直接查询存储重新计算，不做缓存。

use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{info, trace};

use crate::services::AnalyticsService;
use crate::storage::DeviceClass;

use super::helpers::{api_result, error_from_footprint, success_response};
use super::types::{CleanupResponse, CountResponse, RecentVisitorsQuery};

pub async fn total_visitors(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    trace!("Admin API: total visitors");
    api_result(
        service
            .total_visitors()
            .await
            .map(|count| CountResponse { count }),
    )
}

pub async fn total_page_views(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    trace!("Admin API: total page views");
    api_result(
        service
            .total_page_views()
            .await
            .map(|count| CountResponse { count }),
    )
}

pub async fn mobile_users(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.device_share(DeviceClass::Mobile).await)
}

pub async fn pc_users(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.device_share(DeviceClass::Desktop).await)
}

/// `?limit=N`，缺省使用配置值
pub async fn recent_visitors(
    service: web::Data<Arc<AnalyticsService>>,
    query: web::Query<RecentVisitorsQuery>,
) -> impl Responder {
    api_result(service.recent_visitors(query.limit).await)
}

pub async fn browser_stats(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.browser_stats().await)
}

pub async fn page_stats(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.page_stats().await)
}

pub async fn device_stats(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.device_stats().await)
}

pub async fn session_buckets(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.session_buckets().await)
}

pub async fn avg_session(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.avg_session().await)
}

/// 原始数据导出（仪表盘明细面板）
pub async fn admin_data(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.admin_data().await)
}

/// 一次性返回全部聚合结果
pub async fn snapshot(service: web::Data<Arc<AnalyticsService>>) -> impl Responder {
    api_result(service.snapshot().await)
}

/// 删除保留窗口之外的记录，仅在显式调用时执行
pub async fn cleanup(service: web::Data<Arc<AnalyticsService>>) -> HttpResponse {
    match service.cleanup().await {
        Ok(report) => {
            info!(
                "Admin API: cleanup removed {} visitors, {} page views, {} sessions",
                report.visitors, report.page_views, report.session_durations
            );
            success_response(CleanupResponse::new(service.retention_days(), report))
        }
        Err(e) => error_from_footprint(&e),
    }
}
