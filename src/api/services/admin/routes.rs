//! Admin API 路由配置

use actix_web::web;

use crate::api::middleware::AdminAuth;

use super::analytics::{
    admin_data, avg_session, browser_stats, cleanup, device_stats, mobile_users, page_stats,
    pc_users, recent_visitors, session_buckets, snapshot, total_page_views, total_visitors,
};

/// 统计路由（不含鉴权，由 `admin_scope` 包装）
///
/// 包含：
/// - GET /total-visitors, /total-page-views
/// - GET /mobile-users, /pc-users
/// - GET /recent-visitors?limit=N
/// - GET /browser-stats, /page-stats, /device-stats
/// - GET /session-buckets, /avg-session
/// - GET /data, /snapshot
/// - POST /cleanup
pub fn analytics_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/total-visitors", web::get().to(total_visitors))
        .route("/total-page-views", web::get().to(total_page_views))
        .route("/mobile-users", web::get().to(mobile_users))
        .route("/pc-users", web::get().to(pc_users))
        .route("/recent-visitors", web::get().to(recent_visitors))
        .route("/browser-stats", web::get().to(browser_stats))
        .route("/page-stats", web::get().to(page_stats))
        .route("/device-stats", web::get().to(device_stats))
        .route("/session-buckets", web::get().to(session_buckets))
        .route("/avg-session", web::get().to(avg_session))
        .route("/data", web::get().to(admin_data))
        .route("/snapshot", web::get().to(snapshot))
        .route("/cleanup", web::post().to(cleanup));
}

/// `/admin` 作用域，带 Bearer token 鉴权
pub fn admin_scope(auth: AdminAuth) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(web::scope("/admin").wrap(auth).configure(analytics_routes));
    }
}
