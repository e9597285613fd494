pub mod admin;
pub mod health;
pub mod ingest;
pub mod static_files;

use actix_web::web;

use crate::api::middleware::AdminAuth;

pub use health::{AppStartTime, HealthService, health_routes};
pub use ingest::ingest_routes;
pub use static_files::{StaticSite, static_routes};

/// `/api` 下的全部路由：采集端点 + `/admin` 统计端点
pub fn api_routes(auth: AdminAuth) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.configure(ingest_routes)
            .configure(admin::admin_scope(auth));
    }
}
