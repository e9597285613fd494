//! Server mode
//!
//! Wires storage and services into the actix-web app and runs it until
//! Ctrl+C.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::middleware::{
    AdminAuth, ApiRateLimitConfig, RequestIdMiddleware, TimingMiddleware, api_rate_limiter,
    build_rate_limit_config,
};
use crate::api::services::admin::json_config;
use crate::api::services::{
    AppStartTime, StaticSite, api_routes, health_routes, static_routes,
};
use crate::config::CorsConfig;
use crate::runtime::lifetime;
use crate::services::{AnalyticsService, IngestService};
use crate::storage::SeaOrmStorage;

/// 每个 worker 共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SeaOrmStorage>,
    pub ingest_service: Arc<IngestService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub start_time: AppStartTime,
    pub static_site: Option<StaticSite>,
}

impl AppState {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        ingest_service: Arc<IngestService>,
        analytics_service: Arc<AnalyticsService>,
    ) -> Self {
        Self {
            storage,
            ingest_service,
            analytics_service,
            start_time: AppStartTime::now(),
            static_site: None,
        }
    }

    pub fn with_static_site(mut self, site: Option<StaticSite>) -> Self {
        self.static_site = site;
        self
    }

    /// 注册 app_data 与全部路由
    ///
    /// `/api` 可选限流；`/health` 不限流；静态站点最后注册，兜底匹配。
    pub fn configure(
        self,
        auth: AdminAuth,
        rate_limit: Option<ApiRateLimitConfig>,
    ) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            cfg.app_data(web::Data::new(self.storage.clone()))
                .app_data(web::Data::new(self.ingest_service.clone()))
                .app_data(web::Data::new(self.analytics_service.clone()))
                .app_data(web::Data::new(self.start_time.clone()))
                .app_data(json_config());

            match rate_limit {
                Some(limit) => {
                    cfg.service(
                        web::scope("/api")
                            .wrap(api_rate_limiter(&limit))
                            .configure(api_routes(auth)),
                    );
                }
                None => {
                    cfg.service(web::scope("/api").configure(api_routes(auth)));
                }
            }

            cfg.service(health_routes());

            if let Some(site) = self.static_site {
                cfg.app_data(web::Data::new(site)).configure(static_routes);
            }
        }
    }
}

/// Build CORS middleware from configuration
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 关闭时使用浏览器默认的同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default();
    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors.allowed_methods(vec!["GET", "HEAD", "POST", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::ACCEPT,
        ])
        .max_age(cors_config.max_age as usize)
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup()
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let config = crate::config::get_config();

    let static_site = config
        .server
        .static_dir
        .as_deref()
        .filter(|dir| std::path::Path::new(dir).is_dir())
        .map(StaticSite::new);

    let state = AppState::new(
        startup.storage.clone(),
        startup.ingest_service.clone(),
        startup.analytics_service.clone(),
    )
    .with_static_site(static_site);

    // 限流状态在所有 worker 间共享，只构建一次
    let rate_limit = if config.rate_limit.enabled {
        let limit =
            build_rate_limit_config(&config.rate_limit).context("Invalid rate limit config")?;
        info!(
            "API rate limit: {} requests per {}s per client IP",
            config.rate_limit.max_requests, config.rate_limit.window_secs
        );
        Some(limit)
    } else {
        warn!("API rate limiting is disabled");
        None
    };

    let cors_config = config.cors.clone();
    if cors_config.enabled && cors_config.allowed_origins.is_empty() {
        warn!("CORS enabled but allowed_origins is empty, cross-origin requests will be rejected");
    }

    let admin_auth = AdminAuth::from_config();
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    info!("Using {} CPU cores for the server", cpu_count);

    let storage_for_shutdown = startup.storage.clone();

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);

        App::new()
            .wrap(TimingMiddleware::default()) // 最外层，记录请求延迟
            .wrap(RequestIdMiddleware) // 为每个请求生成 request_id
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(state.clone().configure(admin_auth.clone(), rate_limit.clone()))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();
    info!("Footprint listening on http://{}", bind_address);

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(storage_for_shutdown) => {
            info!("Graceful shutdown completed");
        }
    }

    Ok(())
}
