use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::services::{AnalyticsService, IngestService};
use crate::storage::{SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub ingest_service: Arc<IngestService>,
    pub analytics_service: Arc<AnalyticsService>,
}

/// 打开 `[database]` 配置的存储并执行迁移
///
/// CLI 的 `stats` / `cleanup` 也走这里。
pub async fn open_storage() -> Result<Arc<SeaOrmStorage>> {
    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());
    Ok(storage)
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // sqlx 和 ureq 共用同一个 provider；重复安装不算错误
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let config = crate::config::get_config();
    crate::config::validate_config(&config).context("Invalid configuration")?;

    let storage = open_storage().await?;

    let ingest_service = Arc::new(IngestService::from_config(storage.clone()));
    let analytics_service = Arc::new(AnalyticsService::from_config(storage.clone()));

    if config.admin.token.as_deref().is_none_or(str::is_empty) {
        warn!(
            "admin.token is not set: /api/admin/* is open to anyone who can reach the server. \
             Set FP__ADMIN__TOKEN to require a Bearer token."
        );
    } else {
        info!("Admin API protected by bearer token");
    }

    if let Some(dir) = config.server.static_dir.as_deref() {
        if std::path::Path::new(dir).is_dir() {
            info!("Serving static files from {}", dir);
        } else {
            warn!("server.static_dir {} is not a directory, static files disabled", dir);
        }
    }

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        storage,
        ingest_service,
        analytics_service,
    })
}
