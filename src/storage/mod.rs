use std::sync::Arc;

use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::{CleanupReport, GroupCount, SeaOrmStorage};
pub use models::{
    BrowserFamily, DeviceClass, PageView, PageViewEvent, SessionDuration, SessionEvent,
    TrackingEvent, Visitor, VisitorEvent,
};

pub struct StorageFactory;

impl StorageFactory {
    /// 按 `[database]` 配置创建存储（类型从 URL 推断）
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        Self::create_with_url(&config.database.database_url).await
    }

    pub async fn create_with_url(database_url: &str) -> Result<Arc<SeaOrmStorage>> {
        let backend_type = backend::infer_backend_from_url(database_url)?;
        let storage = SeaOrmStorage::new(database_url, &backend_type).await?;
        Ok(Arc::new(storage))
    }
}
