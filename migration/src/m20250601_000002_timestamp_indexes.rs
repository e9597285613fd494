//! 时间戳索引
//!
//! 支撑两类查询：
//! - 最近访客（visitors.timestamp DESC）
//! - 数据清理（三张表的 timestamp < cutoff）

use sea_orm_migration::prelude::*;

use crate::m20250601_000001_visitor_tables::{PageViews, SessionDurations, Visitors};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_visitors_timestamp")
                    .table(Visitors::Table)
                    .col(Visitors::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_timestamp")
                    .table(PageViews::Table)
                    .col(PageViews::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_session_durations_timestamp")
                    .table(SessionDurations::Table)
                    .col(SessionDurations::Timestamp)
                    .to_owned(),
            )
            .await?;

        // page-stats 按 page 分组
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_page")
                    .table(PageViews::Table)
                    .col(PageViews::Page)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_page_views_page")
                    .table(PageViews::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_session_durations_timestamp")
                    .table(SessionDurations::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_page_views_timestamp")
                    .table(PageViews::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_visitors_timestamp")
                    .table(Visitors::Table)
                    .to_owned(),
            )
            .await
    }
}
