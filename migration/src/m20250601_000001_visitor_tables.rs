//! 访客统计表迁移
//!
//! 创建三张表：
//! - visitors：每个浏览器身份一行，重复访问时原地更新
//! - page_views：每次页面加载一行，只追加
//! - session_durations：每次离开页面（停留 >= 阈值）一行，只追加
//!
//! 时间戳统一使用毫秒级 Unix epoch（BIGINT），与浏览器端 `Date.now()` 一致。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Visitors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Visitors::Id)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Visitors::Timestamp).big_integer().not_null())
                    .col(
                        ColumnDef::new(Visitors::Visits)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Visitors::Browser).string_len(100).null())
                    .col(ColumnDef::new(Visitors::Device).string_len(100).null())
                    .col(ColumnDef::new(Visitors::ScreenSize).string_len(100).null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageViews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PageViews::VisitorId).string_len(255).null())
                    .col(ColumnDef::new(PageViews::Page).string_len(255).not_null())
                    .col(ColumnDef::new(PageViews::Timestamp).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_views_visitor")
                            .from(PageViews::Table, PageViews::VisitorId)
                            .to(Visitors::Table, Visitors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SessionDurations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionDurations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SessionDurations::VisitorId)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SessionDurations::Duration)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionDurations::Timestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_durations_visitor")
                            .from(SessionDurations::Table, SessionDurations::VisitorId)
                            .to(Visitors::Table, Visitors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 外键列索引（级联删除和按访客查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_visitor_id")
                    .table(PageViews::Table)
                    .col(PageViews::VisitorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_session_durations_visitor_id")
                    .table(SessionDurations::Table)
                    .col(SessionDurations::VisitorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionDurations::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PageViews::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Visitors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Visitors {
    #[sea_orm(iden = "visitors")]
    Table,
    Id,
    Timestamp,
    Visits,
    Browser,
    Device,
    ScreenSize,
}

#[derive(DeriveIden)]
pub(crate) enum PageViews {
    #[sea_orm(iden = "page_views")]
    Table,
    Id,
    VisitorId,
    Page,
    Timestamp,
}

#[derive(DeriveIden)]
pub(crate) enum SessionDurations {
    #[sea_orm(iden = "session_durations")]
    Table,
    Id,
    VisitorId,
    Duration,
    Timestamp,
}
