//! Mutation operations for SeaOrmStorage
//!
//! Visitor upsert, append-only page view / session inserts, retention purge.

use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, Condition, EntityTrait, ExprTrait, QueryFilter, SqlErr, TransactionTrait,
    sea_query::{Expr, OnConflict, Query},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

use super::SeaOrmStorage;
use crate::analytics::TS_EXPORT_PATH;
use crate::errors::{FootprintError, Result};
use crate::storage::models::{PageViewEvent, SessionEvent, VisitorEvent};

use migration::entities::{page_view, session_duration, visitor};

/// 清理结果（每张表删除的行数）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    #[ts(type = "number")]
    pub visitors: u64,
    #[ts(type = "number")]
    pub page_views: u64,
    #[ts(type = "number")]
    pub session_durations: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.visitors + self.page_views + self.session_durations
    }
}

/// 外键违例说明引用的访客不存在（检查与插入之间被清理删除）
fn map_insert_error(err: sea_orm::DbErr, visitor_id: &str, what: &str) -> FootprintError {
    if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
        return FootprintError::visitor_not_found(format!("Unknown visitor: {}", visitor_id));
    }
    FootprintError::database_operation(format!("Failed to insert {}: {}", what, err))
}

impl SeaOrmStorage {
    /// 原子 upsert：新访客 `visits = 1`，已有访客 `visits + 1` 并覆盖其余字段
    ///
    /// 单条 `INSERT ... ON CONFLICT (id) DO UPDATE`，并发重复上报不会产生两行。
    pub async fn upsert_visitor(&self, event: &VisitorEvent) -> Result<()> {
        let model = visitor::ActiveModel {
            id: Set(event.id.clone()),
            timestamp: Set(event.timestamp),
            visits: Set(1),
            browser: Set(Some(event.browser.clone())),
            device: Set(Some(event.device.to_string())),
            screen_size: Set(Some(event.screen_size.clone())),
        };

        visitor::Entity::insert(model)
            .on_conflict(
                OnConflict::column(visitor::Column::Id)
                    .update_columns([
                        visitor::Column::Timestamp,
                        visitor::Column::Browser,
                        visitor::Column::Device,
                        visitor::Column::ScreenSize,
                    ])
                    .value(
                        visitor::Column::Visits,
                        Expr::col(visitor::Column::Visits).add(1),
                    )
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| {
                FootprintError::database_operation(format!(
                    "Failed to upsert visitor '{}': {}",
                    event.id, e
                ))
            })?;

        debug!("Visitor upserted: {}", event.id);
        Ok(())
    }

    /// 访客是否存在
    pub async fn visitor_exists(&self, id: &str) -> Result<bool> {
        let found = visitor::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| {
                FootprintError::database_operation(format!("Failed to look up visitor: {}", e))
            })?;
        Ok(found.is_some())
    }

    async fn ensure_visitor(&self, id: &str) -> Result<()> {
        if self.visitor_exists(id).await? {
            Ok(())
        } else {
            Err(FootprintError::visitor_not_found(format!(
                "Unknown visitor: {}",
                id
            )))
        }
    }

    /// 追加一条页面浏览记录
    pub async fn insert_page_view(&self, event: &PageViewEvent) -> Result<()> {
        self.ensure_visitor(&event.visitor_id).await?;

        let model = page_view::ActiveModel {
            id: NotSet,
            visitor_id: Set(Some(event.visitor_id.clone())),
            page: Set(event.page.clone()),
            timestamp: Set(event.timestamp),
        };

        page_view::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| map_insert_error(e, &event.visitor_id, "page view"))?;

        debug!("Page view recorded: {} {}", event.visitor_id, event.page);
        Ok(())
    }

    /// 追加一条会话时长记录（调用方负责阈值校验）
    pub async fn insert_session(&self, event: &SessionEvent) -> Result<()> {
        self.ensure_visitor(&event.visitor_id).await?;

        let duration = i32::try_from(event.duration).map_err(|_| {
            FootprintError::validation(format!("duration out of range: {}", event.duration))
        })?;

        let model = session_duration::ActiveModel {
            id: NotSet,
            visitor_id: Set(Some(event.visitor_id.clone())),
            duration: Set(duration),
            timestamp: Set(event.timestamp),
        };

        session_duration::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| map_insert_error(e, &event.visitor_id, "session duration"))?;

        debug!("Session recorded: {} {}s", event.visitor_id, duration);
        Ok(())
    }

    /// 删除 `timestamp < cutoff` 的全部记录
    ///
    /// 旧访客名下的页面浏览和会话一并删除（与外键 `ON DELETE CASCADE`
    /// 结果一致，但显式删除以便统计行数）。单事务执行。
    pub async fn purge_before(&self, cutoff: i64) -> Result<CleanupReport> {
        let txn = self.db.begin().await.map_err(|e| {
            FootprintError::database_operation(format!("Failed to begin transaction: {}", e))
        })?;

        let stale_visitors = Query::select()
            .column(visitor::Column::Id)
            .from(visitor::Entity)
            .and_where(Expr::col(visitor::Column::Timestamp).lt(cutoff))
            .to_owned();

        let page_views = page_view::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(page_view::Column::Timestamp.lt(cutoff))
                    .add(page_view::Column::VisitorId.in_subquery(stale_visitors.clone())),
            )
            .exec(&txn)
            .await
            .map_err(|e| {
                FootprintError::database_operation(format!("Failed to purge page views: {}", e))
            })?
            .rows_affected;

        let session_durations = session_duration::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(session_duration::Column::Timestamp.lt(cutoff))
                    .add(session_duration::Column::VisitorId.in_subquery(stale_visitors)),
            )
            .exec(&txn)
            .await
            .map_err(|e| {
                FootprintError::database_operation(format!("Failed to purge sessions: {}", e))
            })?
            .rows_affected;

        let visitors = visitor::Entity::delete_many()
            .filter(visitor::Column::Timestamp.lt(cutoff))
            .exec(&txn)
            .await
            .map_err(|e| {
                FootprintError::database_operation(format!("Failed to purge visitors: {}", e))
            })?
            .rows_affected;

        txn.commit().await.map_err(|e| {
            FootprintError::database_operation(format!("Failed to commit cleanup: {}", e))
        })?;

        let report = CleanupReport {
            visitors,
            page_views,
            session_durations,
        };
        info!("Purged {} rows older than {}", report.total(), cutoff);
        Ok(report)
    }
}
