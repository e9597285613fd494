//! Query operations for SeaOrmStorage
//!
//! Read-only counts and group-by queries behind the aggregation API.

use sea_orm::{
    ColumnTrait, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

use super::SeaOrmStorage;
use crate::analytics::SESSION_BUCKETS;
use crate::errors::{FootprintError, Result};
use crate::storage::models::{DeviceClass, PageView, SessionDuration, Visitor};

use migration::entities::{page_view, session_duration, visitor};

/// 分组计数结果行
#[derive(Debug, Clone, FromQueryResult)]
pub struct GroupCount {
    pub name: Option<String>,
    pub count: i64,
}

impl GroupCount {
    pub fn into_pair(self) -> (Option<String>, u64) {
        (self.name, self.count.max(0) as u64)
    }
}

#[derive(Debug, FromQueryResult)]
struct SumRow {
    total: Option<i64>,
}

fn query_error(what: &str) -> impl FnOnce(sea_orm::DbErr) -> FootprintError + '_ {
    move |e| FootprintError::database_operation(format!("Failed to query {}: {}", what, e))
}

impl SeaOrmStorage {
    pub async fn count_visitors(&self) -> Result<u64> {
        visitor::Entity::find()
            .count(&self.db)
            .await
            .map_err(query_error("visitor count"))
    }

    pub async fn count_page_views(&self) -> Result<u64> {
        page_view::Entity::find()
            .count(&self.db)
            .await
            .map_err(query_error("page view count"))
    }

    pub async fn count_sessions(&self) -> Result<u64> {
        session_duration::Entity::find()
            .count(&self.db)
            .await
            .map_err(query_error("session count"))
    }

    pub async fn count_visitors_by_device(&self, device: DeviceClass) -> Result<u64> {
        visitor::Entity::find()
            .filter(visitor::Column::Device.eq(device.to_string()))
            .count(&self.db)
            .await
            .map_err(query_error("device count"))
    }

    /// 最近访客（按最近访问时间降序）
    pub async fn recent_visitors(&self, limit: u64) -> Result<Vec<Visitor>> {
        let models = visitor::Entity::find()
            .order_by_desc(visitor::Column::Timestamp)
            .order_by_asc(visitor::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(query_error("recent visitors"))?;
        Ok(models.into_iter().map(Visitor::from).collect())
    }

    pub async fn browser_counts(&self) -> Result<Vec<GroupCount>> {
        self.visitor_group_counts(visitor::Column::Browser).await
    }

    pub async fn device_counts(&self) -> Result<Vec<GroupCount>> {
        self.visitor_group_counts(visitor::Column::Device).await
    }

    async fn visitor_group_counts(&self, column: visitor::Column) -> Result<Vec<GroupCount>> {
        visitor::Entity::find()
            .select_only()
            .column_as(column, "name")
            .column_as(visitor::Column::Id.count(), "count")
            .group_by(column)
            .into_model::<GroupCount>()
            .all(&self.db)
            .await
            .map_err(query_error("visitor group counts"))
    }

    pub async fn page_counts(&self) -> Result<Vec<GroupCount>> {
        page_view::Entity::find()
            .select_only()
            .column_as(page_view::Column::Page, "name")
            .column_as(page_view::Column::Id.count(), "count")
            .group_by(page_view::Column::Page)
            .into_model::<GroupCount>()
            .all(&self.db)
            .await
            .map_err(query_error("page counts"))
    }

    /// 每个时长分桶的会话数（按分桶顺序）
    pub async fn session_bucket_counts(&self) -> Result<[u64; SESSION_BUCKETS.len()]> {
        let mut counts = [0u64; SESSION_BUCKETS.len()];
        for (slot, bucket) in counts.iter_mut().zip(SESSION_BUCKETS.iter()) {
            let mut query = session_duration::Entity::find()
                .filter(session_duration::Column::Duration.gte(bucket.min_secs));
            if let Some(max) = bucket.max_secs {
                query = query.filter(session_duration::Column::Duration.lt(max));
            }
            *slot = query
                .count(&self.db)
                .await
                .map_err(query_error("session buckets"))?;
        }
        Ok(counts)
    }

    /// 会话总时长（秒）与条数
    pub async fn session_totals(&self) -> Result<(i64, u64)> {
        // MySQL 的 SUM 返回 DECIMAL，需要转成整数
        let sum_expr = match self.db_backend() {
            DbBackend::MySql => "CAST(COALESCE(SUM(duration), 0) AS SIGNED)",
            _ => "COALESCE(SUM(duration), 0)",
        };

        let row = session_duration::Entity::find()
            .select_only()
            .column_as(Expr::cust(sum_expr), "total")
            .into_model::<SumRow>()
            .one(&self.db)
            .await
            .map_err(query_error("session totals"))?;

        let count = self.count_sessions().await?;
        Ok((row.and_then(|r| r.total).unwrap_or(0), count))
    }

    pub async fn all_visitors(&self) -> Result<Vec<Visitor>> {
        let models = visitor::Entity::find()
            .order_by_desc(visitor::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(query_error("visitors"))?;
        Ok(models.into_iter().map(Visitor::from).collect())
    }

    pub async fn all_page_views(&self) -> Result<Vec<PageView>> {
        let models = page_view::Entity::find()
            .order_by_desc(page_view::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(query_error("page views"))?;
        Ok(models.into_iter().map(PageView::from).collect())
    }

    pub async fn all_sessions(&self) -> Result<Vec<SessionDuration>> {
        let models = session_duration::Entity::find()
            .order_by_desc(session_duration::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(query_error("session durations"))?;
        Ok(models.into_iter().map(SessionDuration::from).collect())
    }

    /// 单个访客（测试与 CLI 使用）
    pub async fn get_visitor(&self, id: &str) -> Result<Option<Visitor>> {
        let model = visitor::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(query_error("visitor"))?;
        Ok(model.map(Visitor::from))
    }
}
