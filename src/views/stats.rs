//! Stats reporter
//!
//! Read-only aggregation over a ledger. Runs outside any transaction;
//! failures surface as storage errors, never transient ones.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QuerySelect};

use super::models::ViewStats;
use crate::errors::{MarketviewError, Result};

/// Ledger columns the aggregation reads
pub struct LedgerColumns<Col> {
    pub entity: Col,
    pub user: Col,
    pub address: Col,
    pub viewed_at: Col,
}

#[derive(Debug, FromQueryResult)]
struct StatsRow {
    total_views: i64,
    unique_users: i64,
    unique_addresses: i64,
    last_viewed_at: Option<DateTime<Utc>>,
}

pub async fn ledger_stats<E, C>(
    conn: &C,
    columns: LedgerColumns<E::Column>,
    entity_id: i64,
) -> Result<ViewStats>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let row = E::find()
        .select_only()
        // COUNT(*) - 已接受的浏览数
        .column_as(columns.entity.count(), "total_views")
        // COUNT(DISTINCT user_id) 忽略 NULL
        .column_as(
            SimpleExpr::from(Func::count_distinct(Expr::col(columns.user))),
            "unique_users",
        )
        .column_as(
            SimpleExpr::from(Func::count_distinct(Expr::col(columns.address))),
            "unique_addresses",
        )
        .column_as(columns.viewed_at.max(), "last_viewed_at")
        .filter(columns.entity.eq(entity_id))
        .into_model::<StatsRow>()
        .one(conn)
        .await
        .map_err(|e| MarketviewError::storage(format!("查询浏览统计失败: {}", e)))?;

    Ok(row
        .map(|row| ViewStats {
            total_views: row.total_views,
            unique_users: row.unique_users,
            unique_addresses: row.unique_addresses,
            last_viewed_at: row.last_viewed_at,
        })
        .unwrap_or_default())
}
