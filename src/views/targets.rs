//! Shop and product adapters
//!
//! Both kinds share one schema shape: an entity table carrying a `views`
//! column and a ledger table keyed by the entity id. The adapters are
//! generated from that shape so the two can never drift apart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, DatabaseBackend,
    EntityTrait, ExprTrait, QueryFilter,
};

use migration::entities::{product, product_view, shop, shop_view};

use super::counter::ViewCounter;
use super::identity::VisitorIdentity;
use super::kind::EntityKind;
use super::ledger::ViewLedger;
use super::lock::{lock_exclusive_read, lock_shared_read};
use super::models::{ViewEvent, ViewStats};
use super::policy::LedgerMatch;
use super::stats::{LedgerColumns, ledger_stats};
use crate::errors::Result;

/// Ledger + counter pair for one entity kind
pub trait ViewTarget: ViewLedger + ViewCounter + 'static {
    fn kind(&self) -> EntityKind;
}

macro_rules! view_target {
    (
        $(#[$meta:meta])*
        $name:ident {
            kind: $kind:expr,
            entity: $entity:ident,
            ledger: $ledger:ident,
            entity_ref: $fk_field:ident / $fk_col:ident $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl ViewTarget for $name {
            fn kind(&self) -> EntityKind {
                $kind
            }
        }

        #[async_trait]
        impl ViewLedger for $name {
            async fn find_recent_view<C>(
                &self,
                conn: &C,
                entity_id: i64,
                matcher: &LedgerMatch,
                since: DateTime<Utc>,
            ) -> Result<bool>
            where
                C: ConnectionTrait,
            {
                let identity = match matcher {
                    LedgerMatch::Address(address) => {
                        Condition::all().add($ledger::Column::IpAddress.eq(address.as_str()))
                    }
                    LedgerMatch::User(user_id) => {
                        Condition::all().add($ledger::Column::UserId.eq(*user_id))
                    }
                    LedgerMatch::Signature { address, signature } => Condition::all()
                        .add($ledger::Column::IpAddress.eq(address.as_str()))
                        .add($ledger::Column::UserAgent.eq(signature.as_str())),
                };

                let query = lock_exclusive_read(
                    $ledger::Entity::find()
                        .filter($ledger::Column::$fk_col.eq(entity_id))
                        .filter(identity)
                        .filter($ledger::Column::ViewedAt.gt(since)),
                    conn.get_database_backend(),
                );

                Ok(query.one(conn).await?.is_some())
            }

            async fn append<C>(
                &self,
                conn: &C,
                entity_id: i64,
                visitor: &VisitorIdentity,
                occurred_at: DateTime<Utc>,
            ) -> Result<ViewEvent>
            where
                C: ConnectionTrait,
            {
                let row = $ledger::ActiveModel {
                    $fk_field: Set(entity_id),
                    user_id: Set(visitor.user_id),
                    ip_address: Set(visitor.address.clone()),
                    user_agent: Set(visitor.signature.clone()),
                    viewed_at: Set(occurred_at),
                    ..Default::default()
                }
                .insert(conn)
                .await?;

                Ok(ViewEvent {
                    id: row.id,
                    entity_kind: $kind,
                    entity_id: row.$fk_field,
                    visitor_user_id: row.user_id,
                    visitor_address: row.ip_address,
                    visitor_signature: row.user_agent,
                    occurred_at: row.viewed_at,
                })
            }

            async fn stats<C>(&self, conn: &C, entity_id: i64) -> Result<ViewStats>
            where
                C: ConnectionTrait,
            {
                ledger_stats::<$ledger::Entity, C>(
                    conn,
                    LedgerColumns {
                        entity: $ledger::Column::$fk_col,
                        user: $ledger::Column::UserId,
                        address: $ledger::Column::IpAddress,
                        viewed_at: $ledger::Column::ViewedAt,
                    },
                    entity_id,
                )
                .await
            }
        }

        #[async_trait]
        impl ViewCounter for $name {
            async fn claim_entity<C>(&self, conn: &C, entity_id: i64) -> Result<bool>
            where
                C: ConnectionTrait,
            {
                if conn.get_database_backend() == DatabaseBackend::Sqlite {
                    let result = $entity::Entity::update_many()
                        .col_expr($entity::Column::Views, Expr::col($entity::Column::Views))
                        .filter($entity::Column::Id.eq(entity_id))
                        .exec(conn)
                        .await?;
                    return Ok(result.rows_affected > 0);
                }

                Ok($entity::Entity::find_by_id(entity_id)
                    .one(conn)
                    .await?
                    .is_some())
            }

            async fn increment_and_get<C>(&self, conn: &C, entity_id: i64) -> Result<Option<i64>>
            where
                C: ConnectionTrait,
            {
                let update = $entity::Entity::update_many()
                    .col_expr(
                        $entity::Column::Views,
                        Expr::col($entity::Column::Views).add(1),
                    )
                    .filter($entity::Column::Id.eq(entity_id));

                if conn.support_returning() {
                    let rows = update.exec_with_returning(conn).await?;
                    return Ok(rows.into_iter().next().map(|row| row.views));
                }

                // 无 RETURNING：同一事务内读回自己的写入
                let result = update.exec(conn).await?;
                if result.rows_affected == 0 {
                    return Ok(None);
                }
                self.current_views(conn, entity_id).await
            }

            async fn current_views<C>(&self, conn: &C, entity_id: i64) -> Result<Option<i64>>
            where
                C: ConnectionTrait,
            {
                let query = lock_shared_read(
                    $entity::Entity::find_by_id(entity_id),
                    conn.get_database_backend(),
                );
                Ok(query.one(conn).await?.map(|row| row.views))
            }
        }
    };
}

view_target! {
    /// `shops.views` + `shop_views`
    ShopViews {
        kind: EntityKind::Shop,
        entity: shop,
        ledger: shop_view,
        entity_ref: shop_id / ShopId,
    }
}

view_target! {
    /// `products.views` + `product_views`
    ProductViews {
        kind: EntityKind::Product,
        entity: product,
        ledger: product_view,
        entity_ref: product_id / ProductId,
    }
}
