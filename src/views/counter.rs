use async_trait::async_trait;
use sea_orm::ConnectionTrait;

use crate::errors::Result;

/// Per-entity running total stored on the entity row itself.
///
/// `increment_and_get` is the only writer of the counter.
#[async_trait]
pub trait ViewCounter: Send + Sync {
    /// Existence check performed first inside a recording transaction.
    ///
    /// On SQLite this is a no-op write to the entity row, so the
    /// transaction holds the database write lock from its first statement.
    async fn claim_entity<C>(&self, conn: &C, entity_id: i64) -> Result<bool>
    where
        C: ConnectionTrait;

    /// Adds one and returns the new total, `None` if the row is gone
    async fn increment_and_get<C>(&self, conn: &C, entity_id: i64) -> Result<Option<i64>>
    where
        C: ConnectionTrait;

    /// Latest committed total, read with a shared row lock where supported
    async fn current_views<C>(&self, conn: &C, entity_id: i64) -> Result<Option<i64>>
    where
        C: ConnectionTrait;
}
