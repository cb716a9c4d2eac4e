//! View ledger capability
//!
//! Append-only log of accepted views. No update or delete is exposed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;

use super::identity::VisitorIdentity;
use super::models::{ViewEvent, ViewStats};
use super::policy::LedgerMatch;
use crate::errors::Result;

#[async_trait]
pub trait ViewLedger: Send + Sync {
    /// Locking read: is there a row for `entity_id` matching `matcher`
    /// with `viewed_at` strictly after `since`?
    ///
    /// Must run inside the transaction that performs the conditional
    /// append, after the recorder has serialized the visitor key.
    async fn find_recent_view<C>(
        &self,
        conn: &C,
        entity_id: i64,
        matcher: &LedgerMatch,
        since: DateTime<Utc>,
    ) -> Result<bool>
    where
        C: ConnectionTrait;

    async fn append<C>(
        &self,
        conn: &C,
        entity_id: i64,
        visitor: &VisitorIdentity,
        occurred_at: DateTime<Utc>,
    ) -> Result<ViewEvent>
    where
        C: ConnectionTrait;

    /// Point-in-time aggregation, zeroed when the ledger holds no rows
    async fn stats<C>(&self, conn: &C, entity_id: i64) -> Result<ViewStats>
    where
        C: ConnectionTrait;
}
