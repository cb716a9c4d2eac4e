//! View recorder
//!
//! One transaction per recording attempt:
//! claim entity → serialize visitor key → locked ledger check →
//! either read the current total, or append + increment.
//! Any failure rolls the whole transaction back.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{debug, trace, warn};

use super::identity::VisitorIdentity;
use super::lock::serialize_visitor;
use super::models::{RecordOutcome, ViewStats};
use super::policy::{DedupRule, WindowPolicy};
use super::targets::ViewTarget;
use crate::errors::{MarketviewError, Result};

pub struct ViewRecorder<T: ViewTarget> {
    target: T,
    policy: WindowPolicy,
}

impl<T: ViewTarget> ViewRecorder<T> {
    pub fn new(target: T, policy: WindowPolicy) -> Self {
        Self { target, policy }
    }

    pub async fn record(
        &self,
        db: &DatabaseConnection,
        entity_id: i64,
        visitor: &VisitorIdentity,
    ) -> Result<RecordOutcome> {
        self.record_at(db, entity_id, visitor, Utc::now()).await
    }

    /// Records a view as if the server clock read `now`
    pub async fn record_at(
        &self,
        db: &DatabaseConnection,
        entity_id: i64,
        visitor: &VisitorIdentity,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        let rule = self.policy.select(visitor);
        let txn = db.begin().await?;

        match self.record_in(&txn, entity_id, visitor, &rule, now).await {
            Ok(outcome) => {
                txn.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(
                        "Rollback of {} {} view failed: {}",
                        self.target.kind(),
                        entity_id,
                        rollback_err
                    );
                }
                warn!(
                    "Recording {} {} view rolled back: {}",
                    self.target.kind(),
                    entity_id,
                    e
                );
                Err(e)
            }
        }
    }

    async fn record_in(
        &self,
        txn: &DatabaseTransaction,
        entity_id: i64,
        visitor: &VisitorIdentity,
        rule: &DedupRule,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        let kind = self.target.kind();

        if !self.target.claim_entity(txn, entity_id).await? {
            return Err(self.not_found(entity_id));
        }

        serialize_visitor(txn, kind, entity_id, rule).await?;

        if self
            .target
            .find_recent_view(txn, entity_id, &rule.matcher, rule.since(now))
            .await?
        {
            let views = self
                .target
                .current_views(txn, entity_id)
                .await?
                .ok_or_else(|| self.not_found(entity_id))?;
            trace!(
                "Duplicate {} {} view suppressed ({:?} tier)",
                kind,
                entity_id,
                rule.tier()
            );
            return Ok(RecordOutcome {
                views,
                is_new: false,
            });
        }

        let event = self.target.append(txn, entity_id, visitor, now).await?;
        let views = self
            .target
            .increment_and_get(txn, entity_id)
            .await?
            .ok_or_else(|| self.not_found(entity_id))?;

        debug!(
            "Accepted {} {} view #{} ({:?} tier), total {}",
            kind,
            entity_id,
            event.id,
            rule.tier(),
            views
        );
        Ok(RecordOutcome {
            views,
            is_new: true,
        })
    }

    /// Plain read of the running total
    pub async fn view_count(&self, db: &DatabaseConnection, entity_id: i64) -> Result<i64> {
        self.target
            .current_views(db, entity_id)
            .await?
            .ok_or_else(|| self.not_found(entity_id))
    }

    pub async fn stats(&self, db: &DatabaseConnection, entity_id: i64) -> Result<ViewStats> {
        self.target.stats(db, entity_id).await
    }

    fn not_found(&self, entity_id: i64) -> MarketviewError {
        MarketviewError::not_found(format!("{} {} not found", self.target.kind(), entity_id))
    }
}
