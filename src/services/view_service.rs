//! View service
//!
//! Entry point shared by the HTTP handlers and the CLI: dispatches on
//! entity kind, validates ids and replays transient failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::error;

use crate::errors::{MarketviewError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::retry::{self, RetryConfig};
use crate::views::{
    EntityKind, ProductViews, RecordOutcome, ShopViews, ViewRecorder, ViewStats, VisitorIdentity,
    WindowPolicy,
};

pub struct ViewService {
    storage: Arc<SeaOrmStorage>,
    shops: ViewRecorder<ShopViews>,
    products: ViewRecorder<ProductViews>,
    retry_config: RetryConfig,
}

impl ViewService {
    pub fn new(storage: Arc<SeaOrmStorage>, policy: WindowPolicy) -> Self {
        let retry_config = storage.retry_config();
        Self {
            storage,
            shops: ViewRecorder::new(ShopViews, policy),
            products: ViewRecorder::new(ProductViews, policy),
            retry_config,
        }
    }

    /// Windows taken from the loaded configuration
    pub fn from_config(storage: Arc<SeaOrmStorage>) -> Self {
        let config = crate::config::get_config();
        Self::new(storage, WindowPolicy::from_config(&config.views))
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn storage(&self) -> &Arc<SeaOrmStorage> {
        &self.storage
    }

    pub async fn record_view(
        &self,
        kind: EntityKind,
        entity_id: i64,
        visitor: &VisitorIdentity,
    ) -> Result<RecordOutcome> {
        self.record_view_at(kind, entity_id, visitor, Utc::now())
            .await
    }

    /// Each retry replays the whole transaction with the same clock reading
    pub async fn record_view_at(
        &self,
        kind: EntityKind,
        entity_id: i64,
        visitor: &VisitorIdentity,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        validate_entity_id(entity_id)?;
        let db = self.storage.get_db();

        let result = retry::with_retry("record_view", self.retry_config, || async move {
            match kind {
                EntityKind::Shop => self.shops.record_at(db, entity_id, visitor, now).await,
                EntityKind::Product => self.products.record_at(db, entity_id, visitor, now).await,
            }
        })
        .await;

        if let Err(MarketviewError::Transient(msg)) = &result {
            error!(
                "Recording {} {} view gave up after {} retries: {}",
                kind, entity_id, self.retry_config.max_retries, msg
            );
        }
        result
    }

    pub async fn get_view_count(&self, kind: EntityKind, entity_id: i64) -> Result<i64> {
        validate_entity_id(entity_id)?;
        let db = self.storage.get_db();
        match kind {
            EntityKind::Shop => self.shops.view_count(db, entity_id).await,
            EntityKind::Product => self.products.view_count(db, entity_id).await,
        }
    }

    pub async fn get_view_stats(&self, kind: EntityKind, entity_id: i64) -> Result<ViewStats> {
        validate_entity_id(entity_id)?;
        let db = self.storage.get_db();
        match kind {
            EntityKind::Shop => self.shops.stats(db, entity_id).await,
            EntityKind::Product => self.products.stats(db, entity_id).await,
        }
    }
}

fn validate_entity_id(entity_id: i64) -> Result<()> {
    if entity_id <= 0 {
        return Err(MarketviewError::validation(format!(
            "Invalid entity id: {}",
            entity_id
        )));
    }
    Ok(())
}
