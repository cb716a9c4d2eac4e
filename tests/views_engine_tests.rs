//! View engine tests
//!
//! Recording, dedup windows, concurrency and atomicity against temporary
//! SQLite databases.

use std::sync::{Arc, Once};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use marketview::config::init_config;
use marketview::errors::{MarketviewError, Result};
use marketview::services::ViewService;
use marketview::storage::{RetryConfig, SeaOrmStorage};
use marketview::views::{
    EntityKind, LedgerMatch, ShopViews, UNKNOWN, ViewCounter, ViewEvent, ViewLedger,
    ViewRecorder, ViewStats, ViewTarget, VisitorIdentity, WindowPolicy,
};
use migration::entities::{product, shop};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection};
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("views.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

fn create_service(storage: Arc<SeaOrmStorage>) -> ViewService {
    ViewService::new(storage, WindowPolicy::default()).with_retry_config(RetryConfig {
        max_retries: 10,
        base_delay_ms: 5,
        max_delay_ms: 100,
    })
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

async fn seed_shop(db: &DatabaseConnection, id: i64, views: i64) -> i64 {
    shop::ActiveModel {
        id: Set(id),
        name: Set(format!("shop-{}", id)),
        views: Set(views),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to seed shop")
    .id
}

async fn seed_product(db: &DatabaseConnection, id: i64, shop_id: i64) -> i64 {
    product::ActiveModel {
        id: Set(id),
        shop_id: Set(shop_id),
        name: Set(format!("product-{}", id)),
        views: Set(0),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to seed product")
    .id
}

fn by_address(address: &str) -> VisitorIdentity {
    VisitorIdentity::new(None, address, "Mozilla/5.0")
}

// =============================================================================
// 窗口内幂等 / 窗口后重新计数
// =============================================================================

#[tokio::test]
async fn test_idempotent_within_window() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    seed_product(storage.get_db(), 10, 1).await;
    let service = create_service(storage);
    let visitor = by_address("198.51.100.4");

    let mut accepted = 0;
    for i in 0..5 {
        let outcome = service
            .record_view_at(EntityKind::Product, 10, &visitor, t0() + Duration::seconds(i * 30))
            .await
            .unwrap();
        assert_eq!(outcome.views, 1);
        if outcome.is_new {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(service.get_view_count(EntityKind::Product, 10).await.unwrap(), 1);
}

#[tokio::test]
async fn test_renewed_after_window() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    let service = create_service(storage);
    let visitor = by_address("198.51.100.4");

    let first = service
        .record_view_at(EntityKind::Shop, 1, &visitor, t0())
        .await
        .unwrap();
    let second = service
        .record_view_at(
            EntityKind::Shop,
            1,
            &visitor,
            t0() + Duration::hours(1) + Duration::seconds(1),
        )
        .await
        .unwrap();

    assert!(first.is_new);
    assert!(second.is_new);
    assert_eq!(second.views, 2);
}

#[tokio::test]
async fn test_window_boundary_is_exclusive() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    let service = create_service(storage);
    let visitor = by_address("198.51.100.4");

    service
        .record_view_at(EntityKind::Shop, 1, &visitor, t0())
        .await
        .unwrap();

    // 恰好一个窗口之后：旧记录不再 strictly newer than now - window
    let outcome = service
        .record_view_at(EntityKind::Shop, 1, &visitor, t0() + Duration::hours(1))
        .await
        .unwrap();
    assert!(outcome.is_new);
}

// =============================================================================
// 层级选择
// =============================================================================

#[tokio::test]
async fn test_address_tier_ignores_user_id() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    let service = create_service(storage);

    let first = service
        .record_view_at(
            EntityKind::Shop,
            1,
            &VisitorIdentity::new(Some(7), "203.0.113.7", "ua"),
            t0(),
        )
        .await
        .unwrap();
    let other_user_same_address = service
        .record_view_at(
            EntityKind::Shop,
            1,
            &VisitorIdentity::new(Some(8), "203.0.113.7", "other-ua"),
            t0() + Duration::minutes(1),
        )
        .await
        .unwrap();

    assert!(first.is_new);
    assert!(!other_user_same_address.is_new);
}

#[tokio::test]
async fn test_user_tier_ignores_signature() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    let service = create_service(storage);

    service
        .record_view_at(
            EntityKind::Shop,
            1,
            &VisitorIdentity::new(Some(7), UNKNOWN, "phone"),
            t0(),
        )
        .await
        .unwrap();
    let outcome = service
        .record_view_at(
            EntityKind::Shop,
            1,
            &VisitorIdentity::new(Some(7), UNKNOWN, "laptop"),
            t0() + Duration::minutes(50),
        )
        .await
        .unwrap();

    assert!(!outcome.is_new);
    assert_eq!(outcome.views, 1);
}

#[tokio::test]
async fn test_anonymous_tier_uses_signature_and_short_window() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    let service = create_service(storage);
    let anon_a = VisitorIdentity::new(None, UNKNOWN, "curl/8.5.0");
    let anon_b = VisitorIdentity::new(None, UNKNOWN, "Wget/1.21");

    let first = service
        .record_view_at(EntityKind::Shop, 1, &anon_a, t0())
        .await
        .unwrap();
    let repeat = service
        .record_view_at(EntityKind::Shop, 1, &anon_a, t0() + Duration::minutes(4))
        .await
        .unwrap();
    let other_signature = service
        .record_view_at(EntityKind::Shop, 1, &anon_b, t0() + Duration::minutes(4))
        .await
        .unwrap();
    let after_window = service
        .record_view_at(EntityKind::Shop, 1, &anon_a, t0() + Duration::minutes(6))
        .await
        .unwrap();

    assert!(first.is_new);
    assert!(!repeat.is_new);
    assert!(other_signature.is_new);
    assert!(after_window.is_new);
    assert_eq!(after_window.views, 3);
}

// =============================================================================
// 具体场景
// =============================================================================

#[tokio::test]
async fn test_product_42_scenario() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    seed_product(storage.get_db(), 42, 1).await;
    let service = create_service(storage);
    let visitor = VisitorIdentity::new(None, "203.0.113.7", UNKNOWN);

    let call1 = service
        .record_view_at(EntityKind::Product, 42, &visitor, t0())
        .await
        .unwrap();
    let call2 = service
        .record_view_at(EntityKind::Product, 42, &visitor, t0() + Duration::minutes(10))
        .await
        .unwrap();
    let call3 = service
        .record_view_at(EntityKind::Product, 42, &visitor, t0() + Duration::minutes(61))
        .await
        .unwrap();

    assert_eq!((call1.views, call1.is_new), (1, true));
    assert_eq!((call2.views, call2.is_new), (1, false));
    assert_eq!((call3.views, call3.is_new), (2, true));
}

#[tokio::test]
async fn test_shop_9_scenario() {
    let (storage, _dir) = create_temp_storage().await;
    let existing = 17;
    seed_shop(storage.get_db(), 9, existing).await;
    let service = create_service(storage);

    let user_7 = VisitorIdentity::new(Some(7), UNKNOWN, "Mozilla/5.0");
    let user_8 = VisitorIdentity::new(Some(8), UNKNOWN, "Mozilla/5.0");

    let call1 = service
        .record_view_at(EntityKind::Shop, 9, &user_7, t0())
        .await
        .unwrap();
    assert_eq!((call1.views, call1.is_new), (existing + 1, true));

    let call2 = service
        .record_view_at(EntityKind::Shop, 9, &user_7, t0() + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!((call2.views, call2.is_new), (existing + 1, false));

    let call2_other_user = service
        .record_view_at(EntityKind::Shop, 9, &user_8, t0() + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(
        (call2_other_user.views, call2_other_user.is_new),
        (existing + 2, true)
    );
}

// =============================================================================
// 并发
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_same_visitor_counts_once() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    seed_product(storage.get_db(), 5, 1).await;
    let service = Arc::new(create_service(storage));
    let visitor = by_address("192.0.2.50");

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = Arc::clone(&service);
        let visitor = visitor.clone();
        handles.push(tokio::spawn(async move {
            service
                .record_view(EntityKind::Product, 5, &visitor)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().expect("record_view failed");
        assert_eq!(outcome.views, 1);
        if outcome.is_new {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(service.get_view_count(EntityKind::Product, 5).await.unwrap(), 1);
    let stats = service.get_view_stats(EntityKind::Product, 5).await.unwrap();
    assert_eq!(stats.total_views, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_entities() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    seed_product(storage.get_db(), 100, 1).await;
    seed_product(storage.get_db(), 200, 1).await;
    let service = Arc::new(create_service(storage));

    let run = |id: i64, prefix: &'static str| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for i in 0..5 {
                let visitor = by_address(&format!("{}.{}", prefix, i));
                service
                    .record_view(EntityKind::Product, id, &visitor)
                    .await
                    .expect("record_view failed");
            }
        })
    };

    let (a, b) = tokio::join!(run(100, "10.1.0"), run(200, "10.2.0"));
    a.unwrap();
    b.unwrap();

    assert_eq!(service.get_view_count(EntityKind::Product, 100).await.unwrap(), 5);
    assert_eq!(service.get_view_count(EntityKind::Product, 200).await.unwrap(), 5);
}

#[tokio::test]
async fn test_same_id_different_kinds_are_independent() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 3, 0).await;
    seed_product(storage.get_db(), 3, 3).await;
    let service = create_service(storage);
    let visitor = by_address("198.51.100.9");

    let shop = service
        .record_view_at(EntityKind::Shop, 3, &visitor, t0())
        .await
        .unwrap();
    let product = service
        .record_view_at(EntityKind::Product, 3, &visitor, t0())
        .await
        .unwrap();

    assert!(shop.is_new);
    assert!(product.is_new);
}

// =============================================================================
// 原子性（故障注入）
// =============================================================================

/// Shop adapter whose increment always fails after the ledger insert
struct FailingIncrement;

#[async_trait]
impl ViewLedger for FailingIncrement {
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
        ShopViews.find_recent_view(conn, entity_id, matcher, since).await
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
        ShopViews.append(conn, entity_id, visitor, occurred_at).await
    }

    async fn stats<C>(&self, conn: &C, entity_id: i64) -> Result<ViewStats>
    where
        C: ConnectionTrait,
    {
        ShopViews.stats(conn, entity_id).await
    }
}

#[async_trait]
impl ViewCounter for FailingIncrement {
    async fn claim_entity<C>(&self, conn: &C, entity_id: i64) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        ShopViews.claim_entity(conn, entity_id).await
    }

    async fn increment_and_get<C>(&self, _conn: &C, _entity_id: i64) -> Result<Option<i64>>
    where
        C: ConnectionTrait,
    {
        Err(MarketviewError::storage("injected increment failure"))
    }

    async fn current_views<C>(&self, conn: &C, entity_id: i64) -> Result<Option<i64>>
    where
        C: ConnectionTrait,
    {
        ShopViews.current_views(conn, entity_id).await
    }
}

impl ViewTarget for FailingIncrement {
    fn kind(&self) -> EntityKind {
        EntityKind::Shop
    }
}

#[tokio::test]
async fn test_failed_increment_rolls_back_ledger_insert() {
    let (storage, _dir) = create_temp_storage().await;
    let db = storage.get_db();
    seed_shop(db, 1, 4).await;

    let failing = ViewRecorder::new(FailingIncrement, WindowPolicy::default());
    let result = failing
        .record_at(db, 1, &by_address("198.51.100.4"), t0())
        .await;
    assert!(matches!(result, Err(MarketviewError::Storage(_))));

    let stats = ShopViews.stats(db, 1).await.unwrap();
    assert_eq!(stats, ViewStats::default());
    assert_eq!(ShopViews.current_views(db, 1).await.unwrap(), Some(4));

    // 回滚后同一访客仍被视为新访问
    let service = create_service(storage.clone());
    let outcome = service
        .record_view_at(EntityKind::Shop, 1, &by_address("198.51.100.4"), t0())
        .await
        .unwrap();
    assert_eq!((outcome.views, outcome.is_new), (5, true));
}

// =============================================================================
// 不存在的实体 / 参数校验
// =============================================================================

#[tokio::test]
async fn test_unknown_entity_fails_closed() {
    let (storage, _dir) = create_temp_storage().await;
    let service = create_service(storage);

    let result = service
        .record_view_at(EntityKind::Shop, 404, &by_address("198.51.100.4"), t0())
        .await;
    assert!(matches!(result, Err(MarketviewError::NotFound(_))));

    // 没有孤立的 ledger 行
    let stats = service.get_view_stats(EntityKind::Shop, 404).await.unwrap();
    assert_eq!(stats.total_views, 0);

    let count = service.get_view_count(EntityKind::Shop, 404).await;
    assert!(matches!(count, Err(MarketviewError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_entity_id() {
    let (storage, _dir) = create_temp_storage().await;
    let service = create_service(storage);

    let result = service
        .record_view(EntityKind::Product, 0, &by_address("198.51.100.4"))
        .await;
    assert!(matches!(result, Err(MarketviewError::Validation(_))));
}

// =============================================================================
// 统计
// =============================================================================

#[tokio::test]
async fn test_stats_consistent_with_counter() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    seed_product(storage.get_db(), 7, 1).await;
    let service = create_service(storage);

    let visits = [
        (VisitorIdentity::new(Some(1), "198.51.100.1", "ua"), 0, true),
        (VisitorIdentity::new(Some(1), "198.51.100.1", "ua"), 5, false),
        (VisitorIdentity::new(Some(2), "198.51.100.2", "ua"), 6, true),
        (VisitorIdentity::new(None, "198.51.100.3", "ua"), 7, true),
        (VisitorIdentity::new(None, "198.51.100.3", "ua"), 8, false),
    ];

    for (visitor, minute, expect_new) in &visits {
        let outcome = service
            .record_view_at(
                EntityKind::Product,
                7,
                visitor,
                t0() + Duration::minutes(*minute),
            )
            .await
            .unwrap();
        assert_eq!(outcome.is_new, *expect_new);
    }

    let stats = service.get_view_stats(EntityKind::Product, 7).await.unwrap();
    assert_eq!(stats.total_views, 3);
    assert_eq!(stats.unique_users, 2);
    assert_eq!(stats.unique_addresses, 3);
    assert_eq!(stats.last_viewed_at, Some(t0() + Duration::minutes(7)));

    assert_eq!(service.get_view_count(EntityKind::Product, 7).await.unwrap(), 3);
}

#[tokio::test]
async fn test_stats_empty_entity() {
    let (storage, _dir) = create_temp_storage().await;
    seed_shop(storage.get_db(), 1, 0).await;
    let service = create_service(storage);

    let stats = service.get_view_stats(EntityKind::Shop, 1).await.unwrap();
    assert_eq!(stats, ViewStats::default());
}
