//! Visitor key serialization
//!
//! A bare `SELECT ... FOR UPDATE` locks nothing when no ledger row
//! matches yet, so two first-time visits could both insert. Each backend
//! closes that gap differently:
//!
//! - PostgreSQL: transaction-scoped advisory lock on the hashed
//!   (kind, entity, identity) key, released on commit or rollback
//! - MySQL/MariaDB: the ledger `FOR UPDATE` takes next-key locks on the
//!   index range; the losing transaction fails with a deadlock, which is
//!   transient and replayed by the service
//! - SQLite: the entity claim already holds the database write lock

use sea_orm::{ConnectionTrait, DatabaseBackend, QuerySelect};
use tracing::trace;

use super::kind::EntityKind;
use super::policy::DedupRule;
use crate::errors::Result;

pub async fn serialize_visitor<C>(
    conn: &C,
    kind: EntityKind,
    entity_id: i64,
    rule: &DedupRule,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if conn.get_database_backend() == DatabaseBackend::Postgres {
        let key = rule.lock_key(kind, entity_id);
        trace!("Acquiring advisory lock {} for {} {}", key, kind, entity_id);
        conn.execute_unprepared(&format!("SELECT pg_advisory_xact_lock({})", key))
            .await?;
    }
    Ok(())
}

/// Ledger existence checks take row locks except on SQLite
pub fn supports_row_locks(backend: DatabaseBackend) -> bool {
    backend != DatabaseBackend::Sqlite
}

/// `FOR UPDATE` where the backend has row locks
pub fn lock_exclusive_read<Q: QuerySelect>(query: Q, backend: DatabaseBackend) -> Q {
    if supports_row_locks(backend) {
        query.lock_exclusive()
    } else {
        query
    }
}

/// `FOR SHARE` where the backend has row locks.
///
/// A locking read returns the latest committed row instead of the
/// transaction snapshot, so a suppressed duplicate on MySQL reports the
/// total the winning transaction committed.
pub fn lock_shared_read<Q: QuerySelect>(query: Q, backend: DatabaseBackend) -> Q {
    if supports_row_locks(backend) {
        query.lock_shared()
    } else {
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::entities::{shop, shop_view};
    use sea_orm::{EntityTrait, QueryTrait};

    fn shop_read_sql(backend: DatabaseBackend) -> String {
        lock_shared_read(shop::Entity::find_by_id(9), backend)
            .build(backend)
            .to_string()
    }

    #[test]
    fn test_total_read_is_shared_locked_on_row_lock_backends() {
        let mysql = shop_read_sql(DatabaseBackend::MySql);
        assert!(
            mysql.contains("FOR SHARE") || mysql.contains("LOCK IN SHARE MODE"),
            "{}",
            mysql
        );
        assert!(shop_read_sql(DatabaseBackend::Postgres).contains("FOR SHARE"));
        assert!(!shop_read_sql(DatabaseBackend::Sqlite).contains("FOR "));
    }

    #[test]
    fn test_ledger_read_is_exclusive_locked_on_row_lock_backends() {
        let sql = lock_exclusive_read(shop_view::Entity::find(), DatabaseBackend::Postgres)
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.contains("FOR UPDATE"));

        let sql = lock_exclusive_read(shop_view::Entity::find(), DatabaseBackend::Sqlite)
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(!sql.contains("FOR UPDATE"));
    }
}
