//! 数据库操作重试模块
//!
//! 对死锁、锁等待超时、SQLite BUSY 以及连接问题做指数退避重试。
//! 只有整个操作可以安全重放时才应包裹在 `with_retry` 中。

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Errors that know whether replaying the failed operation is safe
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

impl Retryable for DbErr {
    fn is_retryable(&self) -> bool {
        is_retryable_error(self)
    }
}

impl Retryable for crate::errors::MarketviewError {
    fn is_retryable(&self) -> bool {
        crate::errors::MarketviewError::is_retryable(self)
    }
}

/// SQLSTATE / vendor codes after which a recording transaction can be replayed
const RETRYABLE_CODES: &[&str] = &[
    // MySQL: deadlock victim, lock wait timeout
    "1213", "1205",
    // PostgreSQL: serialization_failure, deadlock_detected, lock_not_available
    "40001", "40P01", "55P03",
    // SQLite: BUSY, LOCKED, BUSY_SNAPSHOT
    "5", "6", "517",
];

/// Fallback for drivers that surface lock conflicts only as text
const RETRYABLE_MESSAGES: &[&str] = &[
    "deadlock",
    "lock wait timeout",
    "database is locked",
    "serialization failure",
    "pool timed out",
];

/// 锁冲突和连接故障可以重放，其余错误直接返回
pub fn is_retryable_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => is_lock_conflict(runtime_err),
        _ => false,
    }
}

fn is_lock_conflict(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    let text = match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            let code = sqlx_err
                .deref()
                .as_database_error()
                .and_then(|db_err| db_err.code().map(|code| code.into_owned()));
            if let Some(code) = code {
                return RETRYABLE_CODES.contains(&code.as_str());
            }
            sqlx_err.to_string()
        }
        RuntimeErr::Internal(msg) => msg.clone(),
        #[allow(unreachable_patterns)]
        _ => return false,
    };
    mentions_lock_conflict(&text)
}

fn mentions_lock_conflict(text: &str) -> bool {
    let text = text.to_lowercase();
    RETRYABLE_MESSAGES
        .iter()
        .any(|fragment| text.contains(fragment))
}

/// Backoff settings for replaying a failed transaction
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// `[database]` retry_count / retry_base_delay_ms / retry_max_delay_ms
    pub fn from_config() -> Self {
        let config = crate::config::get_config();
        Self {
            max_retries: config.database.retry_count,
            base_delay_ms: config.database.retry_base_delay_ms,
            max_delay_ms: config.database.retry_max_delay_ms,
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or `max_retries` replays have been spent.
///
/// `operation` must start from scratch on every call: each attempt is a
/// fresh transaction, so a failed one leaves nothing behind.
pub async fn with_retry<T, E, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut replays = 0;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if replays > 0 {
                    debug!("'{}' committed after {} replays", operation_name, replays);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            debug!("'{}' failed, not replayable: {}", operation_name, err);
            return Err(err);
        }
        if replays >= config.max_retries {
            return Err(err);
        }

        replays += 1;
        let delay = calculate_backoff(replays, config.base_delay_ms, config.max_delay_ms);
        warn!(
            "'{}' hit a transient failure ({}/{}), replaying in {} ms: {}",
            operation_name, replays, config.max_retries, delay, err
        );
        sleep(Duration::from_millis(delay)).await;
    }
}

/// `base * 2^(replay-1)`, capped at `max`, plus up to 25% jitter
fn calculate_backoff(replay: u32, base_ms: u64, max_ms: u64) -> u64 {
    use rand::RngExt;
    let capped = base_ms
        .saturating_mul(2u64.saturating_pow(replay.saturating_sub(1)))
        .min(max_ms);
    let jitter = rand::rng().random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}
