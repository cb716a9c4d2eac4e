//! Dedup window policy
//!
//! Selects exactly one tier per visitor, in fixed priority order:
//! known address, then authenticated user, then anonymous
//! (address sentinel + signature). Pure, no I/O.

use chrono::{DateTime, Duration, Utc};
use xxhash_rust::xxh64::xxh64;

use super::identity::VisitorIdentity;
use super::kind::EntityKind;
use crate::config::ViewsConfig;

pub const DEFAULT_ADDRESS_WINDOW_SECS: i64 = 60 * 60;
pub const DEFAULT_USER_WINDOW_SECS: i64 = 60 * 60;
pub const DEFAULT_ANONYMOUS_WINDOW_SECS: i64 = 5 * 60;

/// Longer windows are clamped (ten years)
const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const LOCK_KEY_SEED: u64 = 0x6d76_7669_6577;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupTier {
    Address,
    User,
    Anonymous,
}

/// Ledger predicate selected for one visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerMatch {
    Address(String),
    User(i64),
    Signature { address: String, signature: String },
}

impl LedgerMatch {
    pub fn tier(&self) -> DedupTier {
        match self {
            LedgerMatch::Address(_) => DedupTier::Address,
            LedgerMatch::User(_) => DedupTier::User,
            LedgerMatch::Signature { .. } => DedupTier::Anonymous,
        }
    }

    /// Stable textual key of the matched identity
    pub fn key(&self) -> String {
        match self {
            LedgerMatch::Address(address) => format!("a:{}", address),
            LedgerMatch::User(user_id) => format!("u:{}", user_id),
            LedgerMatch::Signature { address, signature } => {
                format!("s:{}\u{1f}{}", address, signature)
            }
        }
    }
}

/// Tier, window and predicate for one recording attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupRule {
    pub window: Duration,
    pub matcher: LedgerMatch,
}

impl DedupRule {
    pub fn tier(&self) -> DedupTier {
        self.matcher.tier()
    }

    /// Earliest `viewed_at` that still suppresses a repeat view.
    /// Ledger rows must be strictly newer than this instant.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// 64-bit key identifying (entity kind, entity id, identity), used to
    /// serialize concurrent recorders through a transaction-scoped lock.
    pub fn lock_key(&self, kind: EntityKind, entity_id: i64) -> i64 {
        let raw = format!("{}:{}:{}", kind, entity_id, self.matcher.key());
        xxh64(raw.as_bytes(), LOCK_KEY_SEED) as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub address_window: Duration,
    pub user_window: Duration,
    pub anonymous_window: Duration,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            address_window: Duration::seconds(DEFAULT_ADDRESS_WINDOW_SECS),
            user_window: Duration::seconds(DEFAULT_USER_WINDOW_SECS),
            anonymous_window: Duration::seconds(DEFAULT_ANONYMOUS_WINDOW_SECS),
        }
    }
}

impl WindowPolicy {
    pub fn from_config(config: &ViewsConfig) -> Self {
        Self {
            address_window: secs(config.address_window_secs),
            user_window: secs(config.user_window_secs),
            anonymous_window: secs(config.anonymous_window_secs),
        }
    }

    pub fn select(&self, visitor: &VisitorIdentity) -> DedupRule {
        if visitor.has_known_address() {
            return DedupRule {
                window: self.address_window,
                matcher: LedgerMatch::Address(visitor.address.clone()),
            };
        }

        if let Some(user_id) = visitor.user_id {
            return DedupRule {
                window: self.user_window,
                matcher: LedgerMatch::User(user_id),
            };
        }

        DedupRule {
            window: self.anonymous_window,
            matcher: LedgerMatch::Signature {
                address: visitor.address.clone(),
                signature: visitor.signature.clone(),
            },
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_WINDOW_SECS) as i64)
}
