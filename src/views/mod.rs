//! View counting and deduplication engine
//!
//! Shared by shops and products: identity resolution, tiered dedup
//! windows, an append-only ledger and the running `views` aggregate,
//! all written together in one transaction by [`ViewRecorder`].

pub mod counter;
pub mod identity;
pub mod kind;
pub mod ledger;
pub mod lock;
pub mod models;
pub mod policy;
pub mod recorder;
pub mod stats;
pub mod targets;

pub use counter::ViewCounter;
pub use identity::{AddressSources, UNKNOWN, VisitorIdentity, resolve_visitor};
pub use kind::EntityKind;
pub use ledger::ViewLedger;
pub use models::{RecordOutcome, ViewCount, ViewEvent, ViewStats};
pub use policy::{DedupRule, DedupTier, LedgerMatch, WindowPolicy};
pub use recorder::ViewRecorder;
pub use targets::{ProductViews, ShopViews, ViewTarget};
