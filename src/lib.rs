//! Marketview - view counting for a marketplace directory
//!
//! Records shop and product views, suppresses repeat visits inside a
//! cooldown window and keeps a running `views` total consistent with an
//! append-only ledger.
//!
//! # Architecture
//! - `views`: the engine (identity, dedup policy, ledger, counter, recorder, stats)
//! - `services`: `ViewService` facade with transient-failure retry
//! - `storage`: SeaORM connection, migrations and retry helpers
//! - `api`: actix-web handlers
//! - `config`: Configuration management
//! - `runtime`: Server and one-shot commands
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod views;
