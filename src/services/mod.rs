//! Service layer
//!
//! Business entry points shared by the HTTP API and the CLI.

mod view_service;

pub use view_service::*;
