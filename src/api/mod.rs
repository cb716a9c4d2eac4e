//! HTTP API
//!
//! actix-web handlers, the JSON envelope and visitor extraction.

pub mod error_code;
pub mod helpers;
pub mod identity;
pub mod jwt;
pub mod services;
pub mod types;

pub use identity::VisitorExtractor;
pub use services::{AppStartTime, health_routes, views_routes};

use actix_web::web;

/// Mounts every API route under `prefix`
pub fn api_scope(prefix: &str) -> actix_web::Scope {
    web::scope(prefix)
        .service(health_routes())
        .service(views_routes())
}
