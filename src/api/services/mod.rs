pub mod health;
pub mod views;

pub use health::{AppStartTime, HealthService, health_routes};
pub use views::{ViewsService, views_routes};
