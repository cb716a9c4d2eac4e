//! Execution modes
//!
//! - `serve`: HTTP server
//! - `config-gen` / `stats`: one-shot commands

pub mod commands;
pub mod server;
pub mod shutdown;

pub use commands::{run_config_gen, run_stats};
pub use server::run_server;
