//! Runtime
//!
//! HTTP server startup and application wiring.

pub mod server;

pub use server::{build_app_state, configure_app, run_server};
