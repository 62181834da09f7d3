//! geodetect - IP geolocation detector
//!
//! Resolves a visitor's location from the IP in `X-Forwarded-For` through
//! ipgeolocation.io and memoizes the result in client cookies, so repeat
//! visits never hit the provider.
//!
//! # Architecture
//! - `services`: provider abstraction, location record, resolver state machine
//! - `api`: HTTP handlers and middleware
//! - `config`: Configuration management
//! - `runtime`: Server startup
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod system;
pub mod utils;
