//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, ServerConfig, HostBlock, ...)
//! - [`validation`]: Startup checks collecting every problem in one pass

mod types;
mod validation;

pub use types::Config;
pub use validation::validate;
