//! Configuration module for bot settings and YAML loading
//!
//! This module provides:
//! - Configuration types (`BotConfig`, `AlertConfig`, `UniverseConfig`, `Interval`)
//! - YAML loading functionality (`load_config`)
//! - Shared runtime-mutable state wrapper (`SharedConfig`)
//! - Application constants with environment variable overrides
//! - Logging initialization (`init_logging`)

pub mod constants;
mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::{
    AlertConfig, BotConfig, Interval, ProviderKind, RankBy, SharedConfig, UniverseConfig,
};

// Re-export loader functions
pub use loader::{load_config, load_config_from_str};

// Re-export logging init
pub use logging::init_logging;
