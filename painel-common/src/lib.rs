//! Painel Common - Shared configuration, errors and logging for painel services.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.painel/config.json` + `PAINEL_*` env)
//! - Error types and context helpers
//! - Logging setup with noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    Config, DashboardConfig, GatewayConfig, ObservabilityConfig, PolicyOverrideConfig,
    RetryConfig,
};
pub use error::{Error, Result};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
}
