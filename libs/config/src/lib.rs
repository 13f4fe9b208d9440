//! # Actor Runtime Configuration
//!
//! Centralized configuration and defaults for the actor runtime and the
//! binaries built on it.
//!
//! ## Features
//!
//! - **Defaults**: admission limits, shutdown timing, log level
//! - **Layered loading**: base TOML file, per-environment overrides,
//!   `ACTORS_`-prefixed environment variables
//! - **Validation**: rejects settings the runtime cannot run with
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actor_config::RuntimeConfig;
//! use actor_runtime::ActorSystem;
//!
//! let config = RuntimeConfig::load(None, Some("dev")).unwrap();
//! let system = ActorSystem::with_settings(config.system_settings());
//! ```

pub mod defaults;
pub mod runtime_config;

pub use runtime_config::{
    load_config, LoggingConfig, RuntimeConfig, ShutdownConfig, SystemConfig,
};
