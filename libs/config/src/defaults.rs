//! Runtime defaults
//!
//! Values used when a configuration file or environment variable does not
//! set a field. The runtime itself carries the same numbers as its own
//! defaults.

/// Actor system defaults
pub mod system {
    /// Maximum number of registered actors
    pub const MAX_ACTORS: usize = actor_runtime::system::DEFAULT_MAX_ACTORS;

    /// Mailbox capacity for builder registrations without an explicit size
    pub const DEFAULT_MAILBOX_CAPACITY: usize = actor_runtime::system::DEFAULT_MAILBOX_CAPACITY;
}

/// Shutdown protocol defaults
pub mod shutdown {
    /// Interval between drain polls (milliseconds)
    pub const DRAIN_POLL_INTERVAL_MS: u64 =
        actor_runtime::shutdown::DEFAULT_DRAIN_POLL_INTERVAL.as_millis() as u64;

    /// Drain polls before stopping actors regardless
    pub const DRAIN_MAX_ATTEMPTS: u32 = actor_runtime::shutdown::DEFAULT_DRAIN_MAX_ATTEMPTS;

    /// Budget for actor threads to exit after the stop request (milliseconds)
    pub const TERMINATION_TIMEOUT_MS: u64 =
        actor_runtime::shutdown::DEFAULT_TERMINATION_TIMEOUT.as_millis() as u64;
}

/// Logging defaults
pub mod logging {
    pub const LEVEL: &str = "info";
}

/// Config file and environment lookup
pub mod sources {
    /// Base configuration file
    pub const CONFIG_PATH: &str = "config/actors.toml";

    /// Directory holding `<environment>.toml` overrides
    pub const ENVIRONMENTS_DIR: &str = "config/environments";

    /// Prefix of overriding environment variables, e.g.
    /// `ACTORS_SYSTEM__MAX_ACTORS=32`
    pub const ENV_PREFIX: &str = "ACTORS";
}
