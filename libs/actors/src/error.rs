//! Actor Runtime Error Types
//!
//! Every failure the runtime reports is synchronous and surfaced to the
//! caller as an [`ActorError`]. Handler failures never show up here: they are
//! caught at the actor boundary and only logged.

use crate::registry::Address;
use thiserror::Error;

/// Main runtime error type
#[derive(Error, Debug)]
pub enum ActorError {
    /// Registration rejected because the actor-count ceiling is reached
    #[error("System overloaded: already at max capacity of {max_actors} actors")]
    SystemOverloaded { max_actors: usize },

    /// Target mailbox is at capacity; the caller may retry or drop
    #[error("Actor mailbox full: {address} (capacity {capacity}). Retry later")]
    ActorMailboxFull { address: Address, capacity: usize },

    /// Target address is not (or no longer) in the registry
    #[error("No such actor: {address}")]
    NoSuchActor { address: Address },

    /// External call made after the shutdown admission cutoff
    #[error("System offline: the actor system has been shut down")]
    SystemOffline,

    /// Malformed registration request
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        field: Option<String>,
    },

    /// The processing thread for a new actor could not be started
    #[error("Failed to spawn processing thread for actor {address}")]
    SpawnFailed {
        address: Address,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    /// Create a system overloaded error
    pub fn overloaded(max_actors: usize) -> Self {
        Self::SystemOverloaded { max_actors }
    }

    /// Create a mailbox full error
    pub fn mailbox_full(address: Address, capacity: usize) -> Self {
        Self::ActorMailboxFull { address, capacity }
    }

    /// Create a no such actor error
    pub fn no_such_actor(address: Address) -> Self {
        Self::NoSuchActor { address }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// Short category label used as a structured logging field
    pub fn category(&self) -> &'static str {
        match self {
            Self::SystemOverloaded { .. } => "system_overloaded",
            Self::ActorMailboxFull { .. } => "mailbox_full",
            Self::NoSuchActor { .. } => "no_such_actor",
            Self::SystemOffline => "system_offline",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::SpawnFailed { .. } => "spawn_failed",
        }
    }

    /// Whether the caller can reasonably retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SystemOverloaded { .. } | Self::ActorMailboxFull { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting() {
        let err = ActorError::overloaded(10);
        assert_eq!(
            err.to_string(),
            "System overloaded: already at max capacity of 10 actors"
        );

        let addr = Address::generate();
        let err = ActorError::mailbox_full(addr.clone(), 2);
        assert!(err.to_string().contains(addr.as_str()));
        assert!(err.to_string().contains("capacity 2"));

        let err = ActorError::invalid_argument("handler is required", Some("handler"));
        match err {
            ActorError::InvalidArgument { field, .. } => {
                assert_eq!(field.as_deref(), Some("handler"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(ActorError::overloaded(1).is_retryable());
        assert!(ActorError::mailbox_full(Address::generate(), 1).is_retryable());
        assert!(!ActorError::SystemOffline.is_retryable());
        assert!(!ActorError::no_such_actor(Address::generate()).is_retryable());

        assert_eq!(ActorError::SystemOffline.category(), "system_offline");
        assert_eq!(
            ActorError::no_such_actor(Address::generate()).category(),
            "no_such_actor"
        );
    }
}
