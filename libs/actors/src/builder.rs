//! Fluent actor registration.
//!
//! Thin sugar over [`ActorSystem::register_actor`]: inputs are validated
//! here, before the registry is touched.

use crate::actor::Handler;
use crate::context::ActorContext;
use crate::error::{ActorError, Result};
use crate::messages::Message;
use crate::registry::Address;
use crate::system::ActorSystem;
use std::fmt;

/// Builder returned by [`ActorSystem::actor`]
pub struct ActorRegistrationBuilder<'a> {
    system: &'a ActorSystem,
    mailbox_size: Option<std::result::Result<usize, String>>,
    handler: Option<Handler>,
}

impl<'a> ActorRegistrationBuilder<'a> {
    pub(crate) fn new(system: &'a ActorSystem) -> Self {
        Self {
            system,
            mailbox_size: None,
            handler: None,
        }
    }

    /// Mailbox capacity; negative or oversized values fail at `register`
    pub fn with_mailbox_size<N>(mut self, size: N) -> Self
    where
        N: TryInto<usize> + fmt::Display + Copy,
    {
        self.mailbox_size = Some(
            size.try_into()
                .map_err(|_| format!("mailbox size must be a non-negative integer, got {}", size)),
        );
        self
    }

    pub fn with_message_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&ActorContext, Message) -> anyhow::Result<()> + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Validate and register
    ///
    /// Without an explicit size the system's default mailbox capacity is used.
    pub fn register(self) -> Result<Address> {
        let capacity = match self.mailbox_size {
            Some(Ok(capacity)) => capacity,
            Some(Err(message)) => {
                return Err(ActorError::invalid_argument(message, Some("mailbox_size")))
            }
            None => self.system.settings().default_mailbox_capacity,
        };

        let handler = self.handler.ok_or_else(|| {
            ActorError::invalid_argument("a message handler is required", Some("handler"))
        })?;

        self.system.register_boxed(capacity, handler)
    }
}

impl fmt::Debug for ActorRegistrationBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRegistrationBuilder")
            .field("mailbox_size", &self.mailbox_size)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_registers_actor() {
        let system = ActorSystem::new(2);
        let address = system
            .actor()
            .with_mailbox_size(3)
            .with_message_handler(|_ctx, _msg| Ok(()))
            .register()
            .unwrap();

        assert!(system.contains(&address));
        assert!(system.shutdown().wait());
    }

    #[test]
    fn test_builder_rejects_negative_size() {
        let system = ActorSystem::new(2);
        let err = system
            .actor()
            .with_mailbox_size(-1)
            .with_message_handler(|_ctx, _msg| Ok(()))
            .register()
            .unwrap_err();

        match err {
            ActorError::InvalidArgument { field, message } => {
                assert_eq!(field.as_deref(), Some("mailbox_size"));
                assert!(message.contains("-1"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(system.actor_count(), 0);
    }

    #[test]
    fn test_builder_requires_handler() {
        let system = ActorSystem::new(2);
        let err = system.actor().with_mailbox_size(4).register().unwrap_err();

        assert!(matches!(
            err,
            ActorError::InvalidArgument { ref field, .. } if field.as_deref() == Some("handler")
        ));
        assert_eq!(system.actor_count(), 0);
    }

    #[test]
    fn test_builder_default_capacity() {
        let system = ActorSystem::new(1);
        let address = system
            .actor()
            .with_message_handler(|_ctx, _msg| Ok(()))
            .register()
            .unwrap();

        assert!(system.contains(&address));
        assert_eq!(system.settings().default_mailbox_capacity, 16);
    }
}
