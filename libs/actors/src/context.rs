//! Handler execution context.
//!
//! Every handler call receives the context of the actor it runs on. Sends made
//! through it carry that actor's address as their origin, which is how the
//! system tells internal traffic (allowed while draining) from external
//! traffic (cut off at shutdown) without looking at thread identity.

use crate::error::{ActorError, Result};
use crate::messages::{Message, Origin};
use crate::registry::Address;
use crate::system::SystemInner;
use std::fmt;
use std::sync::Weak;

pub struct ActorContext {
    address: Address,
    system: Weak<SystemInner>,
}

impl ActorContext {
    pub(crate) fn new(address: Address, system: Weak<SystemInner>) -> Self {
        Self { address, system }
    }

    /// Address of the actor this handler runs on
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Send to another actor as internal traffic
    ///
    /// Keeps working after shutdown has started, for as long as the target
    /// has not terminated. Fails with `SystemOffline` once the system itself
    /// has been dropped.
    pub fn send(&self, to: &Address, message: impl Into<Message>) -> Result<bool> {
        let system = self.system.upgrade().ok_or(ActorError::SystemOffline)?;
        system.route(&Origin::Actor(self.address.clone()), to, message.into())
    }

    pub fn is_shutdown(&self) -> bool {
        self.system
            .upgrade()
            .map_or(true, |system| system.is_shutdown())
    }
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
