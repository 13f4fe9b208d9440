//! Actor Registry
//!
//! Address→actor map with the system-wide admission gate. The registry is the
//! one structure mutated by several threads: registration writes, actors
//! removing themselves on termination, and the shutdown coordinator iterating.
//! Closing the gate and admitting a new actor both happen under the write
//! lock, so a registration can never slip in after shutdown has begun and the
//! actor count can never pass the ceiling.

use crate::actor::Actor;
use crate::error::{ActorError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Opaque, globally unique actor address
///
/// Callers should treat the inner string as a token and never parse it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Allocate a fresh random address
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Address {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Address {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bounded address→actor map
pub(crate) struct ActorRegistry {
    actors: RwLock<HashMap<Address, Arc<Actor>>>,
    max_actors: usize,
    /// Written only while holding the `actors` write lock
    closed: AtomicBool,
}

impl ActorRegistry {
    pub(crate) fn new(max_actors: usize) -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
            max_actors,
            closed: AtomicBool::new(false),
        }
    }

    /// Admit a new actor built by `build` under a freshly allocated address
    ///
    /// The closed check, the ceiling check and the insert are a single step.
    /// `build` runs with the write lock held and must not touch the registry.
    pub(crate) fn admit<F>(&self, build: F) -> Result<Arc<Actor>>
    where
        F: FnOnce(Address) -> Result<Arc<Actor>>,
    {
        let mut actors = self.actors.write();

        if self.closed.load(Ordering::Acquire) {
            debug!("Registration rejected: system is shut down");
            return Err(ActorError::SystemOffline);
        }

        if actors.len() >= self.max_actors {
            warn!(
                max_actors = self.max_actors,
                "Actor pool is full, rejecting registration"
            );
            return Err(ActorError::overloaded(self.max_actors));
        }

        let mut address = Address::generate();
        while actors.contains_key(&address) {
            address = Address::generate();
        }

        let actor = build(address.clone())?;
        actors.insert(address, Arc::clone(&actor));
        Ok(actor)
    }

    /// Stop admitting actors. Returns `true` if this call closed the gate.
    pub(crate) fn close(&self) -> bool {
        let _guard = self.actors.write();
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn get(&self, address: &Address) -> Option<Arc<Actor>> {
        self.actors.read().get(address).cloned()
    }

    pub(crate) fn contains(&self, address: &Address) -> bool {
        self.actors.read().contains_key(address)
    }

    pub(crate) fn remove(&self, address: &Address) -> Option<Arc<Actor>> {
        self.actors.write().remove(address)
    }

    /// Point-in-time copy of every registered actor
    pub(crate) fn snapshot(&self) -> Vec<Arc<Actor>> {
        self.actors.read().values().cloned().collect()
    }

    pub(crate) fn addresses(&self) -> Vec<Address> {
        self.actors.read().keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.actors.read().len()
    }

    pub(crate) fn max_actors(&self) -> usize {
        self.max_actors
    }

    pub(crate) fn clear(&self) -> usize {
        let mut actors = self.actors.write();
        let removed = actors.len();
        actors.clear();
        removed
    }
}

impl fmt::Debug for ActorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRegistry")
            .field("actors", &self.len())
            .field("max_actors", &self.max_actors)
            .field("closed", &self.is_closed())
            .finish()
    }
}
