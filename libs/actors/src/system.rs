//! Actor System Core
//!
//! The facade over the registry, the send path and the shutdown state
//! machine. `ActorSystem` is a cheap cloneable handle; all clones share one
//! runtime.
//!
//! ## Send path
//!
//! A send resolves the target under a registry read lock, releases the lock,
//! then enqueues into the target mailbox. There is no global lock on the
//! handler path: each mailbox serialises its own producers and its single
//! consumer, so actors run truly in parallel.
//!
//! ## Lock Ordering
//!
//! When both are needed, ALWAYS acquire in this order:
//! 1. `registry` (write, during registration)
//! 2. `workers`
//!
//! The shutdown coordinator only ever holds one of them at a time.

use crate::actor::{Actor, ActorState, ActorWorker, Handler};
use crate::builder::ActorRegistrationBuilder;
use crate::context::ActorContext;
use crate::error::{ActorError, Result};
use crate::messages::{Message, Origin};
use crate::registry::{ActorRegistry, Address};
use crate::shutdown::{ShutdownCoordinator, ShutdownHandle, ShutdownPolicy};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Actor-count ceiling used by [`SystemSettings::default`]
pub const DEFAULT_MAX_ACTORS: usize = 10;

/// Mailbox capacity used when a builder does not set one
pub const DEFAULT_MAILBOX_CAPACITY: usize = 16;

/// Runtime parameters fixed at system creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemSettings {
    pub max_actors: usize,
    pub default_mailbox_capacity: usize,
    pub shutdown: ShutdownPolicy,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            max_actors: DEFAULT_MAX_ACTORS,
            default_mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            shutdown: ShutdownPolicy::default(),
        }
    }
}

/// System-wide counters
#[derive(Debug, Default)]
pub struct SystemMetrics {
    pub actors_registered: AtomicU64,
    pub actors_terminated: AtomicU64,
    pub messages_accepted: AtomicU64,
    pub messages_processed: AtomicU64,
    pub handler_failures: AtomicU64,
    pub mailbox_full_rejections: AtomicU64,
    pub total_processing_time_ns: AtomicU64,
}

impl SystemMetrics {
    pub fn record_message_handled(&self, duration: Duration) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.total_processing_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record mailbox full event for backpressure monitoring
    pub fn record_mailbox_full(&self) {
        self.mailbox_full_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_actor_terminated(&self) {
        self.actors_terminated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_processing_time_ns(&self) -> f64 {
        let count = self
            .messages_processed
            .load(Ordering::Relaxed)
            .saturating_sub(self.handler_failures.load(Ordering::Relaxed));
        if count == 0 {
            return 0.0;
        }
        let total = self.total_processing_time_ns.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    pub fn snapshot(&self) -> SystemStats {
        SystemStats {
            actors_registered: self.actors_registered.load(Ordering::Relaxed),
            actors_terminated: self.actors_terminated.load(Ordering::Relaxed),
            messages_accepted: self.messages_accepted.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            mailbox_full_rejections: self.mailbox_full_rejections.load(Ordering::Relaxed),
            avg_processing_time_ns: self.avg_processing_time_ns(),
        }
    }
}

/// Point-in-time copy of [`SystemMetrics`]
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStats {
    pub actors_registered: u64,
    pub actors_terminated: u64,
    pub messages_accepted: u64,
    /// Handler invocations, failed ones included
    pub messages_processed: u64,
    pub handler_failures: u64,
    pub mailbox_full_rejections: u64,
    pub avg_processing_time_ns: f64,
}

/// State shared by every `ActorSystem` clone, the coordinator, and (weakly)
/// by every actor thread
pub(crate) struct SystemInner {
    pub(crate) system_id: String,
    pub(crate) settings: SystemSettings,
    pub(crate) registry: ActorRegistry,
    /// Processing threads still to be joined
    pub(crate) workers: Mutex<HashMap<Address, JoinHandle<()>>>,
    exits_tx: Sender<Address>,
    pub(crate) exits_rx: Receiver<Address>,
    shutdown: Mutex<Option<ShutdownHandle>>,
    pub(crate) metrics: Arc<SystemMetrics>,
}

impl SystemInner {
    pub(crate) fn is_shutdown(&self) -> bool {
        self.registry.is_closed()
    }

    /// Deliver `message` to `to` on behalf of `origin`
    pub(crate) fn route(&self, origin: &Origin, to: &Address, message: Message) -> Result<bool> {
        if !origin.is_internal() && self.is_shutdown() {
            debug!(to = %to, "System has been shut down, rejecting external message");
            return Err(ActorError::SystemOffline);
        }

        let actor = self.registry.get(to).ok_or_else(|| {
            warn!(to = %to, origin = %origin, "Actor is not known to the system");
            ActorError::no_such_actor(to.clone())
        })?;

        match actor.enqueue(message) {
            Ok(()) => {
                self.metrics.messages_accepted.fetch_add(1, Ordering::Relaxed);
                trace!(to = %to, origin = %origin, "Message enqueued");
                Ok(true)
            }
            Err(e) => {
                if matches!(e, ActorError::ActorMailboxFull { .. }) {
                    self.metrics.record_mailbox_full();
                }
                warn!(
                    to = %to,
                    origin = %origin,
                    error = %e,
                    error_category = e.category(),
                    "Message rejected"
                );
                Err(e)
            }
        }
    }

    /// Called by an actor thread once it has terminated
    pub(crate) fn unregister(&self, address: &Address) {
        if self.registry.remove(address).is_some() {
            debug!(address = %address, "Actor removed from registry");
        }
    }
}

impl Drop for SystemInner {
    fn drop(&mut self) {
        // Last handle gone without a shutdown: let the threads drain and exit
        // instead of parking forever
        self.registry.close();
        let actors = self.registry.snapshot();
        if !actors.is_empty() {
            debug!(
                system_id = %self.system_id,
                actors = actors.len(),
                "Actor system dropped, stopping remaining actors"
            );
        }
        for actor in actors {
            actor.request_stop();
        }
    }
}

/// Bounded in-process actor runtime
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl ActorSystem {
    /// Create a system admitting at most `max_actors` actors
    pub fn new(max_actors: usize) -> Self {
        Self::with_settings(SystemSettings {
            max_actors,
            ..SystemSettings::default()
        })
    }

    pub fn with_settings(settings: SystemSettings) -> Self {
        let system_id = format!("system-{}", Uuid::new_v4().simple());
        let (exits_tx, exits_rx) = unbounded();

        info!(
            system_id = %system_id,
            max_actors = settings.max_actors,
            "Creating new actor system"
        );

        Self {
            inner: Arc::new(SystemInner {
                system_id,
                settings,
                registry: ActorRegistry::new(settings.max_actors),
                workers: Mutex::new(HashMap::new()),
                exits_tx,
                exits_rx,
                shutdown: Mutex::new(None),
                metrics: Arc::new(SystemMetrics::default()),
            }),
        }
    }

    /// Register a handler behind a new mailbox and start its thread
    ///
    /// Fails with `SystemOffline` after shutdown and `SystemOverloaded` at the
    /// actor-count ceiling. The handler runs on the actor's own thread only.
    pub fn register_actor<F>(&self, mailbox_capacity: usize, handler: F) -> Result<Address>
    where
        F: FnMut(&ActorContext, Message) -> anyhow::Result<()> + Send + 'static,
    {
        self.register_boxed(mailbox_capacity, Box::new(handler))
    }

    pub(crate) fn register_boxed(&self, mailbox_capacity: usize, handler: Handler) -> Result<Address> {
        let inner = &self.inner;

        let actor = inner.registry.admit(|address| {
            let actor = Arc::new(Actor::new(address.clone(), mailbox_capacity));
            let worker = ActorWorker::new(
                Arc::clone(&actor),
                handler,
                Arc::downgrade(inner),
                Arc::clone(&inner.metrics),
                inner.exits_tx.clone(),
            );

            let thread = worker.spawn().map_err(|source| ActorError::SpawnFailed {
                address: address.clone(),
                source,
            })?;
            inner.workers.lock().insert(address, thread);
            Ok(actor)
        })?;

        inner.metrics.actors_registered.fetch_add(1, Ordering::Relaxed);
        info!(
            system_id = %inner.system_id,
            address = %actor.address(),
            capacity = mailbox_capacity,
            "Actor registered"
        );
        Ok(actor.address().clone())
    }

    /// Start a fluent registration
    pub fn actor(&self) -> ActorRegistrationBuilder<'_> {
        ActorRegistrationBuilder::new(self)
    }

    /// Send from outside the runtime; never blocks
    ///
    /// Returns `Ok(true)` once the message is queued. Handlers should send
    /// through their [`ActorContext`] instead, which keeps working while the
    /// system drains.
    pub fn send_message(&self, address: &Address, message: impl Into<Message>) -> Result<bool> {
        self.inner.route(&Origin::External, address, message.into())
    }

    /// Begin shutdown; idempotent
    ///
    /// Every call returns a handle to the same outcome.
    pub fn shutdown(&self) -> ShutdownHandle {
        let mut slot = self.inner.shutdown.lock();
        if let Some(handle) = slot.as_ref() {
            debug!(system_id = %self.inner.system_id, "Shutdown already in progress");
            return handle.clone();
        }

        self.inner.registry.close();
        let (signal, handle) = ShutdownHandle::channel();
        *slot = Some(handle.clone());
        drop(slot);

        ShutdownCoordinator::new(Arc::clone(&self.inner)).spawn(signal);
        handle
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }

    pub fn actor_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn max_actors(&self) -> usize {
        self.inner.registry.max_actors()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.inner.registry.contains(address)
    }

    /// Lifecycle state of a registered actor
    ///
    /// `None` once the actor has terminated and left the registry.
    pub fn actor_state(&self, address: &Address) -> Option<ActorState> {
        self.inner.registry.get(address).map(|actor| actor.state())
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.inner.registry.addresses()
    }

    pub fn settings(&self) -> &SystemSettings {
        &self.inner.settings
    }

    pub fn system_id(&self) -> &str {
        &self.inner.system_id
    }

    pub fn metrics(&self) -> Arc<SystemMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn stats(&self) -> SystemStats {
        self.inner.metrics.snapshot()
    }
}

impl fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("system_id", &self.inner.system_id)
            .field("registry", &self.inner.registry)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fast_settings(max_actors: usize) -> SystemSettings {
        SystemSettings {
            max_actors,
            default_mailbox_capacity: 4,
            shutdown: ShutdownPolicy {
                drain_poll_interval: Duration::from_millis(5),
                drain_max_attempts: 200,
                termination_timeout: Duration::from_secs(5),
            },
        }
    }

    #[test]
    fn test_actor_system_creation() {
        let system = ActorSystem::new(3);
        assert_eq!(system.actor_count(), 0);
        assert_eq!(system.max_actors(), 3);
        assert!(!system.is_shutdown());
        assert!(system.system_id().starts_with("system-"));
    }

    #[test]
    fn test_register_and_send() {
        let system = ActorSystem::with_settings(fast_settings(2));
        let count = Arc::new(AtomicUsize::new(0));

        let address = {
            let count = Arc::clone(&count);
            system
                .register_actor(8, move |_ctx, _msg| {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap()
        };

        assert!(system.contains(&address));
        assert!(matches!(
            system.actor_state(&address),
            Some(ActorState::Created | ActorState::Running)
        ));
        assert!(system.send_message(&address, "Hello").unwrap());
        assert!(system.send_message(&address, Message::new(7u8)).unwrap());

        assert!(system.shutdown().wait());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(system.actor_state(&address), None);

        let stats = system.stats();
        assert_eq!(stats.actors_registered, 1);
        assert_eq!(stats.actors_terminated, 1);
        assert_eq!(stats.messages_accepted, 2);
        assert_eq!(stats.messages_processed, 2);
    }

    #[test]
    fn test_actor_context_identifies_actor() {
        let system = ActorSystem::with_settings(fast_settings(1));
        let (tx, rx) = crossbeam_channel::bounded(1);

        let address = system
            .register_actor(1, move |ctx, _msg| {
                tx.send(ctx.address().clone())?;
                Ok(())
            })
            .unwrap();
        system.send_message(&address, "who").unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), address);
        assert!(system.shutdown().wait());
    }

    #[test]
    fn test_metrics_average() {
        let metrics = SystemMetrics::default();
        assert_eq!(metrics.avg_processing_time_ns(), 0.0);

        metrics.record_message_handled(Duration::from_nanos(100));
        metrics.record_message_handled(Duration::from_nanos(300));
        metrics.record_handler_failure();

        assert_eq!(metrics.avg_processing_time_ns(), 200.0);
        assert_eq!(metrics.snapshot().messages_processed, 3);
    }

    #[test]
    fn test_drop_stops_actor_threads() {
        let system = ActorSystem::with_settings(fast_settings(1));
        let (tx, rx) = crossbeam_channel::unbounded::<()>();

        let address = system
            .register_actor(4, move |_ctx, _msg| {
                tx.send(())?;
                Ok(())
            })
            .unwrap();
        system.send_message(&address, "last").unwrap();
        drop(system);

        // Handler (and its sender) is released once the thread exits
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
    }
}
