//! Shutdown Coordinator
//!
//! Two-phase graceful shutdown, run on its own thread so that
//! [`ActorSystem::shutdown`](crate::ActorSystem::shutdown) returns at once:
//!
//! 1. **Admission cutoff**: the registry gate closes; registrations and
//!    external sends fail from here on.
//! 2. **Drain**: poll every actor's pending work at a fixed interval, for a
//!    bounded number of attempts. Actors may keep feeding each other
//!    internally; the bound guarantees the coordinator moves on regardless.
//! 3. **Stop + join**: every actor gets a stop request, finishes its queue and
//!    exits. Exits are awaited up to a fixed wall-clock budget.
//! 4. **Resolve**: `true` if every thread was joined in budget. Otherwise the
//!    stragglers' queues are discarded, their threads detached, the registry
//!    cleared, and the result is `false`.
//!
//! The result is delivered through a [`ShutdownHandle`]; it resolves exactly
//! once on every path, including the coordinator thread dying.

use crate::registry::Address;
use crate::system::SystemInner;
use crossbeam_channel::RecvTimeoutError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};

/// Drain interval between pending-work polls
pub const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Polls before the coordinator stops waiting for actors to go quiet
pub const DEFAULT_DRAIN_MAX_ATTEMPTS: u32 = 4;

/// Wall-clock budget for actor threads to exit after the stop request
pub const DEFAULT_TERMINATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Timing envelope of the shutdown protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    pub drain_poll_interval: Duration,
    pub drain_max_attempts: u32,
    pub termination_timeout: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
            drain_max_attempts: DEFAULT_DRAIN_MAX_ATTEMPTS,
            termination_timeout: DEFAULT_TERMINATION_TIMEOUT,
        }
    }
}

impl ShutdownPolicy {
    /// Upper bound on how long a shutdown can take, excluding a handler that
    /// never returns
    pub fn worst_case(&self) -> Duration {
        self.drain_poll_interval * self.drain_max_attempts + self.termination_timeout
    }
}

/// Awaitable result of a shutdown: `true` clean, `false` forced
///
/// Cloneable; every clone observes the same single outcome. Also usable from
/// synchronous code through [`ShutdownHandle::wait`].
#[derive(Clone)]
pub struct ShutdownHandle {
    outcome: Shared<BoxFuture<'static, bool>>,
    resolution: Arc<OnceLock<bool>>,
}

impl ShutdownHandle {
    pub(crate) fn channel() -> (ShutdownSignal, ShutdownHandle) {
        let (tx, rx) = oneshot::channel();
        let resolution = Arc::new(OnceLock::new());

        let handle = ShutdownHandle {
            // A dropped sender means the coordinator died: report forced
            outcome: rx.map(|result| result.unwrap_or(false)).boxed().shared(),
            resolution: Arc::clone(&resolution),
        };
        let signal = ShutdownSignal {
            tx: Some(tx),
            resolution,
        };
        (signal, handle)
    }

    /// Block the calling thread until the shutdown outcome is known
    ///
    /// Must not be called from an actor's handler: the actor would wait on
    /// its own termination.
    pub fn wait(&self) -> bool {
        futures::executor::block_on(self.clone())
    }

    /// Outcome if the coordinator has finished
    pub fn outcome(&self) -> Option<bool> {
        self.resolution.get().copied()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.get().is_some()
    }
}

impl Future for ShutdownHandle {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        self.outcome.poll_unpin(cx)
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// Sending half of a [`ShutdownHandle`]; resolves `false` if dropped unused
pub(crate) struct ShutdownSignal {
    tx: Option<oneshot::Sender<bool>>,
    resolution: Arc<OnceLock<bool>>,
}

impl ShutdownSignal {
    pub(crate) fn resolve(mut self, clean: bool) {
        self.complete(clean);
    }

    fn complete(&mut self, clean: bool) {
        if let Some(tx) = self.tx.take() {
            let _ = self.resolution.set(clean);
            // Nobody awaiting is fine
            let _ = tx.send(clean);
        }
    }
}

impl Drop for ShutdownSignal {
    fn drop(&mut self) {
        if self.tx.is_some() {
            error!("Shutdown coordinator exited without a result, reporting forced shutdown");
            self.complete(false);
        }
    }
}

/// Drives one system through drain, stop and join
pub(crate) struct ShutdownCoordinator {
    system: Arc<SystemInner>,
    policy: ShutdownPolicy,
}

impl ShutdownCoordinator {
    pub(crate) fn new(system: Arc<SystemInner>) -> Self {
        let policy = system.settings.shutdown;
        Self { system, policy }
    }

    /// Run the protocol on a dedicated thread
    pub(crate) fn spawn(self, signal: ShutdownSignal) {
        let name = format!("{}-shutdown", self.system.system_id);
        let spawned = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let clean = self.run();
                signal.resolve(clean);
            });

        // On failure the closure, and with it the signal, is dropped, which
        // resolves the handle as forced
        if let Err(e) = spawned {
            error!(error = %e, "Failed to spawn shutdown coordinator thread");
        }
    }

    pub(crate) fn run(&self) -> bool {
        let started = Instant::now();
        info!(
            system_id = %self.system.system_id,
            actors = self.system.registry.len(),
            "Actor system is shutting down"
        );

        let quiet = self.drain();
        let clean = self.stop_and_join();

        info!(
            system_id = %self.system.system_id,
            clean,
            drained_before_stop = quiet,
            shutdown_duration_ms = started.elapsed().as_millis() as u64,
            "Actor system shutdown complete"
        );
        clean
    }

    /// Wait for every actor to report no pending work, within the attempt bound
    fn drain(&self) -> bool {
        for attempt in 0..self.policy.drain_max_attempts {
            let (busy, queued) = self
                .system
                .registry
                .snapshot()
                .iter()
                .filter(|actor| actor.has_pending_work())
                .fold((0usize, 0usize), |(busy, queued), actor| {
                    (busy + 1, queued + actor.queued())
                });

            if busy == 0 {
                debug!(attempt, "All actors idle");
                return true;
            }

            trace!(
                attempt,
                busy_actors = busy,
                queued_messages = queued,
                "Actors still working, waiting"
            );
            thread::sleep(self.policy.drain_poll_interval);
        }

        warn!(
            attempts = self.policy.drain_max_attempts,
            "Actors still busy after drain budget, stopping them anyway"
        );
        false
    }

    fn stop_and_join(&self) -> bool {
        for actor in self.system.registry.snapshot() {
            actor.request_stop();
        }

        // `workers` is never held while touching the registry here
        let expected: HashSet<Address> = self.system.workers.lock().keys().cloned().collect();
        let deadline = Instant::now() + self.policy.termination_timeout;
        let mut exited = HashSet::with_capacity(expected.len());

        while !expected.is_subset(&exited) {
            match self.system.exits_rx.recv_deadline(deadline) {
                Ok(address) => {
                    exited.insert(address);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        exited = exited.len(),
                        expected = expected.len(),
                        timeout_ms = self.policy.termination_timeout.as_millis() as u64,
                        "Actor threads did not exit within the termination budget"
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let stragglers = {
            let mut workers = self.system.workers.lock();
            for address in &exited {
                if let Some(handle) = workers.remove(address) {
                    if handle.join().is_err() {
                        error!(address = %address, "Actor thread panicked outside its handler");
                    }
                }
            }
            workers.drain().collect::<Vec<_>>()
        };

        if stragglers.is_empty() {
            return true;
        }

        for (address, handle) in stragglers {
            let dropped = self
                .system
                .registry
                .get(&address)
                .map_or(0, |actor| actor.abandon());
            warn!(
                address = %address,
                dropped_messages = dropped,
                "Forcing actor termination, detaching its thread"
            );
            drop(handle);
        }
        let cleared = self.system.registry.clear();
        debug!(cleared, "Registry cleared after forced shutdown");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = ShutdownPolicy::default();
        assert_eq!(policy.drain_poll_interval, Duration::from_millis(100));
        assert_eq!(policy.drain_max_attempts, 4);
        assert_eq!(policy.termination_timeout, Duration::from_secs(60));
        assert_eq!(policy.worst_case(), Duration::from_millis(60_400));
    }

    #[test]
    fn test_handle_resolves_once() {
        let (signal, handle) = ShutdownHandle::channel();
        let other = handle.clone();
        assert!(!handle.is_resolved());

        signal.resolve(true);

        assert_eq!(handle.outcome(), Some(true));
        assert!(handle.wait());
        assert!(other.wait());
    }

    #[test]
    fn test_dropped_signal_reports_forced() {
        let (signal, handle) = ShutdownHandle::channel();
        drop(signal);

        assert_eq!(handle.outcome(), Some(false));
        assert!(!handle.wait());
    }

    #[tokio::test]
    async fn test_handle_is_awaitable() {
        let (signal, handle) = ShutdownHandle::channel();
        let waiter = tokio::spawn(handle.clone());

        std::thread::spawn(move || signal.resolve(false));

        assert!(!waiter.await.unwrap());
        assert!(!handle.await);
    }
}
