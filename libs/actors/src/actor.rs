//! Actor and Processing Loop
//!
//! An [`Actor`] is the shared half of a registered actor: its address, its
//! mailbox and the bookkeeping the shutdown coordinator polls. The other half,
//! the handler, is owned outright by the actor's dedicated processing thread
//! ([`ActorWorker`]). That thread is the only one that ever dequeues from the
//! mailbox, which is what gives a handler race-free access to the state it
//! closes over.
//!
//! Lifecycle: `Created → Running → Draining → Terminated`. A stop request
//! moves the actor to `Draining`; it keeps handling everything queued
//! (including messages other draining actors forward to it) and terminates
//! only once the queue is empty.

use crate::context::ActorContext;
use crate::error::{ActorError, Result};
use crate::mailbox::{EnqueueError, Mailbox};
use crate::messages::Message;
use crate::registry::Address;
use crate::system::{SystemInner, SystemMetrics};
use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, trace};

/// Message handler supplied at registration
///
/// Errors and panics are caught at the actor boundary, logged, and never
/// take down the actor or the system.
pub type Handler = Box<dyn FnMut(&ActorContext, Message) -> anyhow::Result<()> + Send + 'static>;

/// Actor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActorState {
    Created = 0,
    Running = 1,
    Draining = 2,
    Terminated = 3,
}

impl ActorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorState::Created,
            1 => ActorState::Running,
            2 => ActorState::Draining,
            _ => ActorState::Terminated,
        }
    }
}

/// Shared state of one registered actor
#[derive(Debug)]
pub(crate) struct Actor {
    address: Address,
    mailbox: Mailbox<Message>,
    busy: AtomicBool,
    /// Accepted but not yet fully handled
    pending: AtomicUsize,
    state: AtomicU8,
}

impl Actor {
    pub(crate) fn new(address: Address, mailbox_capacity: usize) -> Self {
        debug!(address = %address, capacity = mailbox_capacity, "Actor created");
        Self {
            address,
            mailbox: Mailbox::new(mailbox_capacity),
            busy: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            state: AtomicU8::new(ActorState::Created as u8),
        }
    }

    pub(crate) fn address(&self) -> &Address {
        &self.address
    }

    pub(crate) fn state(&self) -> ActorState {
        ActorState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ActorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Hand a message to this actor without blocking
    pub(crate) fn enqueue(&self, message: Message) -> Result<()> {
        // Counted before the insert so the coordinator never sees a
        // dequeued-but-not-yet-busy message as idle
        self.pending.fetch_add(1, Ordering::AcqRel);

        match self.mailbox.enqueue(message) {
            Ok(()) => Ok(()),
            Err(rejected) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                Err(match rejected {
                    EnqueueError::Full(_) => {
                        ActorError::mailbox_full(self.address.clone(), self.mailbox.capacity())
                    }
                    EnqueueError::Closed(_) => ActorError::no_such_actor(self.address.clone()),
                })
            }
        }
    }

    /// Queued messages or a handler currently running
    pub(crate) fn has_pending_work(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0 || self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn queued(&self) -> usize {
        self.mailbox.len()
    }

    /// One-shot, non-blocking stop signal
    pub(crate) fn request_stop(&self) -> bool {
        let first = self.mailbox.request_stop();
        if first {
            debug!(
                address = %self.address,
                queued = self.mailbox.len(),
                "Stop requested, actor will drain its mailbox"
            );
        }
        first
    }

    /// Drop queued work and close the mailbox; the current handler call, if
    /// any, still runs to completion
    pub(crate) fn abandon(&self) -> usize {
        let dropped = self.mailbox.abandon();
        self.pending.fetch_sub(dropped, Ordering::AcqRel);
        dropped
    }
}

/// Processing thread body for one actor
pub(crate) struct ActorWorker {
    actor: Arc<Actor>,
    handler: Handler,
    system: Weak<SystemInner>,
    metrics: Arc<SystemMetrics>,
    exits: Sender<Address>,
}

impl ActorWorker {
    pub(crate) fn new(
        actor: Arc<Actor>,
        handler: Handler,
        system: Weak<SystemInner>,
        metrics: Arc<SystemMetrics>,
        exits: Sender<Address>,
    ) -> Self {
        Self {
            actor,
            handler,
            system,
            metrics,
            exits,
        }
    }

    /// Start the dedicated thread, named after the actor's address
    pub(crate) fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(self.actor.address().to_string())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        let started = Instant::now();
        let address = self.actor.address().clone();
        let context = ActorContext::new(address.clone(), self.system.clone());

        self.actor.set_state(ActorState::Running);
        info!(address = %address, "Actor started, entering message loop");

        let mut handled = 0u64;
        while let Some(message) = self.actor.mailbox.dequeue() {
            if self.actor.state() == ActorState::Running && self.actor.mailbox.is_stopping() {
                self.actor.set_state(ActorState::Draining);
                debug!(address = %address, "Actor draining");
            }
            self.handle(&context, message);
            handled += 1;
        }

        self.actor.set_state(ActorState::Terminated);
        self.metrics.record_actor_terminated();

        if let Some(system) = self.system.upgrade() {
            system.unregister(&address);
        }

        info!(
            address = %address,
            messages_handled = handled,
            total_runtime_ms = started.elapsed().as_millis() as u64,
            "Actor terminated"
        );

        // Coordinator may already be gone on the forced path
        let _ = self.exits.send(address);
    }

    fn handle(&mut self, context: &ActorContext, message: Message) {
        let start = Instant::now();
        trace!(address = %context.address(), message = %message, "Handling message");

        self.actor.busy.store(true, Ordering::Release);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(context, message)));
        self.actor.busy.store(false, Ordering::Release);
        self.actor.pending.fetch_sub(1, Ordering::AcqRel);

        match outcome {
            Ok(Ok(())) => {
                self.metrics.record_message_handled(start.elapsed());
            }
            Ok(Err(e)) => {
                self.metrics.record_handler_failure();
                error!(
                    address = %context.address(),
                    error = %e,
                    processing_duration_ns = start.elapsed().as_nanos() as u64,
                    "Actor message processing failed"
                );
            }
            Err(payload) => {
                self.metrics.record_handler_failure();
                error!(
                    address = %context.address(),
                    panic = panic_message(payload.as_ref()),
                    "Actor handler panicked; message dropped"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(text) = panic.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}
