//! In-Process Actor Runtime
//!
//! A bounded registry of independent message-processing actors. Each actor
//! owns an ordered, bounded inbox and a dedicated OS thread; a failing
//! handler call is isolated to the one message that caused it.
//!
//! # Architecture
//!
//! ```text
//!  caller ──send_message──┐            ┌───────────── ActorSystem ─────────────┐
//!                         │            │                                       │
//!                         ▼            │  registry: Address → Actor            │
//!                 ┌──────────────┐     │  (admission gate, max_actors)         │
//!                 │  route()     │─────┼──► Mailbox (bounded FIFO) ──► thread  │
//!                 └──────────────┘     │        ▲                     handler  │
//!                         ▲            │        └── ctx.send (internal) ◄──┘   │
//!                         │            │                                       │
//!  caller ──shutdown()────┴────────────┼──► ShutdownCoordinator (own thread)   │
//!                                      └───────────────────────────────────────┘
//! ```
//!
//! # Admission control
//!
//! - **System level**: at most `max_actors` registered actors
//!   ([`ActorError::SystemOverloaded`]).
//! - **Actor level**: at most `capacity` queued messages per mailbox
//!   ([`ActorError::ActorMailboxFull`]). Sends never block.
//!
//! # Shutdown
//!
//! [`ActorSystem::shutdown`] cuts off external traffic, waits for actors to go
//! quiet, stops them (each drains its queue first) and joins their threads.
//! The returned [`ShutdownHandle`] resolves `true` for a clean shutdown and
//! `false` when the time budget ran out.
//!
//! # Examples
//!
//! ```rust
//! use actor_runtime::{ActorSystem, Message};
//!
//! let system = ActorSystem::new(4);
//!
//! let logger = system
//!     .register_actor(8, |ctx, msg| {
//!         println!("[{}] {}", ctx.address(), msg);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let forwarder = {
//!     let logger = logger.clone();
//!     system
//!         .actor()
//!         .with_mailbox_size(8)
//!         .with_message_handler(move |ctx, msg| {
//!             ctx.send(&logger, format!("forwarded({})", msg))?;
//!             Ok(())
//!         })
//!         .register()
//!         .unwrap()
//! };
//!
//! system.send_message(&forwarder, Message::from("hello")).unwrap();
//! assert!(system.shutdown().wait());
//! ```

pub mod actor;
pub mod builder;
pub mod context;
pub mod error;
pub mod mailbox;
pub mod messages;
pub mod registry;
pub mod shutdown;
pub mod system;

pub use actor::{ActorState, Handler};
pub use builder::ActorRegistrationBuilder;
pub use context::ActorContext;
pub use error::{ActorError, Result};
pub use mailbox::{EnqueueError, Mailbox};
pub use messages::{Message, Origin};
pub use registry::Address;
pub use shutdown::{ShutdownHandle, ShutdownPolicy};
pub use system::{ActorSystem, SystemMetrics, SystemSettings, SystemStats};
