//! Demo Pipeline
//!
//! Five cooperating actors:
//!
//! ```text
//!   decrypter ──> logger
//!       └───────> printer
//!   encoder ──(delay)──> logger
//!   decoder ──> logger
//! ```
//!
//! The encoder sleeps before forwarding, so its message reaches the logger
//! after shutdown has started. It is still delivered because it originates
//! inside the system.

use actor_runtime::{ActorContext, ActorSystem, Address, Message, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Lines emitted by the printer and logger, in handling order
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Addresses of the registered demo actors
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub printer: Address,
    pub logger: Address,
    pub decrypter: Address,
    pub encoder: Address,
    pub decoder: Address,
    pub journal: Journal,
}

impl Pipeline {
    /// Register all five actors on `system`
    pub fn register(system: &ActorSystem, encode_delay: Duration) -> Result<Self> {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));

        let printer = {
            let journal = Arc::clone(&journal);
            system
                .actor()
                .with_mailbox_size(5)
                .with_message_handler(move |_ctx, msg| {
                    let line = format!("Printing message: {}", msg);
                    info!("{}", line);
                    journal.lock().push(line);
                    Ok(())
                })
                .register()?
        };

        let logger = {
            let journal = Arc::clone(&journal);
            system
                .actor()
                .with_mailbox_size(2)
                .with_message_handler(move |_ctx, msg| {
                    let line = format!("Logging message: {}", msg);
                    info!("{}", line);
                    journal.lock().push(line);
                    Ok(())
                })
                .register()?
        };

        let decrypter = {
            let logger = logger.clone();
            let printer = printer.clone();
            system.register_actor(2, move |ctx, msg| {
                let body = text(&msg)?;
                info!("Decrypting message: {}", msg);
                forward(ctx, &logger, format!("decrypt({})", body));
                forward(ctx, &printer, format!("print({})", body));
                Ok(())
            })?
        };

        let encoder = {
            let logger = logger.clone();
            system.register_actor(2, move |ctx, msg| {
                let encoded = STANDARD.encode(text(&msg)?.as_bytes());
                info!("Encoded: {}", encoded);
                // Lands after shutdown has begun; internal sends are still accepted
                std::thread::sleep(encode_delay);
                forward(ctx, &logger, format!("encoded({})", encoded));
                Ok(())
            })?
        };

        let decoder = {
            let logger = logger.clone();
            system.register_actor(2, move |ctx, msg| {
                let bytes = STANDARD.decode(text(&msg)?)?;
                let decoded = String::from_utf8(bytes)?;
                info!("Decoded: {}", decoded);
                forward(ctx, &logger, format!("decoded({})", decoded));
                Ok(())
            })?
        };

        Ok(Self {
            printer,
            logger,
            decrypter,
            encoder,
            decoder,
            journal,
        })
    }

    /// Kick off the three entry actors
    pub fn seed(&self, system: &ActorSystem, name: &str) -> Result<()> {
        system.send_message(&self.decrypter, "ABC")?;
        system.send_message(&self.encoder, name.to_string())?;
        system.send_message(&self.decoder, STANDARD.encode(name.as_bytes()))?;
        Ok(())
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

fn text(msg: &Message) -> anyhow::Result<&str> {
    msg.as_text()
        .ok_or_else(|| anyhow::anyhow!("expected a text message, got {}", msg.type_name()))
}

/// Send and report rejection without failing the current handler
fn forward(ctx: &ActorContext, to: &Address, body: String) {
    if let Err(e) = ctx.send(to, body) {
        warn!(from = %ctx.address(), to = %to, error = %e, "Forward rejected");
    }
}
