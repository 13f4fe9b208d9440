//! Actor Messages
//!
//! A [`Message`] wraps one immutable payload of any `Send + Sync` type. It
//! carries no destination: the mailbox it lands in is its address. Payloads
//! are shared behind an `Arc`, so cloning a message never copies the value.

use crate::registry::Address;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Immutable message wrapper around an opaque payload
#[derive(Clone)]
pub struct Message {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Message {
    /// Wrap a payload value
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self {
            payload: Arc::new(payload),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the payload as `T`, if that is its type
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Check the payload type
    pub fn is<T: Any>(&self) -> bool {
        self.payload.as_ref().type_id() == TypeId::of::<T>()
    }

    /// Type name of the payload, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Payload as text when it is a `String` or `&'static str`
    pub fn as_text(&self) -> Option<&str> {
        self.payload::<String>()
            .map(String::as_str)
            .or_else(|| self.payload::<&'static str>().copied())
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.debug_struct("Message").field("body", &text).finish(),
            None => f
                .debug_struct("Message")
                .field("type", &self.type_name)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "Message{{body='{}'}}", text),
            None => write!(f, "Message{{<{}>}}", self.type_name),
        }
    }
}

impl From<String> for Message {
    fn from(body: String) -> Self {
        Self::new(body)
    }
}

impl From<&'static str> for Message {
    fn from(body: &'static str) -> Self {
        Self::new(body)
    }
}

/// Where a `send` call comes from
///
/// External calls are cut off at shutdown; calls made from inside an actor's
/// handler keep flowing so that in-flight chains can finish draining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Caller outside the runtime
    External,
    /// Handler of the actor with this address
    Actor(Address),
}

impl Origin {
    pub fn is_internal(&self) -> bool {
        matches!(self, Origin::Actor(_))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::External => write!(f, "external"),
            Origin::Actor(address) => write!(f, "{}", address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Quote {
        bid: i64,
        ask: i64,
    }

    #[test]
    fn test_message_payload_access() {
        let msg = Message::new(Quote { bid: 1999, ask: 2000 });

        assert!(msg.is::<Quote>());
        assert!(!msg.is::<String>());
        assert_eq!(msg.payload::<Quote>(), Some(&Quote { bid: 1999, ask: 2000 }));
        assert!(msg.payload::<u64>().is_none());
        assert!(msg.type_name().ends_with("Quote"));
    }

    #[test]
    fn test_message_clone_shares_payload() {
        let msg = Message::new(vec![1u8, 2, 3]);
        let copy = msg.clone();

        let a = msg.payload::<Vec<u8>>().unwrap();
        let b = copy.payload::<Vec<u8>>().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_message_text_rendering() {
        let owned = Message::from("ABC".to_string());
        let borrowed = Message::from("XYZ");

        assert_eq!(owned.as_text(), Some("ABC"));
        assert_eq!(borrowed.as_text(), Some("XYZ"));
        assert_eq!(owned.to_string(), "Message{body='ABC'}");

        let opaque = Message::new(42u32);
        assert_eq!(opaque.as_text(), None);
        assert_eq!(opaque.to_string(), "Message{<u32>}");
    }

    #[test]
    fn test_origin() {
        let address = Address::generate();
        assert!(!Origin::External.is_internal());
        assert!(Origin::Actor(address.clone()).is_internal());
        assert_eq!(Origin::Actor(address.clone()).to_string(), address.to_string());
    }
}
