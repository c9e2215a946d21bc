//! Request/response correlation
//!
//! The host tags requests with a `message_id`. The id is remembered when the
//! request arrives and written into the next outgoing message, once:
//!
//! ```text
//! in:  {"message_id":5,"request":"device_info"}
//! out: {"message_id":5,"device_info":{...}}
//! out: {"time":1234}                          <- not echoed again
//! ```
//!
//! The echo is a [`LiveField`]: message sequences hold a [`Value::Live`]
//! pointing at the [`Correlation`], and the field disarms itself the first
//! time it is written.

use core::cell::Cell;

use crate::message::{Message, ROOT_OBJECT};
use crate::token::hash_key;
use crate::value::{Fragment, LiveField, Value};

/// Name of the correlation field
pub const MESSAGE_ID_KEY: &str = "message_id";

/// Precomputed hash of [`MESSAGE_ID_KEY`]
pub const MESSAGE_ID_HASH: u32 = hash_key(MESSAGE_ID_KEY);

/// Current message id and whether it still has to be sent
///
/// Interior mutability lets outgoing sequences hold a shared reference to
/// it while the receive path updates it between messages.
#[derive(Debug, Default)]
pub struct Correlation {
    id: Cell<u32>,
    pending: Cell<bool>,
}

impl Correlation {
    /// Create with id 0 and nothing to send
    pub const fn new() -> Self {
        Self {
            id: Cell::new(0),
            pending: Cell::new(false),
        }
    }

    /// Capture the id of an incoming message
    ///
    /// Anything still pending from an earlier message is dropped first. If the
    /// root object carries a numeric `message_id`, it becomes the current id
    /// and is armed for the next reply.
    pub fn on_incoming(&self, message: &Message<'_>) -> Option<u32> {
        self.pending.set(false);

        let id = message.get_u32(ROOT_OBJECT, MESSAGE_ID_HASH)?;
        debug!("message_id {} received", id);
        self.set_id(id);
        Some(id)
    }

    /// Store an id and arm it for sending
    pub fn set_id(&self, id: u32) {
        self.id.set(id);
        self.pending.set(true);
    }

    /// Most recently stored id
    pub fn id(&self) -> u32 {
        self.id.get()
    }

    /// Arm or disarm the echo without changing the id
    pub fn set_need_to_send(&self, pending: bool) {
        self.pending.set(pending);
    }

    /// Check if the next message will carry the id
    pub fn need_to_send(&self) -> bool {
        self.pending.get()
    }

    /// Produce `"message_id":<id>` if armed, disarming it
    pub fn next_field(&self) -> Option<Fragment<'static>> {
        if !self.pending.replace(false) {
            return None;
        }
        Fragment::from_slice(&[
            Value::Key(MESSAGE_ID_KEY),
            Value::U32(self.id.get()),
            Value::End,
        ])
        .ok()
    }

    /// The echo as a value for message sequences
    pub fn field(&self) -> Value<'_> {
        Value::Live(self)
    }
}

impl LiveField for Correlation {
    fn fetch(&self) -> Option<Fragment<'_>> {
        self.next_field()
    }
}
