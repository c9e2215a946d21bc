//! Staging area for outgoing messages
//!
//! Most replies are assembled from prebuilt pieces (a preamble, a status,
//! a few fields) and only exist for the duration of one write. The builder
//! collects them into a bounded sequence, terminates it, serializes it and
//! starts over.
//!
//! Appends past capacity are dropped, never reported. Size the builder for
//! the largest message a call site produces.

use heapless::Vec;

use crate::serializer::{serialize, Sink};
use crate::value::Value;

/// Default builder capacity in values
pub const MESSAGE_CAPACITY: usize = 32;

/// Bounded sequence under construction
#[derive(Debug)]
pub struct MessageBuilder<'a, const N: usize = MESSAGE_CAPACITY> {
    values: Vec<Value<'a>, N>,
}

impl<'a, const N: usize> Default for MessageBuilder<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> MessageBuilder<'a, N> {
    /// Create an empty builder
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Discard everything appended so far
    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// Append one value, dropped if the builder is full
    pub fn append(&mut self, value: Value<'a>) {
        if self.values.push(value).is_err() {
            warn!("message builder full, dropped {}", value_kind(&value));
        }
    }

    /// Append the contents of a sequence
    ///
    /// Copies values up to, but not including, the first [`Value::End`].
    /// Stops early once the builder is full.
    pub fn append_sequence(&mut self, sequence: &[Value<'a>]) {
        for value in sequence.iter().take_while(|value| !value.is_end()) {
            if self.values.push(*value).is_err() {
                warn!("message builder full, sequence truncated");
                return;
            }
        }
    }

    /// Terminate, serialize into `sink`, then reset
    ///
    /// When the builder is already full the terminator itself is dropped and
    /// the slice end stands in for it.
    pub fn finish_and_serialize<S: Sink + ?Sized>(&mut self, sink: &mut S) {
        self.append(Value::End);
        serialize(sink, &self.values);
        self.reset();
    }

    /// Values appended so far
    pub fn as_slice(&self) -> &[Value<'a>] {
        &self.values
    }

    /// Number of values appended so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if further appends will be dropped
    pub fn is_full(&self) -> bool {
        self.values.is_full()
    }

    /// Maximum number of values
    pub const fn capacity(&self) -> usize {
        N
    }
}

fn value_kind(value: &Value<'_>) -> &'static str {
    match value {
        Value::Open => "open",
        Value::Close => "close",
        Value::End => "end",
        Value::Key(_) => "key",
        Value::Str(_) => "string",
        Value::Float(_) | Value::U16(_) | Value::U32(_) => "number",
        Value::Null => "null",
        Value::List(_) => "list",
        Value::Live(_) => "live field",
    }
}
