//! Value model for outgoing JSON
//!
//! An outgoing object is described as a flat sequence of [`Value`]s, one per
//! token of the output text, terminated by [`Value::End`]:
//!
//! ```text
//! [Open, Key("name"), Str("Bill"), Key("age"), U16(56), Close, End]
//!  {"name":"Bill","age":56}
//! ```
//!
//! Punctuation other than braces is never written by hand. Colons follow
//! every key, commas are inserted between fields, and any object still open
//! when the outermost sequence ends is closed automatically:
//!
//! ```text
//! [Open, Key("person"), List(&BILL), End]   BILL = [Open, Key("name"), Str("Bill"), End]
//!  {"person":{"name":"Bill"}}
//! ```
//!
//! [`Value::List`] splices another sequence in place without adding any
//! punctuation of its own, which lets common fields be defined once and
//! shared between messages. [`Value::Live`] does the same for fields whose
//! content is only known when the message is written.
//!
//! # Preconditions
//!
//! A `List` must never refer back, directly or through other lists, to the
//! sequence that contains it. The serializer does not detect cycles and will
//! recurse until the stack is exhausted. Debug builds stop at
//! [`MAX_SPLICE_DEPTH`](crate::serializer::MAX_SPLICE_DEPTH).
//!
//! Values never own their text. Keys and strings borrow from the caller for
//! the lifetime `'a`, which must cover serialization.

use core::fmt;
use core::ptr;

use heapless::Vec;

/// Maximum number of values a [`LiveField`] can produce at once
pub const FRAGMENT_CAPACITY: usize = 16;

/// Values produced on demand by a [`LiveField`]
pub type Fragment<'a> = Vec<Value<'a>, FRAGMENT_CAPACITY>;

/// A field computed when the message is serialized
///
/// Returning `None` writes nothing at all, which is how one-shot and
/// conditional fields drop out of a message.
pub trait LiveField {
    /// Produce the values to splice in, usually `[Key, value, End]`
    fn fetch(&self) -> Option<Fragment<'_>>;
}

/// One token of an outgoing JSON object
#[derive(Clone, Copy)]
pub enum Value<'a> {
    /// `{`
    Open,
    /// `}`
    Close,
    /// End of a sequence
    End,
    /// Field name, written as `"text":`
    Key(&'a str),
    /// String value, written quoted. Quotes in the text are not escaped.
    Str(&'a str),
    /// Floating point number
    Float(f64),
    /// Unsigned 16-bit number
    U16(u16),
    /// Unsigned 32-bit number
    U32(u32),
    /// `null`
    Null,
    /// Another sequence, spliced in place
    List(&'a [Value<'a>]),
    /// A computed field, spliced in place
    Live(&'a dyn LiveField),
}

impl<'a> Value<'a> {
    /// Check for the end-of-sequence marker
    pub const fn is_end(&self) -> bool {
        matches!(self, Value::End)
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Open => f.write_str("Open"),
            Value::Close => f.write_str("Close"),
            Value::End => f.write_str("End"),
            Value::Key(text) => f.debug_tuple("Key").field(text).finish(),
            Value::Str(text) => f.debug_tuple("Str").field(text).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::U16(v) => f.debug_tuple("U16").field(v).finish(),
            Value::U32(v) => f.debug_tuple("U32").field(v).finish(),
            Value::Null => f.write_str("Null"),
            Value::List(list) => f.debug_tuple("List").field(&list.len()).finish(),
            Value::Live(_) => f.write_str("Live(..)"),
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Open, Value::Open)
            | (Value::Close, Value::Close)
            | (Value::End, Value::End)
            | (Value::Null, Value::Null) => true,
            (Value::Key(a), Value::Key(b)) | (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            // References compare by identity: two splices are the same
            // value only if they point at the same sequence or field.
            (Value::List(a), Value::List(b)) => ptr::eq(*a, *b),
            (Value::Live(a), Value::Live(b)) => ptr::addr_eq(*a, *b),
            _ => false,
        }
    }
}
