//! JUDI host-link message core
//!
//! JSON in both directions over a plain serial stream, with no allocator and
//! fixed memory use.
//!
//! # Receive path
//!
//! ```text
//! UART bytes ──► FrameReceiver ──► TokenBuffer ──► Correlation ──► Responder
//!                balanced {..}     key hashes      message_id      application
//! ```
//!
//! # Transmit path
//!
//! ```text
//! [Value] ──► MessageBuilder ──► Serializer ──► Sink (UART)
//!             staging            punctuation     fragment writes
//! ```
//!
//! Outgoing objects are flat [`Value`] sequences. Sequences can splice other
//! sequences ([`Value::List`]) and fields computed at write time
//! ([`Value::Live`]); the serializer adds colons, commas and any missing
//! closing braces.
//!
//! This crate is `no_std` and host-testable. Logging goes through `defmt`
//! when the `defmt` feature is enabled.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod builder;
pub mod config;
pub mod correlation;
pub mod frame;
pub mod message;
pub mod messages;
pub mod port;
pub mod serializer;
pub mod token;
pub mod value;

pub use builder::{MessageBuilder, MESSAGE_CAPACITY};
pub use config::ReceiverConfig;
pub use correlation::{Correlation, MESSAGE_ID_HASH, MESSAGE_ID_KEY};
pub use frame::{FrameBuffer, FrameError, FrameReceiver, FRAME_CAPACITY};
pub use message::{Message, ROOT_OBJECT};
pub use messages::{DeviceInfo, Timestamp, PROTOCOL_VERSION};
pub use port::{MessagePort, PortError, Responder};
pub use serializer::{serialize, Serializer, Sink, UartSink};
pub use token::{hash_key, FlatTokenizer, Token, TokenBuffer, TokenKind, TokenizeError, Tokenizer, MAX_TOKENS};
pub use value::{Fragment, LiveField, Value};
