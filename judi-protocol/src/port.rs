//! Receive path from host bytes to application dispatch
//!
//! ```text
//! byte ──► FrameReceiver ──► TokenBuffer ──► Correlation ──► Responder
//!          (braces)          (tokens)        (message_id)    (application)
//! ```
//!
//! Each completed object is dispatched exactly once, synchronously, before
//! the next byte is accepted. The responder may write replies on the same
//! transport. The receiver has already switched buffers by then, so the
//! object being answered is never overwritten.

use judi_hal::{Clock, UartRx};

use crate::config::ReceiverConfig;
use crate::correlation::Correlation;
use crate::frame::{FrameError, FrameReceiver};
use crate::message::Message;
use crate::token::{FlatTokenizer, TokenBuffer, Tokenizer};

/// Application handler for complete incoming objects
pub trait Responder {
    /// Handle one object
    ///
    /// The message is only valid for the duration of the call.
    fn respond(&mut self, message: &Message<'_>);
}

/// Errors from polling a byte source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortError<E> {
    /// The transport failed to deliver a byte
    Uart(E),
    /// A partial object was discarded
    Frame(FrameError),
}

impl<E> From<FrameError> for PortError<E> {
    fn from(e: FrameError) -> Self {
        PortError::Frame(e)
    }
}

/// Receiver, tokens and tokenizer for one host link
#[derive(Debug)]
pub struct MessagePort<T: Tokenizer = FlatTokenizer> {
    receiver: FrameReceiver,
    tokens: TokenBuffer,
    tokenizer: T,
}

impl MessagePort<FlatTokenizer> {
    /// Create a port with the built-in tokenizer
    pub const fn new(config: ReceiverConfig) -> Self {
        Self::with_tokenizer(config, FlatTokenizer::new())
    }
}

impl Default for MessagePort<FlatTokenizer> {
    fn default() -> Self {
        Self::new(ReceiverConfig::default())
    }
}

impl<T: Tokenizer> MessagePort<T> {
    /// Create a port with a custom tokenizer
    pub const fn with_tokenizer(config: ReceiverConfig, tokenizer: T) -> Self {
        Self {
            receiver: FrameReceiver::new(config),
            tokens: TokenBuffer::new(),
            tokenizer,
        }
    }

    /// Check if an object is partially received
    pub fn is_receiving(&self) -> bool {
        self.receiver.is_receiving()
    }

    /// The frame receiver
    pub fn receiver(&self) -> &FrameReceiver {
        &self.receiver
    }

    /// Process one received byte
    ///
    /// Returns `Ok(true)` if the byte completed an object and it was
    /// dispatched. An object the tokenizer rejects is still dispatched;
    /// [`TokenBuffer::error`] tells the responder why its lookups miss.
    pub fn ingest<R: Responder + ?Sized>(
        &mut self,
        byte: u8,
        now_ms: u32,
        correlation: &Correlation,
        responder: &mut R,
    ) -> Result<bool, FrameError> {
        let frame = match self.receiver.feed(byte, now_ms)? {
            Some(frame) => frame,
            None => return Ok(false),
        };

        if let Err(e) = self.tokens.parse(&mut self.tokenizer, frame.as_str()) {
            warn!("tokenizer rejected message: {}", e);
        }

        let message = Message::new(frame, &self.tokens);
        correlation.on_incoming(&message);
        responder.respond(&message);
        Ok(true)
    }

    /// Check the partial object against the timing limits
    pub fn poll_timeouts(&mut self, now_ms: u32) -> Result<(), FrameError> {
        self.receiver.poll_timeouts(now_ms)
    }

    /// Read at most one byte from `uart` and process it
    ///
    /// When no byte is waiting, only the timing limits are checked.
    pub fn poll<U, C, R>(
        &mut self,
        uart: &mut U,
        clock: &C,
        correlation: &Correlation,
        responder: &mut R,
    ) -> Result<bool, PortError<U::Error>>
    where
        U: UartRx,
        C: Clock + ?Sized,
        R: Responder + ?Sized,
    {
        let now_ms = clock.now_ms();
        match uart.try_read_byte().map_err(PortError::Uart)? {
            Some(byte) => Ok(self.ingest(byte, now_ms, correlation, responder)?),
            None => {
                self.receiver.poll_timeouts(now_ms)?;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::MESSAGE_ID_HASH;
    use crate::message::ROOT_OBJECT;
    use crate::token::{hash_key, TokenizeError};
    use core::cell::Cell;
    use heapless::{Deque, String, Vec};

    #[derive(Default)]
    struct Recorder {
        texts: Vec<String<64>, 4>,
        ids: Vec<Option<u32>, 4>,
        errors: Vec<Option<TokenizeError>, 4>,
    }

    impl Responder for Recorder {
        fn respond(&mut self, message: &Message<'_>) {
            let mut text = String::new();
            let _ = text.push_str(message.text());
            let _ = self.texts.push(text);
            let _ = self.ids.push(message.get_u32(ROOT_OBJECT, MESSAGE_ID_HASH));
            let _ = self.errors.push(message.tokens().error());
        }
    }

    struct ScriptedUart {
        bytes: Deque<u8, 64>,
        fail_next: bool,
    }

    impl ScriptedUart {
        fn new(text: &str) -> Self {
            let mut bytes = Deque::new();
            for &b in text.as_bytes() {
                bytes.push_back(b).unwrap();
            }
            Self {
                bytes,
                fail_next: false,
            }
        }
    }

    impl UartRx for ScriptedUart {
        type Error = ();

        fn try_read_byte(&mut self) -> Result<Option<u8>, ()> {
            if core::mem::take(&mut self.fail_next) {
                return Err(());
            }
            Ok(self.bytes.pop_front())
        }
    }

    struct StepClock(Cell<u32>);

    impl Clock for StepClock {
        fn now_ms(&self) -> u32 {
            let now = self.0.get();
            self.0.set(now + 1);
            now
        }
    }

    fn ingest_all(
        port: &mut MessagePort,
        text: &str,
        correlation: &Correlation,
        recorder: &mut Recorder,
    ) -> usize {
        let mut dispatched = 0;
        for &byte in text.as_bytes() {
            if port.ingest(byte, 0, correlation, recorder) == Ok(true) {
                dispatched += 1;
            }
        }
        dispatched
    }

    #[test]
    fn test_dispatch_once_per_object() {
        let mut port: MessagePort = MessagePort::default();
        let correlation = Correlation::new();
        let mut recorder = Recorder::default();

        let n = ingest_all(
            &mut port,
            r#"{"message_id":1,"a":2}  {"b":{"c":3}}"#,
            &correlation,
            &mut recorder,
        );

        assert_eq!(n, 2);
        assert_eq!(recorder.texts[0].as_str(), r#"{"message_id":1,"a":2}"#);
        assert_eq!(recorder.texts[1].as_str(), r#"{"b":{"c":3}}"#);
        assert_eq!(recorder.ids.as_slice(), &[Some(1), None]);
    }

    #[test]
    fn test_correlation_updated_before_dispatch() {
        let mut port: MessagePort = MessagePort::default();
        let correlation = Correlation::new();
        let mut recorder = Recorder::default();

        ingest_all(&mut port, r#"{"message_id":9}"#, &correlation, &mut recorder);
        assert_eq!(correlation.id(), 9);
        assert!(correlation.need_to_send());

        ingest_all(&mut port, r#"{"x":1}"#, &correlation, &mut recorder);
        assert!(!correlation.need_to_send());
    }

    #[test]
    fn test_rejected_object_still_dispatched() {
        let mut port: MessagePort = MessagePort::default();
        let correlation = Correlation::new();
        let mut recorder = Recorder::default();

        let n = ingest_all(&mut port, r#"{"a":]}"#, &correlation, &mut recorder);

        assert_eq!(n, 1);
        assert_eq!(recorder.errors[0], Some(TokenizeError::Invalid));
        assert_eq!(recorder.ids[0], None);
    }

    #[test]
    fn test_poll_reads_one_byte_at_a_time() {
        let mut port: MessagePort = MessagePort::default();
        let correlation = Correlation::new();
        let mut recorder = Recorder::default();
        let mut uart = ScriptedUart::new(r#"{"k":"v"}"#);
        let clock = StepClock(Cell::new(0));

        let mut polls = 0;
        while port.poll(&mut uart, &clock, &correlation, &mut recorder) != Ok(true) {
            polls += 1;
            assert!(polls < 20);
        }

        assert_eq!(polls, 8);
        assert_eq!(recorder.texts.len(), 1);
        assert_eq!(port.poll(&mut uart, &clock, &correlation, &mut recorder), Ok(false));
    }

    #[test]
    fn test_poll_idle_reports_stall() {
        let mut port: MessagePort = MessagePort::default();
        let correlation = Correlation::new();
        let mut recorder = Recorder::default();
        let mut uart = ScriptedUart::new("{\"k\":");
        let clock = StepClock(Cell::new(0));

        for _ in 0..5 {
            assert_eq!(port.poll(&mut uart, &clock, &correlation, &mut recorder), Ok(false));
        }
        assert!(port.is_receiving());

        // Nothing more arrives
        clock.0.set(500);
        assert_eq!(
            port.poll(&mut uart, &clock, &correlation, &mut recorder),
            Err(PortError::Frame(FrameError::TimedOut))
        );
        assert!(!port.is_receiving());
        assert!(recorder.texts.is_empty());
    }

    #[test]
    fn test_poll_surfaces_uart_error() {
        let mut port: MessagePort = MessagePort::default();
        let correlation = Correlation::new();
        let mut recorder = Recorder::default();
        let mut uart = ScriptedUart::new("{}");
        uart.fail_next = true;
        let clock = StepClock(Cell::new(0));

        assert_eq!(
            port.poll(&mut uart, &clock, &correlation, &mut recorder),
            Err(PortError::Uart(()))
        );
        assert_eq!(port.poll(&mut uart, &clock, &correlation, &mut recorder), Ok(false));
        assert_eq!(port.poll(&mut uart, &clock, &correlation, &mut recorder), Ok(true));
    }

    #[test]
    fn test_nested_lookup_through_port() {
        struct Nested(Option<u32>);

        impl Responder for Nested {
            fn respond(&mut self, message: &Message<'_>) {
                self.0 = message
                    .get(ROOT_OBJECT, hash_key("request"))
                    .and_then(|request| message.get_u32(request, hash_key("count")));
            }
        }

        let mut port: MessagePort = MessagePort::default();
        let correlation = Correlation::new();
        let mut nested = Nested(None);
        for &byte in br#"{"request":{"count":"12"}}"#.iter() {
            let _ = port.ingest(byte, 0, &correlation, &mut nested);
        }
        assert_eq!(nested.0, Some(12));
    }
}
