//! Frame extraction from the host byte stream
//!
//! The host sends bare JSON objects with no length prefix or checksum:
//! ```text
//! {"message_id":5,"request":{"foo":"bar"}}{"message_id":6,...}
//! ```
//!
//! A frame is one top-level object, found by counting braces:
//! - Non-printable bytes are dropped before they reach the framer
//! - Bytes outside an object are ignored
//! - The object is complete when its braces balance
//!
//! Braces inside string literals are counted like any other brace, so a
//! `{` or `}` in a string value corrupts framing.
//!
//! Two frame buffers alternate. When an object completes, the receiver
//! switches to the other buffer, so the completed one stays untouched while
//! it is dispatched, even if the response provokes more input.

use heapless::Vec;
use judi_hal::clock::elapsed_ms;

use crate::config::ReceiverConfig;

/// Maximum object size in bytes
pub const FRAME_CAPACITY: usize = 256;

/// Reasons a partial frame is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Object larger than the frame buffer
    Overflow,
    /// Too long since the previous byte of the object
    Stalled,
    /// Object took too long to arrive as a whole
    TimedOut,
}

/// One object being received, or one complete object awaiting dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8, FRAME_CAPACITY>,
    depth: u16,
    started_at: u32,
    last_byte_at: u32,
    timed_out: bool,
    stalled: bool,
    slot: u8,
}

impl FrameBuffer {
    const fn new(slot: u8) -> Self {
        Self {
            data: Vec::new(),
            depth: 0,
            started_at: 0,
            last_byte_at: 0,
            timed_out: false,
            stalled: false,
            slot,
        }
    }

    /// Clear contents, nesting and timeout flags
    pub fn reset(&mut self) {
        self.discard();
        self.started_at = 0;
        self.last_byte_at = 0;
        self.timed_out = false;
        self.stalled = false;
    }

    /// Drop a partial object but keep the flags that caused it
    fn discard(&mut self) {
        self.data.clear();
        self.depth = 0;
    }

    /// Object text received so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Object text received so far
    ///
    /// Only printable ASCII is ever stored, so this is always valid UTF-8.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.data).unwrap_or("")
    }

    /// Number of bytes received
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no object has started
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current brace nesting level
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Check if the buffer holds one whole object
    pub fn is_complete(&self) -> bool {
        !self.data.is_empty() && self.depth == 0
    }

    /// Time the object's opening brace arrived
    pub fn started_at(&self) -> u32 {
        self.started_at
    }

    /// Time the latest byte arrived
    pub fn last_byte_at(&self) -> u32 {
        self.last_byte_at
    }

    /// The object exceeded the maximum message duration
    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    /// The object exceeded the maximum gap between bytes
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Which of the two receiver buffers this is
    pub fn slot(&self) -> u8 {
        self.slot
    }
}

/// Brace-counting frame receiver with double buffering
#[derive(Debug, Clone)]
pub struct FrameReceiver {
    config: ReceiverConfig,
    buffers: [FrameBuffer; 2],
    active: usize,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new(ReceiverConfig::default())
    }
}

impl FrameReceiver {
    /// Create a receiver with both buffers empty
    pub const fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            buffers: [FrameBuffer::new(0), FrameBuffer::new(1)],
            active: 0,
        }
    }

    /// Timing limits in use
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Clear both buffers and start over
    pub fn reset(&mut self) {
        for buffer in self.buffers.iter_mut() {
            buffer.reset();
        }
        self.active = 0;
    }

    /// Check if an object is partially received
    pub fn is_receiving(&self) -> bool {
        self.buffers[self.active].depth > 0
    }

    /// The buffer currently accumulating input
    pub fn active(&self) -> &FrameBuffer {
        &self.buffers[self.active]
    }

    /// Feed a single byte to the receiver
    ///
    /// Returns `Ok(Some(frame))` when the byte completes an object,
    /// `Ok(None)` when more bytes are needed, or `Err` when a partial object
    /// was discarded. A byte that reveals a stall or timeout is still
    /// processed afterwards, so a `{` immediately starts the next object.
    pub fn feed(&mut self, byte: u8, now_ms: u32) -> Result<Option<&FrameBuffer>, FrameError> {
        if !is_printable(byte) {
            return Ok(None);
        }

        let expired = self.expire(now_ms);

        let buffer = &mut self.buffers[self.active];
        if byte == b'{' && buffer.depth == 0 {
            trace!("message start");
            buffer.started_at = now_ms;
            buffer.last_byte_at = now_ms;
            buffer.timed_out = false;
            buffer.stalled = false;
        }

        if byte == b'{' {
            buffer.depth += 1;
        }

        if buffer.depth > 0 {
            if buffer.data.push(byte).is_err() {
                warn!("message exceeds {} bytes, discarded", FRAME_CAPACITY);
                buffer.discard();
                return Err(FrameError::Overflow);
            }
            buffer.last_byte_at = now_ms;
        }

        if byte == b'}' && buffer.depth > 0 {
            buffer.depth -= 1;
        }

        expired?;

        if !buffer.is_complete() {
            return Ok(None);
        }

        debug!(
            "message complete in {} ms ({} bytes)",
            elapsed_ms(buffer.started_at, now_ms),
            buffer.len()
        );

        let completed = self.active;
        self.active ^= 1;
        self.buffers[self.active].reset();
        Ok(Some(&self.buffers[completed]))
    }

    /// Feed multiple bytes to the receiver
    ///
    /// Returns the first complete object found, if any.
    /// Remaining bytes after a complete object are not consumed.
    pub fn feed_bytes(
        &mut self,
        bytes: &[u8],
        now_ms: u32,
    ) -> Result<Option<&FrameBuffer>, FrameError> {
        for &byte in bytes {
            if self.feed(byte, now_ms)?.is_some() {
                return Ok(Some(&self.buffers[self.active ^ 1]));
            }
        }
        Ok(None)
    }

    /// Check the partial object against the timing limits
    ///
    /// Call this when no byte is available, so a sender that stops
    /// mid-object does not hold the receiver until its next byte.
    pub fn poll_timeouts(&mut self, now_ms: u32) -> Result<(), FrameError> {
        self.expire(now_ms)
    }

    /// Set the timeout flags and discard the partial object if either is set
    fn expire(&mut self, now_ms: u32) -> Result<(), FrameError> {
        let config = self.config;
        let buffer = &mut self.buffers[self.active];
        if buffer.depth == 0 {
            return Ok(());
        }

        if elapsed_ms(buffer.started_at, now_ms) > config.max_message_duration_ms {
            buffer.timed_out = true;
        }
        if elapsed_ms(buffer.last_byte_at, now_ms) > config.max_intercharacter_gap_ms {
            buffer.stalled = true;
        }

        let error = if buffer.timed_out {
            FrameError::TimedOut
        } else if buffer.stalled {
            FrameError::Stalled
        } else {
            return Ok(());
        };

        warn!("partial message discarded after {} bytes: {}", buffer.len(), error);
        buffer.discard();
        Err(error)
    }
}

/// Bytes that can be part of an object
fn is_printable(byte: u8) -> bool {
    byte == b' ' || byte.is_ascii_graphic()
}
