//! Receiver configuration
//!
//! Buffer sizes are compile-time constants next to the types that own them
//! ([`FRAME_CAPACITY`](crate::frame::FRAME_CAPACITY),
//! [`MAX_TOKENS`](crate::token::MAX_TOKENS),
//! [`MESSAGE_CAPACITY`](crate::builder::MESSAGE_CAPACITY)). Timing is
//! runtime configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default limit for a whole object to arrive (ms)
pub const DEFAULT_MAX_MESSAGE_DURATION_MS: u32 = 100;

/// Default limit between two bytes of one object (ms)
pub const DEFAULT_MAX_INTERCHARACTER_GAP_MS: u32 = 100;

/// Frame receiver timing limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceiverConfig {
    /// Maximum time from the opening `{` to the matching `}`
    pub max_message_duration_ms: u32,
    /// Maximum silence between two bytes of a partial object
    pub max_intercharacter_gap_ms: u32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            max_message_duration_ms: DEFAULT_MAX_MESSAGE_DURATION_MS,
            max_intercharacter_gap_ms: DEFAULT_MAX_INTERCHARACTER_GAP_MS,
        }
    }
}

impl ReceiverConfig {
    /// Use one window for both limits
    pub const fn with_window(window_ms: u32) -> Self {
        Self {
            max_message_duration_ms: window_ms,
            max_intercharacter_gap_ms: window_ms,
        }
    }
}
