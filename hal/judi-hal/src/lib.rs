//! JUDI Hardware Abstraction Layer
//!
//! The message core never touches a peripheral directly. It consumes the
//! transport and the system clock through the traits in this crate, which
//! chip-specific firmware implements.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Firmware (judi-firmware)               │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  judi-protocol (message core)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  judi-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication
//! - [`clock::Clock`] - Monotonic millisecond time source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod uart;

pub use clock::Clock;
pub use uart::{UartConfig, UartRx, UartTx};
